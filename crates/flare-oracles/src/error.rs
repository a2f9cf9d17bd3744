use thiserror::Error;

/// Errors raised by oracle handlers.
///
/// Handlers never panic on bad input or upstream trouble; every failure is
/// one of these and the tool dispatcher turns it into a `success=false`
/// result.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Unsupported symbol: {symbol}. Supported symbols: {supported}")]
    UnsupportedSymbol { symbol: String, supported: String },

    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Invalid argument {name}: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("Failed to fetch price for {symbol}: {cause}")]
    PriceFetchFailed { symbol: String, cause: String },

    #[error("Failed to fetch random number: {cause}")]
    RandomFetchFailed { cause: String },

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed RPC response: {0}")]
    MalformedResponse(String),

    #[error("ABI decode error: {0}")]
    AbiDecode(String),

    #[error("Contract {0} is not registered in the ContractRegistry")]
    ContractNotFound(String),

    #[error("Live FDC submission is not enabled; only simulated submissions are supported")]
    LiveSubmissionUnavailable,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl OracleError {
    /// Bad caller input, as opposed to an upstream or transport failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            OracleError::UnsupportedSymbol { .. }
                | OracleError::MissingArgument(_)
                | OracleError::InvalidArgument { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, OracleError>;
