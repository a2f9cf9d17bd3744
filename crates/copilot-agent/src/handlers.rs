//! Tool handlers backed by the Flare oracles.

use async_trait::async_trait;
use flare_oracles::{FlareOracles, OracleError, PriceOracle};
use serde_json::{json, Value};

use crate::tools::{PriceArgs, ProofArgs, ToolName, VerifyArgs};

/// A parsed, validated tool call.
#[derive(Debug, Clone)]
pub enum ToolInvocation {
    PriceLookup(PriceArgs),
    ListAssets,
    RandomDraw,
    RandomRawValue,
    SubmitVerification(VerifyArgs),
    FetchProof(ProofArgs),
}

impl ToolInvocation {
    pub fn tool(&self) -> ToolName {
        match self {
            ToolInvocation::PriceLookup(_) => ToolName::PriceLookup,
            ToolInvocation::ListAssets => ToolName::ListAssets,
            ToolInvocation::RandomDraw => ToolName::RandomDraw,
            ToolInvocation::RandomRawValue => ToolName::RandomRawValue,
            ToolInvocation::SubmitVerification(_) => ToolName::SubmitVerification,
            ToolInvocation::FetchProof(_) => ToolName::FetchProof,
        }
    }
}

/// Executes a validated invocation and returns its payload object.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, invocation: ToolInvocation) -> Result<Value, OracleError>;
}

pub struct OracleHandlers {
    oracles: FlareOracles,
}

impl OracleHandlers {
    pub fn new(oracles: FlareOracles) -> Self {
        Self { oracles }
    }

    pub fn list_assets() -> Value {
        json!({
            "supported_symbols": PriceOracle::supported_symbols(),
            "note": "Pass any of these symbols to get_flare_price()",
        })
    }
}

fn to_payload<T: serde::Serialize>(value: &T) -> Result<Value, OracleError> {
    serde_json::to_value(value).map_err(|e| OracleError::InvalidArgument {
        name: "payload".to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl ToolExecutor for OracleHandlers {
    async fn execute(&self, invocation: ToolInvocation) -> Result<Value, OracleError> {
        match invocation {
            ToolInvocation::PriceLookup(args) => {
                let quote = self.oracles.price.get_price(&args.symbol).await?;
                to_payload(&quote)
            }
            ToolInvocation::ListAssets => Ok(Self::list_assets()),
            ToolInvocation::RandomDraw => {
                let draw = self.oracles.random.get_random_decision().await?;
                to_payload(&draw)
            }
            ToolInvocation::RandomRawValue => {
                let value = self.oracles.random.get_random_number().await?;
                Ok(json!({ "random_number": value.to_string() }))
            }
            ToolInvocation::SubmitVerification(args) => {
                let submission = self
                    .oracles
                    .fdc
                    .submit_verification_request(&args.tx_hash)
                    .await?;
                to_payload(&submission)
            }
            ToolInvocation::FetchProof(args) => {
                let outcome = self.oracles.fdc.get_attestation_proof(args.round_id).await;
                to_payload(&outcome)
            }
        }
    }
}
