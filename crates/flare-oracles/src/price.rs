//! FTSO v2 price feeds.

use crate::abi;
use crate::error::{OracleError, Result};
use crate::rpc::{EvmRpc, RegistryContract};
use async_trait::async_trait;
use ethers_core::abi::{ParamType, Token};
use ethers_core::types::U256;
use ethers_core::utils::format_units;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

const GET_FEED_BY_ID: &str = "getFeedById(bytes21)";

/// A 21-byte FTSO feed identifier: category byte followed by the ASCII pair name.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FeedId([u8; 21]);

impl FeedId {
    /// Category `0x01` (crypto) feed for a pair like `"BTC/USD"`.
    pub const fn crypto(pair: &str) -> Self {
        let bytes = pair.as_bytes();
        let mut id = [0u8; 21];
        id[0] = 0x01;
        let mut i = 0;
        while i < bytes.len() && i < 20 {
            id[i + 1] = bytes[i];
            i += 1;
        }
        FeedId(id)
    }

    pub fn as_bytes(&self) -> &[u8; 21] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeedId({})", self.to_hex())
    }
}

/// Symbols the price tool accepts, in listing order.
pub const SUPPORTED_FEEDS: [(&str, FeedId); 3] = [
    ("FLR", FeedId::crypto("FLR/USD")),
    ("BTC", FeedId::crypto("BTC/USD")),
    ("ETH", FeedId::crypto("ETH/USD")),
];

/// Raw `getFeedById` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedReading {
    pub value: U256,
    pub decimals: i8,
    pub timestamp: u64,
}

impl FeedReading {
    pub fn price(&self) -> Result<f64> {
        scale_price(self.value, self.decimals)
    }
}

/// Source of raw feed values.
#[async_trait]
pub trait FeedReader: Send + Sync {
    async fn read_feed(&self, feed: &FeedId) -> Result<FeedReading>;
}

/// `value / 10^decimals`, or `value * 10^|decimals|` for negative decimals.
pub fn scale_price(value: U256, decimals: i8) -> Result<f64> {
    let places = u32::from(decimals.unsigned_abs());
    let decimal = if decimals >= 0 {
        format_units(value, places).map_err(|e| OracleError::AbiDecode(e.to_string()))?
    } else {
        value
            .checked_mul(U256::exp10(places as usize))
            .ok_or_else(|| OracleError::AbiDecode(format!("{}e{} overflows", value, places)))?
            .to_string()
    };

    decimal
        .parse::<f64>()
        .map_err(|e| OracleError::AbiDecode(format!("{}: {}", decimal, e)))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceQuote {
    /// `"<SYM>/USD"`
    pub symbol: String,
    pub price: f64,
    pub timestamp: u64,
}

/// Looks up supported symbols and scales their feed readings.
#[derive(Clone)]
pub struct PriceOracle {
    reader: Arc<dyn FeedReader>,
}

impl PriceOracle {
    pub fn new(reader: Arc<dyn FeedReader>) -> Self {
        Self { reader }
    }

    pub fn supported_symbols() -> Vec<&'static str> {
        SUPPORTED_FEEDS.iter().map(|(symbol, _)| *symbol).collect()
    }

    /// Resolve a case-insensitive symbol to its canonical form and feed id.
    pub fn feed_for(symbol: &str) -> Result<(&'static str, FeedId)> {
        let wanted = symbol.trim().to_ascii_uppercase();
        SUPPORTED_FEEDS
            .iter()
            .find(|(s, _)| *s == wanted)
            .copied()
            .ok_or_else(|| OracleError::UnsupportedSymbol {
                symbol: wanted,
                supported: Self::supported_symbols().join(", "),
            })
    }

    #[instrument(skip(self))]
    pub async fn get_price(&self, symbol: &str) -> Result<PriceQuote> {
        let (symbol, feed) = Self::feed_for(symbol)?;

        let reading = self
            .reader
            .read_feed(&feed)
            .await
            .map_err(|e| OracleError::PriceFetchFailed {
                symbol: symbol.to_string(),
                cause: e.to_string(),
            })?;

        debug!(?feed, value = %reading.value, decimals = reading.decimals, "feed read");

        let price = reading.price().map_err(|e| OracleError::PriceFetchFailed {
            symbol: symbol.to_string(),
            cause: e.to_string(),
        })?;

        Ok(PriceQuote {
            symbol: format!("{}/USD", symbol),
            price,
            timestamp: reading.timestamp,
        })
    }
}

/// Reads feeds from the FtsoV2 contract via `eth_call`.
pub struct RpcFeedReader {
    rpc: Arc<EvmRpc>,
    ftso: RegistryContract,
}

impl RpcFeedReader {
    pub fn new(rpc: Arc<EvmRpc>, registry: impl Into<String>) -> Self {
        Self {
            rpc,
            ftso: RegistryContract::new(registry, "FtsoV2"),
        }
    }
}

#[async_trait]
impl FeedReader for RpcFeedReader {
    async fn read_feed(&self, feed: &FeedId) -> Result<FeedReading> {
        let address = self.ftso.address(&self.rpc).await?;
        let data = abi::encode_call(GET_FEED_BY_ID, &[Token::FixedBytes(feed.as_bytes().to_vec())]);
        let out = self.rpc.eth_call(address, &data).await?;

        // (uint256 value, int8 decimals, uint64 timestamp)
        let [value, decimals, timestamp] = abi::decode(
            &[ParamType::Uint(256), ParamType::Int(8), ParamType::Uint(64)],
            &out,
        )?;
        Ok(FeedReading {
            value: abi::into_uint(value)?,
            decimals: abi::into_i8(decimals)?,
            timestamp: abi::into_u64(timestamp)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(FeedReading);

    #[async_trait]
    impl FeedReader for Fixed {
        async fn read_feed(&self, _feed: &FeedId) -> Result<FeedReading> {
            Ok(self.0)
        }
    }

    struct Broken;

    #[async_trait]
    impl FeedReader for Broken {
        async fn read_feed(&self, _feed: &FeedId) -> Result<FeedReading> {
            Err(OracleError::Rpc {
                code: -32000,
                message: "execution reverted".to_string(),
            })
        }
    }

    #[test]
    fn test_feed_ids_match_registry() {
        assert_eq!(
            SUPPORTED_FEEDS[0].1.to_hex(),
            "0x01464c522f55534400000000000000000000000000"
        );
        assert_eq!(
            SUPPORTED_FEEDS[1].1.to_hex(),
            "0x014254432f55534400000000000000000000000000"
        );
        assert_eq!(
            SUPPORTED_FEEDS[2].1.to_hex(),
            "0x014554482f55534400000000000000000000000000"
        );
    }

    #[test]
    fn test_scale_price() {
        assert_eq!(scale_price(U256::from(650_000_000_000u64), 8).unwrap(), 6500.0);
        assert_eq!(scale_price(U256::from(25u8), -2).unwrap(), 2500.0);
        assert_eq!(scale_price(U256::from(42u8), 0).unwrap(), 42.0);
        assert_eq!(scale_price(U256::from(1_234_567u64), 4).unwrap(), 123.4567);
    }

    #[test]
    fn test_scale_price_beyond_u128() {
        // 2^130 with 18 decimals
        let value = U256::from(1u8) << 130;
        let price = scale_price(value, 18).unwrap();
        assert!((price - 1.361129467683753e21).abs() / price < 1e-12);
    }

    #[test]
    fn test_scale_price_overflow_is_error() {
        assert!(scale_price(U256::MAX, -5).is_err());
    }

    #[tokio::test]
    async fn test_get_price_is_case_insensitive() {
        let oracle = PriceOracle::new(Arc::new(Fixed(FeedReading {
            value: U256::from(650_000_000_000u64),
            decimals: 8,
            timestamp: 1_700_000_000,
        })));

        let quote = oracle.get_price("btc").await.unwrap();
        assert_eq!(quote.symbol, "BTC/USD");
        assert_eq!(quote.price, 6500.0);
        assert_eq!(quote.timestamp, 1_700_000_000);
    }

    #[tokio::test]
    async fn test_unsupported_symbol_lists_supported() {
        let oracle = PriceOracle::new(Arc::new(Broken));
        let err = oracle.get_price("doge").await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "Unsupported symbol: DOGE. Supported symbols: FLR, BTC, ETH"
        );
    }

    #[tokio::test]
    async fn test_read_failure_becomes_price_fetch_failed() {
        let oracle = PriceOracle::new(Arc::new(Broken));
        let err = oracle.get_price("FLR").await.unwrap_err();

        match err {
            OracleError::PriceFetchFailed { symbol, cause } => {
                assert_eq!(symbol, "FLR");
                assert!(cause.contains("execution reverted"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
