//! Secure random numbers from the RandomNumberV2 contract.

use crate::abi;
use crate::error::{OracleError, Result};
use crate::rpc::{EvmRpc, RegistryContract};
use async_trait::async_trait;
use ethers_core::abi::ParamType;
use ethers_core::types::U256;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const GET_RANDOM_NUMBER: &str = "getRandomNumber()";

/// An unsigned 256-bit on-chain random value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RandomValue(U256);

impl RandomValue {
    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn from_u128(value: u128) -> Self {
        Self(U256::from(value))
    }

    /// `self mod modulus`. A zero modulus yields zero.
    pub fn rem(&self, modulus: u32) -> u32 {
        if modulus == 0 {
            return 0;
        }
        (self.0 % U256::from(modulus)).low_u32()
    }

    /// Full-precision decimal rendering.
    pub fn to_decimal(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for RandomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for RandomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RandomValue({})", self)
    }
}

/// Serialized as decimal text; the value does not fit a JSON number.
impl Serialize for RandomValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomReading {
    pub value: RandomValue,
    pub is_secure: bool,
    pub timestamp: u64,
}

/// Source of on-chain randomness.
#[async_trait]
pub trait RandomSource: Send + Sync {
    async fn read_random(&self) -> Result<RandomReading>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Buy,
    Sell,
    Hold,
}

impl Decision {
    /// Tertiles over `0..=99`.
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=32 => Decision::Buy,
            33..=65 => Decision::Sell,
            _ => Decision::Hold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RandomDecision {
    pub raw: RandomValue,
    pub score: u32,
    pub decision: Decision,
}

impl RandomDecision {
    pub fn from_value(raw: RandomValue) -> Self {
        let score = raw.rem(100);
        Self {
            raw,
            score,
            decision: Decision::from_score(score),
        }
    }
}

#[derive(Clone)]
pub struct RandomOracle {
    source: Arc<dyn RandomSource>,
}

impl RandomOracle {
    pub fn new(source: Arc<dyn RandomSource>) -> Self {
        Self { source }
    }

    #[instrument(skip(self))]
    pub async fn get_random_number(&self) -> Result<RandomValue> {
        let reading = self
            .source
            .read_random()
            .await
            .map_err(|e| OracleError::RandomFetchFailed { cause: e.to_string() })?;

        if !reading.is_secure {
            warn!(timestamp = reading.timestamp, "random number reported as not secure");
        }
        debug!(value = %reading.value, "random number read");
        Ok(reading.value)
    }

    pub async fn get_random_decision(&self) -> Result<RandomDecision> {
        let raw = self.get_random_number().await?;
        Ok(RandomDecision::from_value(raw))
    }
}

/// Reads `getRandomNumber()` from RandomNumberV2 via `eth_call`.
pub struct RpcRandomSource {
    rpc: Arc<EvmRpc>,
    contract: RegistryContract,
}

impl RpcRandomSource {
    pub fn new(rpc: Arc<EvmRpc>, registry: impl Into<String>) -> Self {
        Self {
            rpc,
            contract: RegistryContract::new(registry, "RandomNumberV2"),
        }
    }
}

#[async_trait]
impl RandomSource for RpcRandomSource {
    async fn read_random(&self) -> Result<RandomReading> {
        let address = self.contract.address(&self.rpc).await?;
        let data = abi::encode_call(GET_RANDOM_NUMBER, &[]);
        let out = self.rpc.eth_call(address, &data).await?;

        // (uint256 randomNumber, bool isSecure, uint256 timestamp)
        let [value, is_secure, timestamp] = abi::decode(
            &[ParamType::Uint(256), ParamType::Bool, ParamType::Uint(256)],
            &out,
        )?;
        Ok(RandomReading {
            value: RandomValue::new(abi::into_uint(value)?),
            is_secure: abi::into_bool(is_secure)?,
            timestamp: abi::into_u64(timestamp)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const U256_MAX: &str =
        "115792089237316195423570985008687907853269984665640564039457584007913129639935";

    struct Fixed(RandomValue);

    #[async_trait]
    impl RandomSource for Fixed {
        async fn read_random(&self) -> Result<RandomReading> {
            Ok(RandomReading {
                value: self.0,
                is_secure: true,
                timestamp: 1,
            })
        }
    }

    #[test]
    fn test_decimal_rendering() {
        assert_eq!(RandomValue::from_u128(0).to_string(), "0");
        assert_eq!(RandomValue::from_u128(12345).to_string(), "12345");
        assert_eq!(
            RandomValue::from_u128(u128::MAX).to_string(),
            u128::MAX.to_string()
        );
        assert_eq!(RandomValue::new(U256::MAX).to_string(), U256_MAX);
    }

    #[test]
    fn test_rem() {
        assert_eq!(RandomValue::from_u128(12345).rem(100), 45);
        assert_eq!(RandomValue::new(U256::MAX).rem(100), 35);
        assert_eq!(RandomValue::from_u128(7).rem(0), 0);
    }

    #[test]
    fn test_decision_tertiles() {
        assert_eq!(Decision::from_score(0), Decision::Buy);
        assert_eq!(Decision::from_score(32), Decision::Buy);
        assert_eq!(Decision::from_score(33), Decision::Sell);
        assert_eq!(Decision::from_score(65), Decision::Sell);
        assert_eq!(Decision::from_score(66), Decision::Hold);
        assert_eq!(Decision::from_score(99), Decision::Hold);
    }

    #[test]
    fn test_decision_serializes_raw_as_text() {
        let decision = RandomDecision::from_value(RandomValue::from_u128(1_000_042));
        let json = serde_json::to_value(decision).unwrap();
        assert_eq!(json["raw"], "1000042");
        assert_eq!(json["score"], 42);
        assert_eq!(json["decision"], "SELL");
    }

    #[tokio::test]
    async fn test_oracle_draw() {
        let oracle = RandomOracle::new(Arc::new(Fixed(RandomValue::from_u128(977))));
        let draw = oracle.get_random_decision().await.unwrap();
        assert_eq!(draw.score, 77);
        assert_eq!(draw.decision, Decision::Hold);
    }
}
