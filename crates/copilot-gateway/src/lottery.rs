//! Lottery numbers derived from on-chain randomness.
//!
//! The chain value only changes once per randomness epoch, so each roll salts
//! it with a fresh nonce and hashes the pair before reducing into range.

use flare_oracles::{OracleError, RandomOracle};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// Rolls land in `0..LOTTERY_RANGE`.
pub const LOTTERY_RANGE: u64 = 100_000;

/// Hex characters of the digest used for the number.
const DIGEST_PREFIX: usize = 12;

/// `<unix nanos>-<uuid v4 hex>`, unique per call.
pub fn nonce() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}-{}", nanos, uuid::Uuid::new_v4().simple())
}

/// Hash `"<raw>-<nonce>"` and reduce the leading digest bits into range.
pub fn derive_number(raw: &str, nonce: &str) -> u64 {
    let digest = hex::encode(Sha256::digest(format!("{}-{}", raw, nonce)));
    // 12 hex chars always fit a u64
    let prefix = u64::from_str_radix(&digest[..DIGEST_PREFIX], 16).unwrap_or_default();
    prefix % LOTTERY_RANGE
}

/// Read the chain randomness once and derive a number from it.
#[tracing::instrument(skip(oracle))]
pub async fn roll(oracle: &RandomOracle) -> Result<u64, OracleError> {
    let raw = oracle.get_random_number().await?;
    let number = derive_number(&raw.to_decimal(), &nonce());
    tracing::debug!(number, "lottery roll");
    Ok(number)
}
