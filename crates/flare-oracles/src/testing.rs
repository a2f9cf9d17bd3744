//! In-memory doubles for the chain and proof capabilities.

use crate::error::{OracleError, Result};
use crate::fdc::{CascadingProofFetcher, FdcOracle, ProofSource, SubmissionMode};
use crate::price::{FeedId, FeedReader, FeedReading, PriceOracle};
use crate::random::{RandomOracle, RandomReading, RandomSource, RandomValue};
use crate::FlareOracles;
use async_trait::async_trait;
use ethers_core::types::U256;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Returns the same reading for every feed.
pub struct StaticFeed {
    reading: FeedReading,
}

impl StaticFeed {
    pub fn new(value: u128, decimals: i8, timestamp: u64) -> Self {
        Self {
            reading: FeedReading {
                value: U256::from(value),
                decimals,
                timestamp,
            },
        }
    }
}

#[async_trait]
impl FeedReader for StaticFeed {
    async fn read_feed(&self, _feed: &FeedId) -> Result<FeedReading> {
        Ok(self.reading)
    }
}

/// Always yields the same value, marked secure.
pub struct FixedRandom(pub RandomValue);

#[async_trait]
impl RandomSource for FixedRandom {
    async fn read_random(&self) -> Result<RandomReading> {
        Ok(RandomReading {
            value: self.0,
            is_secure: true,
            timestamp: 0,
        })
    }
}

/// Feeds and randomness that always fail with an RPC error.
pub struct Unreachable;

#[async_trait]
impl FeedReader for Unreachable {
    async fn read_feed(&self, _feed: &FeedId) -> Result<FeedReading> {
        Err(unreachable_error())
    }
}

#[async_trait]
impl RandomSource for Unreachable {
    async fn read_random(&self) -> Result<RandomReading> {
        Err(unreachable_error())
    }
}

fn unreachable_error() -> OracleError {
    OracleError::Rpc {
        code: -32603,
        message: "node unreachable".to_string(),
    }
}

/// A proof stage with a canned answer that counts its calls.
pub struct StaticProofSource {
    label: String,
    result: Option<Value>,
    calls: AtomicUsize,
}

impl StaticProofSource {
    pub fn hit(label: impl Into<String>, proof: Value) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            result: Some(proof),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn miss(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            result: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProofSource for StaticProofSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn fetch(&self, _round_id: u64) -> Option<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Oracles over in-memory sources: price reads `6500.0` (650000000000 @ 8
/// decimals), randomness is `value`, submissions are instant and proofs
/// come from `stages`.
pub fn oracles(value: RandomValue, stages: Vec<Arc<dyn ProofSource>>) -> FlareOracles {
    FlareOracles {
        price: PriceOracle::new(Arc::new(StaticFeed::new(650_000_000_000, 8, 1_700_000_000))),
        random: RandomOracle::new(Arc::new(FixedRandom(value))),
        fdc: FdcOracle::new(
            SubmissionMode::Simulated {
                delay: Duration::ZERO,
                round_id: 915_000,
            },
            CascadingProofFetcher::new(stages),
        ),
    }
}

/// Oracles whose chain reads all fail and whose proof cascade is empty.
pub fn offline_oracles() -> FlareOracles {
    FlareOracles {
        price: PriceOracle::new(Arc::new(Unreachable)),
        random: RandomOracle::new(Arc::new(Unreachable)),
        fdc: FdcOracle::new(SubmissionMode::Live, CascadingProofFetcher::default()),
    }
}
