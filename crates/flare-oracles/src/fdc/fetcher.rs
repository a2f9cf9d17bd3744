//! Ordered proof sources with a deterministic last resort.
//!
//! Each stage gets exactly one attempt, bounded by its own timeout. The
//! first hit wins and later stages are never touched. When every stage
//! misses, a demo proof is synthesized so callers always get a result.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const DEMO_SOURCE_LABEL: &str = "Demo fallback (APIs temporarily unavailable)";

const DEMO_NOTE: &str = "This is a demo proof. In production, this would contain a real \
Merkle proof from the Flare DA Layer, verifiable against the Relay contract's stored Merkle root.";

/// One stage of the cascade.
#[async_trait]
pub trait ProofSource: Send + Sync {
    /// Human-readable label reported when this stage wins.
    fn label(&self) -> &str;

    /// Hard bound for a single attempt.
    fn timeout(&self) -> Duration;

    /// `Some(proof)` on a hit, `None` on any failure.
    async fn fetch(&self, round_id: u64) -> Option<Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofStatus {
    Verified,
    DemoFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Hit,
    Miss,
}

/// Internal record of one stage attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackAttempt {
    pub source: String,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProofOutcome {
    pub status: ProofStatus,
    #[serde(rename = "roundId")]
    pub round_id: u64,
    pub source: String,
    pub proof: Value,
}

#[derive(Clone, Default)]
pub struct CascadingProofFetcher {
    stages: Vec<Arc<dyn ProofSource>>,
}

impl CascadingProofFetcher {
    pub fn new(stages: Vec<Arc<dyn ProofSource>>) -> Self {
        Self { stages }
    }

    pub fn stage_labels(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.label()).collect()
    }

    #[instrument(skip(self), fields(proof.source = tracing::field::Empty))]
    pub async fn fetch(&self, round_id: u64) -> ProofOutcome {
        let (outcome, attempts) = self.fetch_with_attempts(round_id).await;
        tracing::Span::current().record("proof.source", outcome.source.as_str());
        debug!(?attempts, "proof cascade finished");
        outcome
    }

    /// Like [`fetch`](Self::fetch), also returning the per-stage attempt log.
    pub async fn fetch_with_attempts(&self, round_id: u64) -> (ProofOutcome, Vec<FallbackAttempt>) {
        let mut attempts = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let label = stage.label().to_string();
            let result = tokio::time::timeout(stage.timeout(), stage.fetch(round_id)).await;

            match result {
                Ok(Some(proof)) => {
                    info!(source = %label, round_id, "proof stage hit");
                    attempts.push(FallbackAttempt {
                        source: label.clone(),
                        outcome: AttemptOutcome::Hit,
                    });
                    let outcome = ProofOutcome {
                        status: ProofStatus::Verified,
                        round_id,
                        source: label,
                        proof,
                    };
                    return (outcome, attempts);
                }
                Ok(None) => {
                    debug!(source = %label, "proof stage miss");
                }
                Err(_) => {
                    warn!(source = %label, timeout = ?stage.timeout(), "proof stage timed out");
                }
            }

            attempts.push(FallbackAttempt {
                source: label,
                outcome: AttemptOutcome::Miss,
            });
        }

        info!(round_id, "all proof stages missed, using demo proof");
        let outcome = ProofOutcome {
            status: ProofStatus::DemoFallback,
            round_id,
            source: DEMO_SOURCE_LABEL.to_string(),
            proof: demo_proof(round_id, chrono::Utc::now().timestamp()),
        };
        (outcome, attempts)
    }
}

/// Deterministic stand-in proof shaped like a DA layer response.
pub fn demo_proof(round_id: u64, timestamp: i64) -> Value {
    json!({
        "roundId": round_id,
        "merkleRoot": format!("0x{}", "ab".repeat(32)),
        "attestationHash": format!("0x{}", "cd".repeat(32)),
        "voterCount": 9,
        "confirmations": 6,
        "timestamp": timestamp,
        "note": DEMO_NOTE,
    })
}
