//! Flare Data Connector: verification submission and attestation proofs.

pub mod fetcher;
pub mod sources;

pub use fetcher::{
    demo_proof, AttemptOutcome, CascadingProofFetcher, FallbackAttempt, ProofOutcome,
    ProofSource, ProofStatus, DEMO_SOURCE_LABEL,
};
pub use sources::{DaLayerSource, VerifierApiSource, DA_LAYER_LABEL, VERIFIER_LABEL};

use crate::error::{OracleError, Result};
use flareconf::{OracleConfig, SubmissionConfig, SubmissionKind};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// How verification requests reach the FdcHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    /// No ledger contact; waits `delay` and reports `round_id`.
    Simulated { delay: Duration, round_id: u64 },
    /// Signed FdcHub transaction. Not available in this build.
    Live,
}

impl SubmissionMode {
    pub fn from_config(config: &SubmissionConfig) -> Self {
        match config.mode {
            SubmissionKind::Simulated => SubmissionMode::Simulated {
                delay: config.delay(),
                round_id: config.demo_round_id,
            },
            SubmissionKind::Live => SubmissionMode::Live,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SubmissionMode::Simulated { .. } => "simulated",
            SubmissionMode::Live => "live",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub verified: bool,
    pub tx_hash: String,
    pub status: String,
    #[serde(rename = "roundId")]
    pub round_id: u64,
    pub message: String,
    pub mode: &'static str,
    /// Hub receipt for live submissions; `null` when simulated.
    pub details: Option<Value>,
}

#[derive(Clone)]
pub struct FdcOracle {
    mode: SubmissionMode,
    fetcher: CascadingProofFetcher,
}

impl FdcOracle {
    pub fn new(mode: SubmissionMode, fetcher: CascadingProofFetcher) -> Self {
        Self { mode, fetcher }
    }

    /// Verifier API then DA layer, sharing one HTTP client.
    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let stages: Vec<Arc<dyn ProofSource>> = vec![
            Arc::new(VerifierApiSource::new(
                client.clone(),
                &config.verifier_url,
                &config.api_key,
                config.verifier_timeout(),
            )),
            Arc::new(DaLayerSource::new(
                client,
                &config.da_layer_url,
                &config.api_key,
                config.da_timeout(),
            )),
        ];

        Ok(Self::new(
            SubmissionMode::from_config(&config.submission),
            CascadingProofFetcher::new(stages),
        ))
    }

    pub fn mode(&self) -> SubmissionMode {
        self.mode
    }

    #[instrument(skip(self), fields(mode = self.mode.label()))]
    pub async fn submit_verification_request(&self, tx_hash: &str) -> Result<Submission> {
        let tx_hash = tx_hash.trim();
        if tx_hash.is_empty() {
            return Err(OracleError::InvalidArgument {
                name: "tx_hash".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        match self.mode {
            SubmissionMode::Simulated { delay, round_id } => {
                tokio::time::sleep(delay).await;
                info!(round_id, "simulated submission entered consensus round");

                Ok(Submission {
                    verified: false,
                    tx_hash: tx_hash.to_string(),
                    status: "submitted".to_string(),
                    round_id,
                    message: format!(
                        "Request entered consensus round {}. (Demo mode: submission mocked, no gas spent)",
                        round_id
                    ),
                    mode: self.mode.label(),
                    details: None,
                })
            }
            SubmissionMode::Live => Err(OracleError::LiveSubmissionUnavailable),
        }
    }

    pub async fn get_attestation_proof(&self, round_id: u64) -> ProofOutcome {
        self.fetcher.fetch(round_id).await
    }
}
