//! Upstream service configuration: the model provider, the agent loop budget,
//! and the Flare oracle endpoints.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Flare Copilot, a helpful assistant for the Flare blockchain ecosystem. \
You have access to live on-chain data from the Flare Coston2 Testnet via three oracles:\n\
1. **FTSO v2 Price Oracle** - real-time decentralised price feeds for FLR, BTC, ETH\n\
2. **Secure Random Oracle** - cryptographically secure on-chain random numbers\n\
3. **Flare Data Connector (FDC)** - cross-chain transaction verification\n\n\
When users ask about prices, randomness, or verification, use the tools provided. \
Always explain results clearly and mention the data comes from Flare's decentralised oracles.";

/// Language-model provider settings (Anthropic Messages API).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// API key. Usually supplied through `ANTHROPIC_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "ModelConfig::default_base_url")]
    pub base_url: String,

    #[serde(default = "ModelConfig::default_model")]
    pub model: String,

    #[serde(default = "ModelConfig::default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "ModelConfig::default_system_prompt")]
    pub system_prompt: String,

    /// Upper bound for a single model call.
    #[serde(default = "ModelConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ModelConfig {
    fn default_base_url() -> String {
        "https://api.anthropic.com".to_string()
    }

    fn default_model() -> String {
        "claude-sonnet-4-5-20250929".to_string()
    }

    fn default_max_tokens() -> u32 {
        4096
    }

    fn default_system_prompt() -> String {
        DEFAULT_SYSTEM_PROMPT.to_string()
    }

    fn default_request_timeout_secs() -> u64 {
        120
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            max_tokens: Self::default_max_tokens(),
            system_prompt: Self::default_system_prompt(),
            request_timeout_secs: Self::default_request_timeout_secs(),
        }
    }
}

/// Bounds on a single conversation's tool loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum number of tool-execution rounds before giving up.
    #[serde(default = "AgentConfig::default_max_rounds")]
    pub max_rounds: u32,

    /// Wall-clock budget for one conversation turn. 0 disables the check.
    #[serde(default = "AgentConfig::default_wall_clock_secs")]
    pub wall_clock_secs: u64,
}

impl AgentConfig {
    fn default_max_rounds() -> u32 {
        8
    }

    fn default_wall_clock_secs() -> u64 {
        120
    }

    pub fn wall_clock(&self) -> Option<Duration> {
        (self.wall_clock_secs > 0).then(|| Duration::from_secs(self.wall_clock_secs))
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: Self::default_max_rounds(),
            wall_clock_secs: Self::default_wall_clock_secs(),
        }
    }
}

/// How `verify_on_flare` submissions are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    /// Mocked submission, no ledger contact.
    #[default]
    Simulated,
    /// Real FdcHub submission (requires a signer; not wired up).
    Live,
}

impl std::str::FromStr for SubmissionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simulated" | "mock" => Ok(Self::Simulated),
            "live" => Ok(Self::Live),
            other => Err(format!("unknown submission mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionConfig {
    #[serde(default)]
    pub mode: SubmissionKind,

    /// Artificial latency for simulated submissions.
    #[serde(default = "SubmissionConfig::default_delay_ms")]
    pub delay_ms: u64,

    /// Round reported by simulated submissions.
    #[serde(default = "SubmissionConfig::default_demo_round_id")]
    pub demo_round_id: u64,
}

impl SubmissionConfig {
    fn default_delay_ms() -> u64 {
        1000
    }

    fn default_demo_round_id() -> u64 {
        915_000
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            mode: SubmissionKind::default(),
            delay_ms: Self::default_delay_ms(),
            demo_round_id: Self::default_demo_round_id(),
        }
    }
}

/// Flare Coston2 endpoints and per-stage timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "OracleConfig::default_rpc_url")]
    pub rpc_url: String,

    /// ContractRegistry used to resolve FtsoV2 and RandomNumberV2.
    #[serde(default = "OracleConfig::default_registry_address")]
    pub registry_address: String,

    #[serde(default = "OracleConfig::default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    #[serde(default = "OracleConfig::default_verifier_url")]
    pub verifier_url: String,

    #[serde(default = "OracleConfig::default_da_layer_url")]
    pub da_layer_url: String,

    /// Public testnet verifier key.
    #[serde(default = "OracleConfig::default_api_key")]
    pub api_key: String,

    #[serde(default = "OracleConfig::default_verifier_timeout_secs")]
    pub verifier_timeout_secs: u64,

    #[serde(default = "OracleConfig::default_da_timeout_secs")]
    pub da_timeout_secs: u64,

    #[serde(default)]
    pub submission: SubmissionConfig,
}

impl OracleConfig {
    fn default_rpc_url() -> String {
        "https://coston2-api.flare.network/ext/C/rpc".to_string()
    }

    fn default_registry_address() -> String {
        "0xaD67FE66660Fb8dFE9d6b1b4240d8650e30F6019".to_string()
    }

    fn default_rpc_timeout_secs() -> u64 {
        10
    }

    fn default_verifier_url() -> String {
        "https://fdc-verifiers-testnet.flare.network".to_string()
    }

    fn default_da_layer_url() -> String {
        "https://coston2-da.flare.network".to_string()
    }

    fn default_api_key() -> String {
        "00000000-0000-0000-0000-000000000000".to_string()
    }

    fn default_verifier_timeout_secs() -> u64 {
        10
    }

    fn default_da_timeout_secs() -> u64 {
        5
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn verifier_timeout(&self) -> Duration {
        Duration::from_secs(self.verifier_timeout_secs)
    }

    pub fn da_timeout(&self) -> Duration {
        Duration::from_secs(self.da_timeout_secs)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            rpc_url: Self::default_rpc_url(),
            registry_address: Self::default_registry_address(),
            rpc_timeout_secs: Self::default_rpc_timeout_secs(),
            verifier_url: Self::default_verifier_url(),
            da_layer_url: Self::default_da_layer_url(),
            api_key: Self::default_api_key(),
            verifier_timeout_secs: Self::default_verifier_timeout_secs(),
            da_timeout_secs: Self::default_da_timeout_secs(),
            submission: SubmissionConfig::default(),
        }
    }
}
