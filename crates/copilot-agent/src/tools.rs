//! Tool registry: the closed set of tools the model may call.
//!
//! Names and input schemas are the wire contract with the model provider.
//! Schemas are generated once from the argument structs below.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    PriceLookup,
    ListAssets,
    RandomDraw,
    RandomRawValue,
    SubmitVerification,
    FetchProof,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::PriceLookup,
        ToolName::ListAssets,
        ToolName::RandomDraw,
        ToolName::RandomRawValue,
        ToolName::SubmitVerification,
        ToolName::FetchProof,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::PriceLookup => "get_flare_price",
            ToolName::ListAssets => "list_supported_assets",
            ToolName::RandomDraw => "get_random_decision",
            ToolName::RandomRawValue => "get_raw_random_number",
            ToolName::SubmitVerification => "verify_on_flare",
            ToolName::FetchProof => "get_fdc_proof",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolName::PriceLookup => {
                "Get the current USD price for a crypto asset from Flare's FTSO v2 oracle. \
                 Reads on-chain price data from the Flare Coston2 Testnet. \
                 Supported symbols: FLR, BTC, ETH."
            }
            ToolName::ListAssets => {
                "List all crypto assets currently supported by the Flare price oracle."
            }
            ToolName::RandomDraw => {
                "Get a random trading decision (BUY / SELL / HOLD) from Flare's on-chain \
                 secure random number generator. The random number is produced by the \
                 Flare protocol's Relay contract using commit-reveal entropy."
            }
            ToolName::RandomRawValue => {
                "Get the raw 256-bit secure random number from Flare's on-chain oracle. \
                 Returns the full random integer without any decision logic."
            }
            ToolName::SubmitVerification => {
                "Verify a transaction on Flare using the Flare Data Connector (FDC). \
                 Submits the transaction hash for verification and fetches the attestation proof."
            }
            ToolName::FetchProof => {
                "Fetch an attestation proof for a specific consensus round from the \
                 Flare Data Connector."
            }
        }
    }

    pub fn input_schema(&self) -> Value {
        match self {
            ToolName::PriceLookup => schema_for::<PriceArgs>(),
            ToolName::SubmitVerification => schema_for::<VerifyArgs>(),
            ToolName::FetchProof => schema_for::<ProofArgs>(),
            ToolName::ListAssets | ToolName::RandomDraw | ToolName::RandomRawValue => {
                schema_for::<NoArgs>()
            }
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown tool: {}", s))
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PriceArgs {
    #[schemars(description = "The asset ticker, e.g. \"BTC\", \"ETH\", \"FLR\"")]
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct VerifyArgs {
    #[schemars(description = "The transaction hash to verify, e.g. \"0xabc123...\"")]
    pub tx_hash: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ProofArgs {
    #[schemars(description = "The consensus round ID to fetch the proof for")]
    pub round_id: u64,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct NoArgs {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

fn schema_for<T: JsonSchema>() -> Value {
    let settings = schemars::generate::SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
    });
    let gen = settings.into_generator();
    let schema = gen.into_root_schema_for::<T>();
    let mut value = serde_json::to_value(&schema).unwrap_or_default();

    // The Messages API wants a bare object schema
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.entry("properties")
            .or_insert_with(|| Value::Object(Default::default()));
    }
    value
}

/// The tool registry, built on first use.
pub fn registry() -> &'static [ToolDefinition] {
    static REGISTRY: OnceLock<Vec<ToolDefinition>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        ToolName::ALL
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.as_str().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect()
    })
}
