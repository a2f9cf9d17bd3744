//! One-shot CLI commands.

use anyhow::{Context, Result};
use copilot_agent::{oracle_dispatcher, registry, ToolName, ToolResult};
use flare_oracles::FlareOracles;
use flareconf::CopilotConfig;
use serde_json::{json, Value};
use std::path::Path;

/// Print the tool registry as the model sees it.
pub fn tools() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(registry())?);
    Ok(())
}

/// Print where config came from, then the effective values.
pub fn config(path: Option<&Path>) -> Result<()> {
    let (config, sources) = CopilotConfig::load_with_sources_from(path)?;

    println!("# Sources:");
    if sources.files.is_empty() {
        println!("#   (no config files, using defaults)");
    }
    for file in &sources.files {
        println!("#   {}", file.display());
    }
    for var in &sources.env_overrides {
        println!("#   env: {}", var);
    }
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}

/// Look up a price through the dispatcher.
pub async fn price(config: &CopilotConfig, symbol: &str) -> Result<()> {
    let result = invoke(config, ToolName::PriceLookup, json!({ "symbol": symbol })).await?;
    print_result(&result)
}

/// Fetch an attestation proof through the dispatcher.
pub async fn proof(config: &CopilotConfig, round_id: u64) -> Result<()> {
    let result = invoke(config, ToolName::FetchProof, json!({ "round_id": round_id })).await?;
    print_result(&result)
}

async fn invoke(config: &CopilotConfig, tool: ToolName, args: Value) -> Result<ToolResult> {
    let oracles =
        FlareOracles::from_config(&config.oracle).context("Failed to build oracle clients")?;
    let dispatcher = oracle_dispatcher(oracles);
    Ok(dispatcher.dispatch(tool.as_str(), &args).await)
}

fn print_result(result: &ToolResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&result.to_value())?);
    if !result.success {
        anyhow::bail!(
            "{}",
            result.error.as_deref().unwrap_or("tool call failed")
        );
    }
    Ok(())
}
