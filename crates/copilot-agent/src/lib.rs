//! Tool-augmented conversation loop for Flare Copilot.
//!
//! The [`Orchestrator`] calls the model, dispatches any requested tools
//! through the [`Dispatcher`], feeds results back, and stops on a text answer
//! or when its [`LoopBudget`] runs out. Tool calls are logged as card
//! payloads for the web front-end via [`adapter::present`].

pub mod adapter;
pub mod agent_loop;
pub mod dispatch;
pub mod handlers;
pub mod provider;
pub mod tools;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use adapter::{present, CardPayload};
pub use agent_loop::{AgentError, AgentReply, LoopBudget, Orchestrator, TerminalState};
pub use dispatch::Dispatcher;
pub use handlers::{OracleHandlers, ToolExecutor, ToolInvocation};
pub use provider::{
    AnthropicProvider, ModelClient, ModelRequest, ModelResponse, ProviderError, StopReason,
};
pub use tools::{registry, ToolDefinition, ToolName};
pub use types::*;

use flare_oracles::FlareOracles;
use std::sync::Arc;

/// Dispatcher over the real oracle handlers.
pub fn oracle_dispatcher(oracles: FlareOracles) -> Dispatcher {
    Dispatcher::new(Arc::new(OracleHandlers::new(oracles)))
}

/// Orchestrator wired to the Anthropic provider from config.
pub fn build_orchestrator(
    config: &flareconf::CopilotConfig,
    oracles: FlareOracles,
) -> Result<Orchestrator, ProviderError> {
    let provider = AnthropicProvider::from_config(&config.model)?;
    Ok(Orchestrator::new(
        Arc::new(provider),
        oracle_dispatcher(oracles),
        config.model.system_prompt.clone(),
        LoopBudget::from_config(&config.agent),
    ))
}
