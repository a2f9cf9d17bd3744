//! Tool name + JSON arguments → handler → `ToolResult`.
//!
//! This is the JSON boundary. Everything the model sends is parsed into a
//! typed [`ToolInvocation`] here, and nothing that goes wrong downstream
//! escapes as anything other than a `success=false` result.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{instrument, warn};

use crate::handlers::{ToolExecutor, ToolInvocation};
use crate::tools::ToolName;
use crate::types::ToolResult;

/// Parse a tool call into a typed invocation.
pub fn parse_invocation(name: &str, args: &Value) -> Result<ToolInvocation, String> {
    let tool: ToolName = name.parse()?;

    let invocation = match tool {
        ToolName::PriceLookup => ToolInvocation::PriceLookup(parse_args(tool, args)?),
        ToolName::ListAssets => ToolInvocation::ListAssets,
        ToolName::RandomDraw => ToolInvocation::RandomDraw,
        ToolName::RandomRawValue => ToolInvocation::RandomRawValue,
        ToolName::SubmitVerification => {
            ToolInvocation::SubmitVerification(parse_args(tool, args)?)
        }
        ToolName::FetchProof => ToolInvocation::FetchProof(parse_args(tool, args)?),
    };
    Ok(invocation)
}

fn parse_args<T: DeserializeOwned>(tool: ToolName, args: &Value) -> Result<T, String> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args.clone()
    };
    serde_json::from_value(args).map_err(|e| format!("Invalid {} arguments: {}", tool, e))
}

#[derive(Clone)]
pub struct Dispatcher {
    executor: Arc<dyn ToolExecutor>,
}

impl Dispatcher {
    pub fn new(executor: Arc<dyn ToolExecutor>) -> Self {
        Self { executor }
    }

    /// Never fails and never panics; every problem becomes `success=false`.
    #[instrument(skip(self, args), fields(tool.success = tracing::field::Empty))]
    pub async fn dispatch(&self, name: &str, args: &Value) -> ToolResult {
        let result = self.dispatch_inner(name, args).await;
        tracing::Span::current().record("tool.success", result.success);
        result
    }

    async fn dispatch_inner(&self, name: &str, args: &Value) -> ToolResult {
        let invocation = match parse_invocation(name, args) {
            Ok(invocation) => invocation,
            Err(message) => {
                warn!(%message, "rejected tool call");
                return ToolResult::err(message);
            }
        };

        let tool = invocation.tool();
        let outcome = AssertUnwindSafe(self.executor.execute(invocation))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(payload)) => ToolResult::ok(&payload),
            Ok(Err(e)) => {
                warn!(%tool, error = %e, validation = e.is_validation(), "tool failed");
                ToolResult::err(e.to_string())
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(%tool, %detail, "tool handler panicked");
                ToolResult::err(format!("Tool {} failed unexpectedly: {}", tool, detail))
            }
        }
    }
}
