use std::sync::Arc;
use std::time::Duration;

use flareconf::AgentConfig;
use thiserror::Error;
use tokio::time::Instant;

use crate::adapter::present;
use crate::dispatch::Dispatcher;
use crate::provider::{ModelClient, ModelRequest, ModelResponse, ProviderError};
use crate::tools::registry;
use crate::types::{ChatResponse, ContentBlock, Message, Role, ToolCallRecord, ToolCallStatus};

/// Bounds on one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopBudget {
    pub max_rounds: u32,
    pub wall_clock: Option<Duration>,
}

impl LoopBudget {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            max_rounds: config.max_rounds,
            wall_clock: config.wall_clock(),
        }
    }
}

impl Default for LoopBudget {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ProviderError),

    #[error("failed to serialize tool result: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalState {
    Completed,
    BudgetExceeded { rounds: u32 },
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct AgentReply {
    pub response: ChatResponse,
    pub state: TerminalState,
    /// Model calls made during the turn.
    pub model_calls: u32,
}

/// Drives model calls and tool execution until the model answers in text.
#[derive(Clone)]
pub struct Orchestrator {
    model: Arc<dyn ModelClient>,
    dispatcher: Dispatcher,
    system_prompt: String,
    budget: LoopBudget,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ModelClient>,
        dispatcher: Dispatcher,
        system_prompt: impl Into<String>,
        budget: LoopBudget,
    ) -> Self {
        Self {
            model,
            dispatcher,
            system_prompt: system_prompt.into(),
            budget,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run one conversation turn over the caller's messages.
    #[tracing::instrument(
        skip(self, messages),
        fields(
            messages = messages.len(),
            rounds = tracing::field::Empty,
            state = tracing::field::Empty,
        )
    )]
    pub async fn run(&self, messages: Vec<Message>) -> AgentReply {
        let mut turn = Turn {
            transcript: messages,
            log: Vec::new(),
            rounds: 0,
            model_calls: 0,
        };

        let (content, state) = match self.drive(&mut turn).await {
            Ok(Step::Final(text)) => (text, TerminalState::Completed),
            Ok(Step::OutOfBudget(reason)) => {
                tracing::warn!(rounds = turn.rounds, %reason, "loop budget exhausted");
                (
                    format!(
                        "I stopped after {} tool round(s) without reaching a final answer ({}).",
                        turn.rounds, reason
                    ),
                    TerminalState::BudgetExceeded {
                        rounds: turn.rounds,
                    },
                )
            }
            Err(e) => {
                tracing::error!(error = %e, "agent loop failed");
                (
                    format!("Sorry, something went wrong: {}", e),
                    TerminalState::Failed {
                        error: e.to_string(),
                    },
                )
            }
        };

        let span = tracing::Span::current();
        span.record("rounds", turn.rounds);
        span.record("state", tracing::field::debug(&state));

        AgentReply {
            response: ChatResponse::assistant(content, turn.log),
            state,
            model_calls: turn.model_calls,
        }
    }

    async fn drive(&self, turn: &mut Turn) -> Result<Step, AgentError> {
        let started = Instant::now();

        loop {
            let response = match self.call_model(turn, started).await? {
                Some(response) => response,
                None => return Ok(Step::OutOfBudget("time budget exhausted")),
            };

            if !response.wants_tools() {
                return Ok(Step::Final(response.text_content()));
            }

            if turn.rounds >= self.budget.max_rounds {
                return Ok(Step::OutOfBudget("round limit reached"));
            }
            turn.rounds += 1;
            tracing::info!(round = turn.rounds, "executing tool round");

            let results = self.execute_tools(turn, &response.content).await?;

            let assistant_blocks = response
                .content
                .into_iter()
                .filter(|b| !b.is_unknown())
                .collect();
            turn.transcript
                .push(Message::blocks(Role::Assistant, assistant_blocks));
            turn.transcript.push(Message::blocks(Role::User, results));
        }
    }

    /// `None` when the wall-clock budget runs out before the model answers.
    async fn call_model(
        &self,
        turn: &mut Turn,
        started: Instant,
    ) -> Result<Option<ModelResponse>, AgentError> {
        turn.model_calls += 1;
        let request = ModelRequest {
            system: &self.system_prompt,
            tools: registry(),
            messages: &turn.transcript,
        };

        let Some(limit) = self.budget.wall_clock else {
            return Ok(Some(self.model.complete(request).await?));
        };

        let remaining = limit.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Ok(None);
        }

        match tokio::time::timeout(remaining, self.model.complete(request)).await {
            Ok(response) => Ok(Some(response?)),
            Err(_) => Ok(None),
        }
    }

    /// Dispatch each tool_use block in order, logging a card record per call.
    async fn execute_tools(
        &self,
        turn: &mut Turn,
        content: &[ContentBlock],
    ) -> Result<Vec<ContentBlock>, AgentError> {
        let mut results = Vec::new();

        for block in content {
            let ContentBlock::ToolUse { id, name, input } = block else {
                continue;
            };

            tracing::info!(tool = %name, tool_use_id = %id, "tool call");
            let result = self.dispatcher.dispatch(name, input).await;

            let card = present(name, input, &result);
            turn.log.push(ToolCallRecord {
                id: ToolCallRecord::new_id(),
                name: card.name,
                input: card.input,
                output: card.output,
                status: if result.success {
                    ToolCallStatus::Success
                } else {
                    ToolCallStatus::Error
                },
            });

            results.push(ContentBlock::ToolResult {
                tool_use_id: id.clone(),
                content: serde_json::to_string(&result)?,
                is_error: !result.success,
            });
        }

        Ok(results)
    }
}

struct Turn {
    transcript: Vec<Message>,
    log: Vec<ToolCallRecord>,
    rounds: u32,
    model_calls: u32,
}

enum Step {
    Final(String),
    OutOfBudget(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::OracleHandlers;
    use crate::provider::StopReason;
    use crate::testing::ScriptedModel;
    use crate::types::MessageContent;
    use flare_oracles::testing::oracles;
    use flare_oracles::RandomValue;
    use serde_json::{json, Value};

    fn orchestrator(model: Arc<ScriptedModel>, budget: LoopBudget) -> Orchestrator {
        let dispatcher = Dispatcher::new(Arc::new(OracleHandlers::new(oracles(
            RandomValue::from_u128(4_200),
            vec![],
        ))));
        Orchestrator::new(model, dispatcher, "system", budget)
    }

    #[tokio::test]
    async fn test_two_tool_rounds_then_text() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(ModelResponse::tool_use("toolu_1", "get_flare_price", json!({ "symbol": "BTC" }))),
            Ok(ModelResponse::tool_use("toolu_2", "get_random_decision", json!({}))),
            Ok(ModelResponse {
                content: vec![ContentBlock::text("BTC is $6500."), ContentBlock::text("Decision: BUY.")],
                stop_reason: Some(StopReason::EndTurn),
                model: None,
            }),
        ]));

        let reply = orchestrator(model.clone(), LoopBudget::default())
            .run(vec![Message::user("price and a decision?")])
            .await;

        assert_eq!(reply.state, TerminalState::Completed);
        assert_eq!(reply.model_calls, 3);
        assert_eq!(model.calls(), 3);
        assert_eq!(reply.response.content, "BTC is $6500.\nDecision: BUY.");

        let log = reply.response.tool_calls.expect("two tool calls logged");
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].name, "get_price");
        assert_eq!(log[0].status, ToolCallStatus::Success);
        assert_eq!(log[1].name, "get_random");
        assert_eq!(log[1].output["randomNumber"], 0);

        // Third call saw: user, assistant(tool_use), user(tool_result) x2
        let seen = model.transcript_lengths();
        assert_eq!(seen, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_tool_results_replayed_with_error_flag() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(ModelResponse::tool_use("toolu_9", "get_flare_price", json!({ "symbol": "DOGE" }))),
            Ok(ModelResponse::text("DOGE isn't supported.")),
        ]));

        let reply = orchestrator(model.clone(), LoopBudget::default())
            .run(vec![Message::user("doge?")])
            .await;

        assert_eq!(reply.response.tool_calls.unwrap()[0].status, ToolCallStatus::Error);

        let last = model.last_transcript();
        let Message { role, content: MessageContent::Blocks(blocks) } = &last[2] else {
            panic!("expected tool results turn");
        };
        assert_eq!(*role, Role::User);
        match &blocks[0] {
            ContentBlock::ToolResult { tool_use_id, content, is_error } => {
                assert_eq!(tool_use_id, "toolu_9");
                assert!(*is_error);
                let parsed: Value = serde_json::from_str(content).unwrap();
                assert_eq!(parsed["success"], false);
            }
            other => panic!("unexpected block {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_model_failure_returns_apology_with_partial_log() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(ModelResponse::tool_use("toolu_1", "list_supported_assets", json!({}))),
            Err(ProviderError::Status {
                status: 500,
                body: "upstream exploded".to_string(),
            }),
        ]));

        let reply = orchestrator(model, LoopBudget::default())
            .run(vec![Message::user("assets?")])
            .await;

        assert!(matches!(reply.state, TerminalState::Failed { .. }));
        assert!(reply
            .response
            .content
            .starts_with("Sorry, something went wrong: "));
        assert!(reply.response.content.contains("upstream exploded"));
        assert_eq!(reply.response.tool_calls.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_round_budget_exceeded() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(ModelResponse::tool_use("a", "get_raw_random_number", json!({}))),
            Ok(ModelResponse::tool_use("b", "get_raw_random_number", json!({}))),
            Ok(ModelResponse::text("unreachable")),
        ]));

        let budget = LoopBudget {
            max_rounds: 1,
            wall_clock: None,
        };
        let reply = orchestrator(model.clone(), budget)
            .run(vec![Message::user("loop forever")])
            .await;

        assert_eq!(reply.state, TerminalState::BudgetExceeded { rounds: 1 });
        assert_eq!(model.calls(), 2);
        assert_eq!(reply.response.tool_calls.unwrap().len(), 1);
        assert!(reply.response.content.contains("round limit"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wall_clock_budget_exceeded() {
        let model = Arc::new(
            ScriptedModel::new(vec![Ok(ModelResponse::text("too late"))])
                .with_delay(Duration::from_secs(60)),
        );

        let budget = LoopBudget {
            max_rounds: 8,
            wall_clock: Some(Duration::from_secs(5)),
        };
        let reply = orchestrator(model, budget).run(vec![Message::user("hi")]).await;

        assert_eq!(reply.state, TerminalState::BudgetExceeded { rounds: 0 });
        assert!(reply.response.tool_calls.is_none());
    }

    #[tokio::test]
    async fn test_no_text_blocks_yields_empty_content() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(ModelResponse {
            content: vec![],
            stop_reason: Some(StopReason::EndTurn),
            model: None,
        })]));

        let reply = orchestrator(model, LoopBudget::default())
            .run(vec![Message::user("...")])
            .await;

        assert_eq!(reply.state, TerminalState::Completed);
        assert_eq!(reply.response.content, "");
        assert!(reply.response.tool_calls.is_none());
    }
}
