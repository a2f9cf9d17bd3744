//! HTTP gateway: chat, health and lottery endpoints.

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use copilot_agent::{ChatRequest, Orchestrator};
use flare_oracles::{FlareOracles, RandomOracle};
use flareconf::CopilotConfig;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::lottery;

/// Shared state for the handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub random: RandomOracle,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, oracles: &FlareOracles) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            random: oracles.random.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .route("/lottery/roll", get(handle_lottery_roll))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn handle_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected chat body");
            return error_response(StatusCode::BAD_REQUEST, "messages array is required");
        }
    };

    if request.messages.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "messages array is required");
    }

    let reply = state.orchestrator.run(request.messages).await;
    info!(
        state = ?reply.state,
        model_calls = reply.model_calls,
        "chat turn finished"
    );
    Json(reply.response).into_response()
}

async fn handle_lottery_roll(State(state): State<AppState>) -> Response {
    match lottery::roll(&state.random).await {
        Ok(number) => Json(json!({ "number": number })).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "lottery roll failed");
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

/// Build the oracles and orchestrator from config, then serve until signalled.
pub async fn run(config: &CopilotConfig) -> Result<()> {
    config.require_api_key()?;

    let oracles =
        FlareOracles::from_config(&config.oracle).context("Failed to build oracle clients")?;
    let orchestrator = copilot_agent::build_orchestrator(config, oracles.clone())
        .context("Failed to build model provider")?;

    let app = router(AppState::new(orchestrator, &oracles));

    let addr = config.bind.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(
        model = %config.model.model,
        rpc = %config.oracle.rpc_url,
        submission = ?oracles.fdc.mode(),
        "Flare Copilot gateway listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
