//! Flare Copilot gateway.
//!
//! Serves the conversation loop over HTTP (`POST /chat`) alongside a health
//! probe and a lottery endpoint backed by Flare's on-chain randomness.

pub mod commands;
pub mod lottery;
pub mod serve;
pub mod telemetry;

pub use serve::{router, AppState};
