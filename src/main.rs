//! Math Practice Backend
//!
//! - Axum HTTP API: a single action endpoint (`generate | submit | getHistory | getHint | resetProgress`)
//! - Optional OpenAI integration for problems, feedback and hints (via environment variables)
//! - Per-user stats, achievements and bounded history
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT             : u16 (default 3000)
//!   OPENAI_API_KEY   : enables OpenAI integration if present
//!   OPENAI_BASE_URL  : default "https://api.openai.com/v1"
//!   OPENAI_MODEL     : default "gpt-4o-mini"
//!   MATH_CONFIG_PATH : path to TOML config (prompts, feedback mode, progress storage)
//!   LOG_LEVEL        : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT       : "pretty" (default) or "json"

mod achievements;
mod config;
mod domain;
mod error;
mod generator;
mod history;
mod openai;
mod progress;
mod protocol;
mod routes;
mod seeds;
mod session;
mod state;
mod stats;
mod storage;
mod store;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  dotenvy::dotenv().ok();
  telemetry::init_tracing();

  let state = Arc::new(AppState::new());
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "mathpractice_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if tokio::signal::ctrl_c().await.is_ok() {
    info!(target: "mathpractice_backend", "Shutdown signal received");
  }
}
