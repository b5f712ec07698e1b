use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status and whether analyses can take the live AI path.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let ai_mode = if state.orchestrator.has_ai() {
        "live"
    } else {
        "fallback"
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "bid-assessor",
        "ai_mode": ai_mode,
        "ai_timeout_secs": state.config.ai_timeout_secs
    }))
}
