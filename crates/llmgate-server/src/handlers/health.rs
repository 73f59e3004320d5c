//! Health check handler.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// Report model identity, handle state and session utilization.
///
/// Never triggers model initialization.
pub async fn handle_health(State(state): State<AppState>) -> Json<Value> {
    let model = state.model.config();
    Json(json!({
        "status": "ok",
        "model": {
            "name": model.name,
            "file": model.file,
            "kind": model.kind,
            "state": state.model.state().as_str(),
        },
        "sessions": {
            "active": state.sessions.active_count(),
            "max_concurrent": state.sessions.max_concurrent(),
            "available": state.sessions.available_permits(),
        },
        "backlog": {
            "queued": state.sessions.queued_count(),
            "max": state.sessions.max_backlog(),
        }
    }))
}
