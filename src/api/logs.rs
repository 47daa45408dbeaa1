//! Log ring buffer endpoint

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::AppState;
use crate::services::LogEntry;

#[derive(Serialize)]
pub struct LogsResponse {
    pub logs: Vec<LogEntry>,
}

/// Dump the in-memory log buffer, oldest first
async fn get_logs(State(state): State<AppState>) -> Json<LogsResponse> {
    Json(LogsResponse {
        logs: state.log_buffer.entries(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/logs", get(get_logs))
}
