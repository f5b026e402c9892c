use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    handler_count: usize,
}

impl HealthState {
    pub fn new(handler_count: usize) -> Self {
        Self { handler_count }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub handlers: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let handlers = handlers_check(state.handler_count);
    let ready = handlers.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "bootcamp-server runtime initialized".to_string(),
        },
        handlers,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn handlers_check(handler_count: usize) -> HealthCheck {
    if handler_count == 0 {
        HealthCheck { status: "degraded", detail: "no slack handlers registered".to_string() }
    } else {
        HealthCheck { status: "ready", detail: format!("{handler_count} slack handlers registered") }
    }
}
