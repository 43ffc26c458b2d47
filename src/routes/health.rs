use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{instrument, warn};

use crate::error::AppError;
use crate::state::AppState;

/// Readiness check: the account store must answer within the deadline.
#[instrument(skip_all)]
pub async fn health(State(state): State<AppState>) -> Response {
    let started = Instant::now();
    let probe = state.accounts().count().await;

    let elapsed = started.elapsed();
    if elapsed > state.request_timeout() / 2 {
        warn!(elapsed_ms = elapsed.as_millis() as u64, "Slow response from account store");
    }

    match probe {
        Ok(accounts) => Json(json!({ "status": "ok", "accounts": accounts })).into_response(),
        Err(e) => {
            let e = AppError::from(e);
            warn!(error = %e, "Health probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}
