use crate::{
    execution::dispatcher::{DispatchError, ExecutionReport},
    handlers::run::{json_body, non_empty},
    models::{ErrorResponse, ExecuteRequest, ExecuteResponse},
    AppState,
};
use axum::{extract::{rejection::JsonRejection, State}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{error, info};

/// Run code with the full dispatch policy: script runner, remote service,
/// then local fallback
pub async fn execute(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ExecuteResponse>), (StatusCode, Json<ErrorResponse>)> {
    let request = json_body(payload)?;
    let (language, code) = match (non_empty(request.language), non_empty(request.code)) {
        (Some(language), Some(code)) => (language, code),
        _ => {
            return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "language and code are required"));
        }
    };
    info!("[/execute] Dispatching {} submission", language);

    match app_state.dispatcher.execute(&language, &code, request.input.as_deref()).await {
        Ok(ExecutionReport { outcome, notices }) => Ok((StatusCode::OK, Json(ExecuteResponse { outcome, notices }))),
        // Network trouble is not a program failure
        Err(e @ DispatchError::Remote(_)) => {
            error!("Dispatch failed: {}", e);
            Err(ErrorResponse::reply(StatusCode::BAD_GATEWAY, e.to_string()))
        }
        Err(e) => {
            error!("Dispatch failed: {}", e);
            Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
