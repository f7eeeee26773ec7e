use crate::{
    execution::piston::{PistonRequest, PistonSource},
    handlers::run::{json_body, non_empty},
    models::{ErrorResponse, ExecutionResult, RunPistonRequest},
    AppState,
};
use axum::{extract::{rejection::JsonRejection, State}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Execute through the remote service and return the normalized result
pub async fn run_piston(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<RunPistonRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ExecutionResult>), (StatusCode, Json<ErrorResponse>)> {
    info!("[/run-piston] Piston endpoint called");
    let request = json_body(payload)?;

    let language = non_empty(request.language);
    let source = match (request.files, non_empty(request.code)) {
        (Some(files), _) => Some(PistonSource::Files(files)),
        (None, Some(code)) => Some(PistonSource::Code(code)),
        (None, None) => None,
    };
    let (language, source) = match (language, source) {
        (Some(language), Some(source)) => (language, source),
        _ => {
            return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "language and code/files required"));
        }
    };

    let payload = PistonRequest::build(&language, source, request.input.as_deref(), request.version.as_deref());
    debug!("Sending to Piston: {:?}", payload);

    match app_state.dispatcher.run_remote(&payload).await {
        Ok(result) => Ok((StatusCode::OK, Json(result))),
        Err(e) => {
            error!("Piston execution failed: {}", e);
            Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
