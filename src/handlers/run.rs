use crate::{
    execution::{languages::supports_local_runner, sandbox::SandboxOutcome},
    models::{CompileErrorResponse, ErrorResponse, RunRequest, RunResponse},
    AppState,
};
use axum::{extract::{rejection::JsonRejection, State}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Compile and run C++ in the local sandbox
pub async fn run_local(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RunResponse>), (StatusCode, Json<ErrorResponse>)> {
    info!("[/run] Local C++ runner called");
    let request = json_body(payload)?;

    let (language, code) = match (non_empty(request.language), non_empty(request.code)) {
        (Some(language), Some(code)) => (language, code),
        _ => {
            return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "language and code are required"));
        }
    };

    if !supports_local_runner(&language) {
        return Err(ErrorResponse::reply(
            StatusCode::BAD_REQUEST,
            "Only C++ execution is supported server-side for now",
        ));
    }

    match app_state.dispatcher.run_local(&code, request.input.as_deref()).await {
        Ok(SandboxOutcome::CompileError(compile_error)) => Ok((
            StatusCode::OK,
            Json(RunResponse::CompileError(CompileErrorResponse { compile_error })),
        )),
        Ok(SandboxOutcome::Completed(result)) => Ok((StatusCode::OK, Json(RunResponse::Completed(result)))),
        Err(e) => {
            error!("Local runner failed: {}", e);
            Err(ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Unwrap a JSON body. A request without a JSON body counts as an empty
/// object; any other rejection is a bad request.
pub(crate) fn json_body<T: Default>(
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, (StatusCode, Json<ErrorResponse>)> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(rejection) => {
            debug!("Rejected request body: {}", rejection.body_text());
            Err(ErrorResponse::reply(
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {}", rejection.body_text()),
            ))
        }
    }
}
