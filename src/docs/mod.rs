use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Room and host diagnostics
#[utoipa::path(
    get,
    path = "/diagnostics",
    responses(
        (status = 200, description = "Current counters", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Compile and run C++ locally
#[utoipa::path(
    post,
    path = "/run",
    request_body = RunRequest,
    responses(
        (status = 200, description = "Program output or compiler diagnostics", body = RunResponse),
        (status = 400, description = "Missing fields or unsupported language", body = ErrorResponse),
        (status = 500, description = "Runner failure", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn run_local_doc() {}

/// Execute through the remote execution service
#[utoipa::path(
    post,
    path = "/run-piston",
    request_body = RunPistonRequest,
    responses(
        (status = 200, description = "Normalized execution result", body = ExecutionResult),
        (status = 400, description = "Missing language or source", body = ErrorResponse),
        (status = 500, description = "Execution service unavailable", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn run_piston_doc() {}

/// Execute with remote, local and script fallbacks
#[utoipa::path(
    post,
    path = "/execute",
    request_body = ExecuteRequest,
    responses(
        (status = 200, description = "Execution outcome and fallback notices", body = ExecuteResponse),
        (status = 400, description = "Missing language or code", body = ErrorResponse),
        (status = 502, description = "Execution service unavailable and no fallback", body = ErrorResponse),
        (status = 500, description = "Runner failure", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn execute_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        diagnostics_doc,
        run_local_doc,
        run_piston_doc,
        execute_doc,
    ),
    components(
        schemas(
            HealthResponse,
            DiagnosticsResponse,
            ErrorResponse,
            Engine,
            ExecutionResult,
            RunRequest,
            RunResponse,
            CompileErrorResponse,
            SourceFile,
            RunPistonRequest,
            ExecuteRequest,
            ExecuteResponse,
            DispatchOutcome,
        )
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
