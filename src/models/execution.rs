use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Backend that produced an execution result
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Piston,
    Local,
    Script,
}

/// Normalized outcome of one program run, whichever backend ran it
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub engine: Engine,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    #[schema(value_type = Object)]
    pub raw: Value,
}

impl ExecutionResult {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            success: false,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            timed_out: false,
            truncated: false,
            raw: Value::Null,
        }
    }

    /// Sets the exit code; success is exactly a zero exit
    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self.success = exit_code == Some(0);
        self
    }
}

/// Request body for the local compile/run endpoint
#[derive(Serialize, Deserialize, ToSchema, Debug, Default)]
pub struct RunRequest {
    pub language: Option<String>,
    pub code: Option<String>,
    pub input: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompileErrorResponse {
    pub compile_error: String,
}

/// Response of the local compile/run endpoint
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RunResponse {
    CompileError(CompileErrorResponse),
    Completed(ExecutionResult),
}

/// One named source file
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub name: Option<String>,
    pub content: String,
}

/// Request body for the remote execution endpoint
#[derive(Serialize, Deserialize, ToSchema, Debug, Default)]
pub struct RunPistonRequest {
    pub language: Option<String>,
    pub code: Option<String>,
    pub files: Option<Vec<SourceFile>>,
    pub input: Option<String>,
    pub version: Option<String>,
}

/// Request body for the full dispatch endpoint
#[derive(Serialize, Deserialize, ToSchema, Debug, Default)]
pub struct ExecuteRequest {
    pub language: Option<String>,
    pub code: Option<String>,
    pub input: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DispatchOutcome {
    Completed(ExecutionResult),
    CompileError { engine: Engine, message: String },
}

/// Response of the full dispatch endpoint
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ExecuteResponse {
    pub outcome: DispatchOutcome,
    pub notices: Vec<String>,
}
