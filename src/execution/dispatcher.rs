use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::execution::languages::{is_browser_script, supports_local_runner};
use crate::execution::normalize::{normalize_execution, remote_compile_error};
use crate::execution::piston::{PistonClient, PistonError, PistonRequest, PistonSource};
use crate::execution::sandbox::{Sandbox, SandboxError, SandboxOutcome};
use crate::execution::script::{run_script, NodeScriptHost, ScriptError, ScriptHost, ScriptLimits};
use crate::models::{DispatchOutcome, Engine, ExecutionResult};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("remote execution failed: {0}")]
    Remote(#[from] PistonError),
    #[error("local runner failed: {0}")]
    Local(#[from] SandboxError),
    #[error("script runner failed: {0}")]
    Script(#[from] ScriptError),
}

/// Result of one dispatched execution plus what happened along the way
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub outcome: DispatchOutcome,
    pub notices: Vec<String>,
}

/// Chooses between the remote service, the local sandbox and the script
/// runner for each request. Requests share nothing but these handles.
pub struct ExecutionDispatcher {
    piston: PistonClient,
    sandbox: Sandbox,
    script_host: Arc<dyn ScriptHost>,
    script_limits: ScriptLimits,
}

impl ExecutionDispatcher {
    pub fn new(piston: PistonClient, sandbox: Sandbox, script_host: Arc<dyn ScriptHost>, script_limits: ScriptLimits) -> Self {
        Self {
            piston,
            sandbox,
            script_host,
            script_limits,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, PistonError> {
        let piston = PistonClient::new(config.piston_url.clone(), Duration::from_secs(config.piston_timeout_secs))?;
        let sandbox = Sandbox::new(config.cpp_compiler.clone(), config.workspace_root(), config.sandbox_limits());
        let script_limits = config.script_limits();
        let script_host = Arc::new(NodeScriptHost::new(config.script_interpreter.clone(), script_limits.max_output));
        Ok(Self::new(piston, sandbox, script_host, script_limits))
    }

    /// Submit to the remote service and normalize whatever comes back
    pub async fn run_remote(&self, request: &PistonRequest) -> Result<ExecutionResult, PistonError> {
        let raw = self.piston.execute(request).await?;
        Ok(normalize_execution(Engine::Piston, raw))
    }

    /// Compile and run in the local sandbox
    pub async fn run_local(&self, code: &str, stdin: Option<&str>) -> Result<SandboxOutcome, SandboxError> {
        self.sandbox.compile_and_run(code, stdin).await
    }

    /// Full dispatch: the script runner for the browser-native language,
    /// otherwise the remote service with the local sandbox as fallback for
    /// languages it supports.
    pub async fn execute(&self, language: &str, code: &str, stdin: Option<&str>) -> Result<ExecutionReport, DispatchError> {
        let mut notices = Vec::new();

        if is_browser_script(language) {
            info!("Running {} through the script runner", language);
            let result = run_script(self.script_host.as_ref(), code, stdin, self.script_limits).await?;
            return Ok(ExecutionReport { outcome: DispatchOutcome::Completed(result), notices });
        }

        let request = PistonRequest::build(language, PistonSource::Code(code.to_string()), stdin, None);
        let remote_error = match self.piston.execute(&request).await {
            Ok(raw) => {
                let outcome = match remote_compile_error(&raw) {
                    Some(message) => DispatchOutcome::CompileError { engine: Engine::Piston, message },
                    None => DispatchOutcome::Completed(normalize_execution(Engine::Piston, raw)),
                };
                return Ok(ExecutionReport { outcome, notices });
            }
            Err(e) => e,
        };

        if !supports_local_runner(language) {
            warn!("Remote execution of {} failed with no fallback: {}", language, remote_error);
            return Err(DispatchError::Remote(remote_error));
        }

        warn!("Remote execution of {} failed, falling back to local runner: {}", language, remote_error);
        notices.push(format!("Remote execution failed: {remote_error} -- falling back to local runner"));

        let outcome = match self.sandbox.compile_and_run(code, stdin).await? {
            SandboxOutcome::CompileError(message) => DispatchOutcome::CompileError { engine: Engine::Local, message },
            SandboxOutcome::Completed(result) => DispatchOutcome::Completed(result),
        };
        Ok(ExecutionReport { outcome, notices })
    }
}
