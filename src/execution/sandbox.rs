use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::execution::process::run_bounded;
use crate::models::{Engine, ExecutionResult};

const SOURCE_NAME: &str = "main.cpp";
const BINARY_NAME: &str = if cfg!(windows) { "a.exe" } else { "a.out" };

#[derive(Debug, Clone, PartialEq)]
pub struct SandboxLimits {
    pub compile_timeout: Duration,
    pub compile_max_output: usize,
    pub run_timeout: Duration,
    pub run_max_output: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            compile_timeout: Duration::from_secs(10),
            compile_max_output: 1024 * 1024,
            run_timeout: Duration::from_secs(5),
            run_max_output: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("failed to prepare workspace {path}: {source}")]
    Workspace { path: PathBuf, source: std::io::Error },
    #[error("failed to run {program}: {source}")]
    Process { program: String, source: std::io::Error },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SandboxOutcome {
    /// The compiler rejected the source; nothing was run
    CompileError(String),
    /// The program ran; non-zero exits and timeouts are program output
    Completed(ExecutionResult),
}

/// A uniquely named directory owned by one request.
///
/// Removed by `remove`, or on drop when a request is abandoned midway.
/// Removal failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    removed: bool,
}

impl Workspace {
    pub async fn create(root: &Path) -> Result<Self, SandboxError> {
        let path = root.join(format!("runner-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|source| SandboxError::Workspace { path: path.clone(), source })?;
        debug!("Created workspace {}", path.display());
        Ok(Self { path, removed: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn remove(mut self) {
        self.removed = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!("Removed workspace {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove workspace {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed abandoned workspace {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove workspace {}: {}", self.path.display(), e),
        }
    }
}

/// Local compile/run fallback for C++
#[derive(Debug, Clone)]
pub struct Sandbox {
    compiler: String,
    root: PathBuf,
    limits: SandboxLimits,
}

impl Sandbox {
    pub fn new(compiler: impl Into<String>, root: impl Into<PathBuf>, limits: SandboxLimits) -> Self {
        Self {
            compiler: compiler.into(),
            root: root.into(),
            limits,
        }
    }

    /// Compile and run one submission in a fresh workspace, which is gone
    /// by the time this returns.
    pub async fn compile_and_run(&self, code: &str, stdin: Option<&str>) -> Result<SandboxOutcome, SandboxError> {
        let workspace = Workspace::create(&self.root).await?;
        let outcome = self.run_in(&workspace, code, stdin).await;
        workspace.remove().await;
        outcome
    }

    async fn run_in(&self, workspace: &Workspace, code: &str, stdin: Option<&str>) -> Result<SandboxOutcome, SandboxError> {
        let source = workspace.path().join(SOURCE_NAME);
        let binary = workspace.path().join(BINARY_NAME);
        tokio::fs::write(&source, code)
            .await
            .map_err(|source_err| SandboxError::Workspace { path: source.clone(), source: source_err })?;

        // Compile
        let mut compile = Command::new(&self.compiler);
        compile
            .arg("-std=c++17")
            .arg("-O2")
            .arg(&source)
            .arg("-o")
            .arg(&binary)
            .current_dir(workspace.path());
        let compiled = run_bounded(compile, None, self.limits.compile_timeout, self.limits.compile_max_output)
            .await
            .map_err(|source| SandboxError::Process { program: self.compiler.clone(), source })?;

        if !compiled.success() {
            info!("Compilation failed in {}", workspace.path().display());
            let message = if !compiled.stderr.is_empty() {
                compiled.stderr
            } else if compiled.timed_out {
                format!("Compilation timed out after {:?}", self.limits.compile_timeout)
            } else {
                match compiled.exit_code {
                    Some(code) => format!("Compilation failed with exit code {code}"),
                    None => "Compilation was terminated".to_string(),
                }
            };
            return Ok(SandboxOutcome::CompileError(message));
        }

        // Run
        let mut run = Command::new(&binary);
        run.current_dir(workspace.path());
        let input = stdin.filter(|input| !input.is_empty());
        let output = run_bounded(run, input, self.limits.run_timeout, self.limits.run_max_output)
            .await
            .map_err(|source| SandboxError::Process { program: binary.display().to_string(), source })?;

        info!(
            "Program in {} finished: exit={:?} timed_out={}",
            workspace.path().display(),
            output.exit_code,
            output.timed_out
        );

        let mut result = ExecutionResult::new(Engine::Local).with_exit_code(output.exit_code);
        result.stdout = output.stdout;
        result.stderr = output.stderr;
        result.timed_out = output.timed_out;
        result.truncated = output.truncated;
        Ok(SandboxOutcome::Completed(result))
    }
}
