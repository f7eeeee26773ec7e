use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::execution::sandbox::SandboxLimits;
use crate::execution::script::ScriptLimits;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Public base URL of the WebSocket endpoint and HTTP API
    pub backend_url: Option<String>,

    /// CORS allowed origins, comma separated
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Remote execution service endpoint
    #[serde(default = "default_piston_url")]
    pub piston_url: String,

    #[serde(default = "default_piston_timeout_secs")]
    pub piston_timeout_secs: u64,

    /// Compiler used by the local runner
    #[serde(default = "default_cpp_compiler")]
    pub cpp_compiler: String,

    #[serde(default = "default_compile_timeout_ms")]
    pub compile_timeout_ms: u64,

    #[serde(default = "default_compile_max_output")]
    pub compile_max_output: usize,

    #[serde(default = "default_run_timeout_ms")]
    pub run_timeout_ms: u64,

    #[serde(default = "default_run_max_output")]
    pub run_max_output: usize,

    /// Parent directory for per-request workspaces (OS temp dir if unset)
    pub workspace_root: Option<PathBuf>,

    /// Interpreter for the browser-native scripting language
    #[serde(default = "default_script_interpreter")]
    pub script_interpreter: String,

    #[serde(default = "default_script_timeout_ms")]
    pub script_timeout_ms: u64,

    #[serde(default = "default_run_max_output")]
    pub script_max_output: usize,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy
        Ok(envy::from_env::<Config>()?)
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL clients should use for the API and the WebSocket endpoint
    pub fn public_url(&self) -> String {
        match &self.backend_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.server_address()),
        }
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "prod" || self.environment.to_lowercase() == "production"
    }

    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .map(|origin| origin.to_string())
            .collect()
    }

    pub fn sandbox_limits(&self) -> SandboxLimits {
        SandboxLimits {
            compile_timeout: Duration::from_millis(self.compile_timeout_ms),
            compile_max_output: self.compile_max_output,
            run_timeout: Duration::from_millis(self.run_timeout_ms),
            run_max_output: self.run_max_output,
        }
    }

    pub fn script_limits(&self) -> ScriptLimits {
        ScriptLimits {
            timeout: Duration::from_millis(self.script_timeout_ms),
            max_output: self.script_max_output,
        }
    }

    /// Tracing filter used when `RUST_LOG` is unset; `log_level` covers
    /// everything outside this crate
    pub fn default_log_filter(&self) -> String {
        format!("code_sync=debug,tower_http=debug,axum::rejection=trace,{}", self.log_level)
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            backend_url: None,
            cors_origins: default_cors_origins(),
            log_level: default_log_level(),
            piston_url: default_piston_url(),
            piston_timeout_secs: default_piston_timeout_secs(),
            cpp_compiler: default_cpp_compiler(),
            compile_timeout_ms: default_compile_timeout_ms(),
            compile_max_output: default_compile_max_output(),
            run_timeout_ms: default_run_timeout_ms(),
            run_max_output: default_run_max_output(),
            workspace_root: None,
            script_interpreter: default_script_interpreter(),
            script_timeout_ms: default_script_timeout_ms(),
            script_max_output: default_run_max_output(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_cors_origins() -> String {
    "http://localhost:3000,http://127.0.0.1:3000,http://localhost:5001".to_string()
}

fn default_piston_url() -> String {
    "https://emkc.org/api/v2/piston/execute".to_string()
}

fn default_piston_timeout_secs() -> u64 {
    15
}

fn default_cpp_compiler() -> String {
    "g++".to_string()
}

fn default_compile_timeout_ms() -> u64 {
    10_000
}

fn default_compile_max_output() -> usize {
    1024 * 1024
}

fn default_run_timeout_ms() -> u64 {
    5_000
}

fn default_run_max_output() -> usize {
    10 * 1024 * 1024
}

fn default_script_interpreter() -> String {
    "node".to_string()
}

fn default_script_timeout_ms() -> u64 {
    8_000
}
