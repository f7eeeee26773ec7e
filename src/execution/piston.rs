use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use crate::execution::languages::{canonical_key, language_spec};
use crate::execution::normalize::normalize_code_string;
use crate::models::SourceFile;

#[derive(Debug, thiserror::Error)]
pub enum PistonError {
    #[error("failed to reach execution service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("execution service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("execution service returned malformed body: {0}")]
    Malformed(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PistonFile {
    pub name: String,
    pub content: String,
}

/// Payload accepted by the remote execution service
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PistonRequest {
    pub language: String,
    pub version: String,
    pub files: Vec<PistonFile>,
    pub stdin: String,
}

/// Source submitted for remote execution
#[derive(Debug, Clone)]
pub enum PistonSource {
    Code(String),
    Files(Vec<SourceFile>),
}

impl PistonRequest {
    /// Build a request, normalizing escaped text and filling the file name
    /// and runtime version from the language table when not supplied.
    pub fn build(language: &str, source: PistonSource, stdin: Option<&str>, version: Option<&str>) -> Self {
        let key = canonical_key(language);
        let spec = language_spec(&key);
        let files = match source {
            PistonSource::Code(code) => vec![PistonFile {
                name: spec.filename.to_string(),
                content: normalize_code_string(&code),
            }],
            PistonSource::Files(files) => files
                .into_iter()
                .map(|file| PistonFile {
                    name: file.name.filter(|name| !name.is_empty()).unwrap_or_else(|| "main.txt".to_string()),
                    content: normalize_code_string(&file.content),
                })
                .collect(),
        };

        Self {
            language: if key.is_empty() { "text".to_string() } else { key },
            version: version.filter(|v| !v.is_empty()).unwrap_or(spec.version).to_string(),
            files,
            stdin: stdin.unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug)]
pub struct PistonClient {
    client: Client,
    url: String,
}

impl PistonClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self, PistonError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    /// Submit one request and return the service's raw JSON response
    pub async fn execute(&self, request: &PistonRequest) -> Result<Value, PistonError> {
        info!("Submitting {} ({}) to {}", request.language, request.version, self.url);
        let response = self.client.post(&self.url).json(request).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PistonError::Status { status: status.as_u16(), body });
        }

        debug!("Execution service answered {} bytes", body.len());
        serde_json::from_str(&body).map_err(|e| PistonError::Malformed(e.to_string()))
    }
}
