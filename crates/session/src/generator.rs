//! Client for the remote image-to-code generator.
//!
//! The generator is a black box: it receives an image as a data URL and
//! answers with component source text. [`CodeGenerator`] is the seam hosts
//! and tests program against; [`HttpGenerator`] is the `ureq` implementation.

use async_trait::async_trait;
use livecode_core::RawGeneration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::image::ImageInput;

/// Path appended to the configured generator base URL.
pub const GENERATE_PATH: &str = "/generate-code";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("could not reach the generator: {0}")]
    Transport(String),
    #[error("generator responded with status {status}")]
    Status { status: u16 },
    #[error("generator response was malformed: {0}")]
    MalformedBody(String),
}

/// Request body sent to the generator.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    image: &'a str,
}

/// Success body returned by the generator.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    code: String,
}

#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(&self, image: &ImageInput) -> Result<RawGeneration, GenerationError>;
}

/// Calls `POST {base_url}/generate-code`.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    base_url: String,
    timeout: Duration,
}

impl HttpGenerator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        HttpGenerator {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, GENERATE_PATH)
    }

    /// Blocking request; run it off the async executor.
    pub fn generate_blocking(&self, image: &ImageInput) -> Result<RawGeneration, GenerationError> {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build();
        let agent: ureq::Agent = config.into();
        let url = self.endpoint();
        tracing::info!(%url, bytes = image.data_url().len(), "requesting generation");
        let response = agent.post(&url).send_json(GenerateRequest {
            image: image.data_url(),
        });
        match response {
            Ok(resp) => {
                let body: GenerateResponse = resp
                    .into_body()
                    .read_json()
                    .map_err(|e| GenerationError::MalformedBody(e.to_string()))?;
                Ok(RawGeneration::new(body.code))
            }
            Err(ureq::Error::StatusCode(status)) => Err(GenerationError::Status { status }),
            Err(e) => Err(GenerationError::Transport(e.to_string())),
        }
    }
}

#[async_trait]
impl CodeGenerator for HttpGenerator {
    async fn generate(&self, image: &ImageInput) -> Result<RawGeneration, GenerationError> {
        let client = self.clone();
        let image = image.clone();
        tokio::task::spawn_blocking(move || client.generate_blocking(&image))
            .await
            .map_err(|e| GenerationError::Transport(format!("task join error: {}", e)))?
    }
}

/// Parse a generator success body; exposed for hosts that bring their own
/// transport.
pub fn parse_response(body: &str) -> Result<RawGeneration, GenerationError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedBody(e.to_string()))?;
    Ok(RawGeneration::new(parsed.code))
}
