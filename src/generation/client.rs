use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, info};

use super::types::{GenerationRequest, GenerationResponse};
use crate::config::{GenerationConfig, RequestConfig};
use crate::error::{GenerationError, GenerationResult};

/// Client for the external text-generation service.
///
/// One attempt per call: retry and backoff are the service's concern, not
/// this client's.
#[derive(Clone)]
pub struct GenerationClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    request_config: RequestConfig,
}

impl GenerationClient {
    /// Create a new generation client
    pub fn new(config: &GenerationConfig, request_config: RequestConfig) -> GenerationResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(GenerationError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            request_config,
        })
    }

    /// Run one generation request
    pub async fn generate(
        &self,
        mut request: GenerationRequest,
    ) -> GenerationResult<GenerationResponse> {
        let url = format!("{}/v1/generate", self.base_url);
        if request.model.is_none() {
            request.model = Some(self.model.clone());
        }

        debug!(
            model = request.model.as_deref().unwrap_or_default(),
            messages = request.messages.len(),
            "Calling generation service"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    GenerationError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let generation: GenerationResponse =
            response
                .json()
                .await
                .map_err(|e| GenerationError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        info!(
            latency_ms = start.elapsed().as_millis() as u64,
            "Generation call succeeded"
        );
        Ok(generation)
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
