use crate::{
    error::{GraphiteError, Result},
    models::gemini::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse},
};
use reqwest::StatusCode;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_BASE)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Opt-in request deadline. Without one the transport's own limits apply.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    pub fn generate_content_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    pub async fn generate_content(
        &self,
        model: &str,
        payload: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.generate_content_url(model);
        log::debug!("Invoking model: {} on {}", model, url);

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.as_str())
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(transport_error)?;

        if !status.is_success() {
            log::error!("Gemini request to {} failed with {}: {}", model, status, text);
            return Err(GraphiteError::ServiceError(describe_error(status, &text)));
        }

        serde_json::from_str::<GenerateContentResponse>(&text).map_err(|e| {
            log::error!("Response deserialize failed. Response: {}", text);
            GraphiteError::ResponseError(e.to_string())
        })
    }
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            log::warn!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
}

fn transport_error(e: reqwest::Error) -> GraphiteError {
    if e.is_timeout() {
        GraphiteError::ServiceError(format!("DEADLINE_EXCEEDED: {}", e))
    } else {
        GraphiteError::Http(e)
    }
}

/// Renders a failed response as `<STATUS>: <message>`, keeping the Google
/// status code name so markers like `DEADLINE_EXCEEDED` survive.
pub fn describe_error(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.status.is_empty() => {
            format!("{}: {}", envelope.error.status, envelope.error.message)
        }
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ if status == StatusCode::GATEWAY_TIMEOUT => {
            format!("DEADLINE_EXCEEDED: request failed with status {}", status)
        }
        _ if status == StatusCode::NOT_FOUND => "Gemini model not found".to_string(),
        _ => format!("Request failed with status: {}", status),
    }
}
