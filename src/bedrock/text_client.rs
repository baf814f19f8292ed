use super::invoke_error;
use crate::{
    backend::CLASSIFY_INSTRUCTION,
    error::{GraphiteError, Result},
    models::{DataUri, PlanVerdict},
};
use aws_sdk_bedrockruntime::{primitives::Blob, Client};
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_CLASSIFIER_MODEL: &str = "anthropic.claude-3-haiku-20240307-v1:0";

#[derive(Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeBlock>,
}

#[derive(Deserialize)]
struct ClaudeBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Asks an Anthropic vision model on Bedrock whether an upload is a plan.
#[derive(Clone)]
pub struct TextClient {
    client: Client,
}

impl TextClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn classify_payload(sketch: &DataUri) -> serde_json::Value {
        json!({
            "anthropic_version": "bedrock-2023-05-31",
            "max_tokens": 300,
            "temperature": 0.0,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": sketch.mime_type(),
                            "data": sketch.data()
                        }
                    },
                    {"type": "text", "text": CLASSIFY_INSTRUCTION}
                ]
            }]
        })
    }

    pub async fn classify(&self, model_id: &str, sketch: &DataUri) -> Result<PlanVerdict> {
        let request_json = serde_json::to_string(&Self::classify_payload(sketch))?;

        log::info!("Invoking model: {}", model_id);

        let response = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(request_json.into_bytes()))
            .send()
            .await
            .map_err(invoke_error)?;

        let claude: ClaudeResponse = serde_json::from_slice(response.body.as_ref())
            .map_err(|e| GraphiteError::ResponseError(e.to_string()))?;
        let text: String = claude
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();

        PlanVerdict::from_model_text(&text)
            .map_err(|e| GraphiteError::ResponseError(format!("unreadable classifier answer: {}", e)))
    }
}
