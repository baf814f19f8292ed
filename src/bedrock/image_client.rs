use super::invoke_error;
use crate::{
    error::{GraphiteError, Result},
    models::DataUri,
};
use aws_sdk_bedrockruntime::{primitives::Blob, Client};
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_IMAGE_MODEL: &str = "amazon.titan-image-generator-v2:0";

/// Titan rejects prompts longer than this many characters.
const TITAN_MAX_PROMPT_CHARS: usize = 512;

#[derive(Deserialize)]
pub struct TitanImageResponse {
    #[serde(default)]
    pub images: Vec<String>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct ImageClient {
    client: Client,
}

impl ImageClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Titan v2 image conditioning: the sketch drives edges, the prompt drives style.
    pub fn conditioned_payload(prompt: &str, sketch: &DataUri) -> serde_json::Value {
        let text: String = prompt.chars().take(TITAN_MAX_PROMPT_CHARS).collect();
        if text.len() < prompt.len() {
            log::warn!(
                "Prompt truncated to {} characters for Titan",
                TITAN_MAX_PROMPT_CHARS
            );
        }

        json!({
            "taskType": "TEXT_IMAGE",
            "textToImageParams": {
                "text": text,
                "conditionImage": sketch.data(),
                "controlMode": "CANNY_EDGE",
                "controlStrength": 0.7
            },
            "imageGenerationConfig": {
                "numberOfImages": 1,
                "quality": "standard",
                "width": 1024,
                "height": 1024,
                "cfgScale": 8.0
            }
        })
    }

    pub async fn generate(
        &self,
        model_id: &str,
        prompt: &str,
        sketch: &DataUri,
    ) -> Result<Option<DataUri>> {
        let request_json = serde_json::to_string(&Self::conditioned_payload(prompt, sketch))?;

        log::info!("Generating image with model: {}", model_id);

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

        let titan_response: TitanImageResponse =
            serde_json::from_slice(response.body.as_ref())
                .map_err(|e| GraphiteError::ResponseError(e.to_string()))?;

        if let Some(error) = titan_response.error.filter(|e| !e.is_empty()) {
            return Err(GraphiteError::ServiceError(error));
        }

        Ok(titan_response
            .images
            .into_iter()
            .next()
            .and_then(|data| DataUri::from_base64("image/png", data).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_conditions_on_the_sketch() {
        let sketch: DataUri = "data:image/png;base64,iVBORw0KGgo=".parse().unwrap();
        let payload = ImageClient::conditioned_payload("a house", &sketch);
        assert_eq!(payload["textToImageParams"]["conditionImage"], "iVBORw0KGgo=");
        assert_eq!(payload["textToImageParams"]["controlMode"], "CANNY_EDGE");
        assert_eq!(payload["imageGenerationConfig"]["numberOfImages"], 1);
    }

    #[test]
    fn long_prompts_are_truncated() {
        let sketch: DataUri = "data:image/png;base64,iVBORw0KGgo=".parse().unwrap();
        let prompt = "é".repeat(600);
        let payload = ImageClient::conditioned_payload(&prompt, &sketch);
        let text = payload["textToImageParams"]["text"].as_str().unwrap();
        assert_eq!(text.chars().count(), TITAN_MAX_PROMPT_CHARS);
    }
}
