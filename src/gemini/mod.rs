pub mod client;

use crate::{
    backend::{GenerationRequest, RenderBackend, CLASSIFY_INSTRUCTION},
    error::{GraphiteError, Result},
    models::{
        gemini::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Modality, Part},
        DataUri, PlanVerdict,
    },
};
use async_trait::async_trait;

pub use client::GeminiClient;

pub const DEFAULT_CLASSIFIER_MODEL: &str = "gemini-2.5-flash";

#[derive(Clone)]
pub struct GeminiBackend {
    client: GeminiClient,
    classifier_model: String,
}

impl GeminiBackend {
    pub fn new(client: GeminiClient) -> Self {
        Self {
            client,
            classifier_model: DEFAULT_CLASSIFIER_MODEL.to_string(),
        }
    }

    pub fn with_classifier_model(mut self, model: impl Into<String>) -> Self {
        self.classifier_model = model.into();
        self
    }

    pub fn render_request(request: &GenerationRequest) -> GenerateContentRequest {
        let mut parts = Vec::with_capacity(request.images.len() + 1);
        parts.push(Part::text(request.prompt.as_str()));
        parts.extend(request.images.iter().map(Part::image));

        GenerateContentRequest {
            contents: vec![Content::user(parts)],
            // Image-only output is rejected by the image models.
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec![Modality::Image, Modality::Text]),
                ..Default::default()
            }),
        }
    }

    pub fn classify_request(sketch: &DataUri) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user(vec![
                Part::text(CLASSIFY_INSTRUCTION),
                Part::image(sketch),
            ])],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                temperature: Some(0.0),
                ..Default::default()
            }),
        }
    }
}

/// Turns a filtered response into an error carrying the `SAFETY` marker.
fn check_blocked(response: &GenerateContentResponse) -> Result<()> {
    match response.block_reason() {
        Some(reason) => {
            log::warn!("Gemini withheld output: {}", reason);
            Err(GraphiteError::ServiceError(format!(
                "SAFETY: output blocked by the model ({})",
                reason
            )))
        }
        None => Ok(()),
    }
}

#[async_trait]
impl RenderBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn classify_sketch(&self, sketch: &DataUri) -> Result<PlanVerdict> {
        let response = self
            .client
            .generate_content(&self.classifier_model, &Self::classify_request(sketch))
            .await?;
        check_blocked(&response)?;

        let text = response.text().ok_or_else(|| {
            GraphiteError::ResponseError("classifier returned no answer".into())
        })?;
        PlanVerdict::from_model_text(&text).map_err(|e| {
            log::error!("Unreadable classifier answer: {}", text);
            GraphiteError::ResponseError(e.to_string())
        })
    }

    async fn generate_render(&self, request: GenerationRequest) -> Result<Option<DataUri>> {
        let payload = Self::render_request(&request);
        let response = self.client.generate_content(&request.model, &payload).await?;
        check_blocked(&response)?;

        let image = response.first_image();
        if image.is_none() {
            if let Some(text) = response.text() {
                log::warn!("Model answered with text instead of an image: {}", text);
            }
        }
        Ok(image)
    }
}
