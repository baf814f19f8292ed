use crate::{
    backend::{GenerationRequest, RenderBackend},
    bedrock::BedrockBackend,
    config::{BackendKind, Config},
    error::{GraphiteError, Result},
    gemini::{GeminiBackend, GeminiClient},
    logger,
    models::{RefineSubmission, RenderFailure, RenderOutcome, RenderSubmission},
    prompt::PromptTemplate,
    validation::{validate_refinement, validate_submission},
};
use std::sync::Arc;

/// Sequential render pipeline: validate, optionally classify, build the
/// prompt, generate. Every failure ends up as a [`RenderOutcome::Failed`].
#[derive(Clone)]
pub struct RenderService {
    backend: Arc<dyn RenderBackend>,
    template: PromptTemplate,
    pre_validate: bool,
}

impl RenderService {
    pub fn new(backend: Arc<dyn RenderBackend>, template: PromptTemplate) -> Self {
        Self {
            backend,
            template,
            pre_validate: false,
        }
    }

    /// Builds the backend selected by `config` along with its prompt template.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let template = config.prompt_template()?;

        let backend: Arc<dyn RenderBackend> = match config.backend {
            BackendKind::Gemini => {
                let api_key = config.gemini.api_key.clone().ok_or_else(|| {
                    GraphiteError::ConfigError("GEMINI_API_KEY is not set".into())
                })?;
                let mut client =
                    GeminiClient::with_base_url(api_key, config.gemini.api_base.as_str());
                if let Some(timeout) = config.gemini.timeout {
                    client = client.with_timeout(timeout);
                }
                Arc::new(
                    GeminiBackend::new(client)
                        .with_classifier_model(config.gemini.classifier_model.as_str()),
                )
            }
            BackendKind::Bedrock => Arc::new(BedrockBackend::new(config.bedrock.clone()).await?),
        };

        log::info!(
            "Render service ready: backend={}, preset={}, model={}",
            backend.name(),
            template.name,
            template.model
        );
        Ok(Self::new(backend, template).with_pre_validation(config.pre_validate))
    }

    pub fn with_pre_validation(mut self, enabled: bool) -> Self {
        self.pre_validate = enabled;
        self
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    pub fn pre_validates(&self) -> bool {
        self.pre_validate
    }

    pub async fn render(&self, submission: &RenderSubmission) -> RenderOutcome {
        let validated = match validate_submission(submission) {
            Ok(validated) => validated,
            Err(failure) => return failure.into(),
        };

        if self.pre_validate {
            match self.backend.classify_sketch(validated.sketch()).await {
                Ok(verdict) if verdict.is_plan => {
                    log::debug!("Sketch accepted by classifier: {}", verdict.reasoning);
                }
                Ok(verdict) => {
                    log::info!("Sketch rejected by classifier: {}", verdict.reasoning);
                    return RenderFailure::NotAPlan {
                        reasoning: verdict.reasoning,
                    }
                    .into();
                }
                Err(e) => return translate(e),
            }
        }

        let prompt = match self.template.build_prompt(&validated) {
            Ok(prompt) => prompt,
            Err(e) => return translate(e),
        };

        let mut images = Vec::with_capacity(validated.mood_board().len() + 1);
        images.push(validated.sketch().clone());
        images.extend(validated.mood_board().iter().cloned());

        self.generate(GenerationRequest {
            model: self.template.model.clone(),
            prompt,
            images,
        })
        .await
    }

    /// Re-generates an existing render with a refinement prompt.
    pub async fn refine(&self, submission: &RefineSubmission) -> RenderOutcome {
        let validated = match validate_refinement(submission) {
            Ok(validated) => validated,
            Err(failure) => return failure.into(),
        };

        let prompt = match self.template.build_refine_prompt(&validated) {
            Ok(prompt) => prompt,
            Err(e) => return translate(e),
        };

        self.generate(GenerationRequest {
            model: self.template.model.clone(),
            prompt,
            images: vec![validated.render().clone()],
        })
        .await
    }

    async fn generate(&self, request: GenerationRequest) -> RenderOutcome {
        log::info!(
            "Generating render with {} ({}) from {} image(s)",
            request.model,
            self.backend.name(),
            request.images.len()
        );
        let _timer = logger::timer("render generation");

        match self.backend.generate_render(request).await {
            Ok(Some(render)) => RenderOutcome::Rendered(render),
            Ok(None) => RenderFailure::NoImage.into(),
            Err(e) => translate(e),
        }
    }
}

fn translate(e: GraphiteError) -> RenderOutcome {
    log::error!("An error occurred during image generation: {}", e);
    RenderFailure::from_service_error(&e.to_string()).into()
}
