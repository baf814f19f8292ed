pub mod image_client;
pub mod text_client;

use crate::{
    backend::{GenerationRequest, RenderBackend},
    config::BedrockConfig,
    error::{GraphiteError, Result},
    models::{DataUri, PlanVerdict},
};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_bedrockruntime::{
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    Client,
};

pub use image_client::ImageClient;
pub use text_client::TextClient;

/// Render backend on AWS Bedrock: Titan for images, Claude for classification.
#[derive(Clone)]
pub struct BedrockBackend {
    image_client: ImageClient,
    text_client: TextClient,
    classifier_model: String,
}

impl BedrockBackend {
    pub async fn new(bedrock_config: BedrockConfig) -> Result<Self> {
        let aws_config = if let (Some(access_key), Some(secret_key)) =
            (&bedrock_config.access_key, &bedrock_config.secret_key)
        {
            aws_config::defaults(BehaviorVersion::latest())
                .credentials_provider(aws_sdk_bedrockruntime::config::Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    "graphite3d",
                ))
                .region(aws_sdk_bedrockruntime::config::Region::new(
                    bedrock_config
                        .region
                        .clone()
                        .unwrap_or_else(|| "us-east-1".to_string()),
                ))
                .load()
                .await
        } else {
            aws_config::load_defaults(BehaviorVersion::latest()).await
        };

        let client = Client::new(&aws_config);

        Ok(Self {
            image_client: ImageClient::new(client.clone()),
            text_client: TextClient::new(client),
            classifier_model: bedrock_config.classifier_model,
        })
    }
}

/// Maps SDK failures onto error text carrying the markers the pipeline
/// looks for (`SAFETY`, `DEADLINE_EXCEEDED`).
pub(crate) fn invoke_error<E, R>(e: SdkError<E, R>) -> GraphiteError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    if matches!(e, SdkError::TimeoutError(_)) {
        return GraphiteError::ServiceError(format!(
            "DEADLINE_EXCEEDED: {}",
            DisplayErrorContext(&e)
        ));
    }

    if let Some(service_error) = e.as_service_error() {
        let code = service_error.code().unwrap_or("unknown");
        let message = service_error.message().unwrap_or("no message");
        log::error!("Service error code: {:?}", code);
        log::error!("Service error message: {:?}", message);
        return GraphiteError::ServiceError(classify_service_error(code, message));
    }

    log::error!("AWS SDK error details: {}", DisplayErrorContext(&e));
    GraphiteError::AwsError(format!("AWS SDK error: {}", DisplayErrorContext(&e)))
}

fn classify_service_error(code: &str, message: &str) -> String {
    if message.contains("content filters") || message.contains("blocked") {
        format!("SAFETY: {}", message)
    } else if code == "ModelTimeoutException" {
        format!("DEADLINE_EXCEEDED: {}", message)
    } else {
        format!("Bedrock service error: {} - {}", code, message)
    }
}

/// Titan conditions on exactly one image, so extra references are refused
/// instead of being dropped behind the prompt's back.
fn conditioning_image(images: &[DataUri]) -> Result<&DataUri> {
    match images {
        [sketch] => Ok(sketch),
        [] => Err(GraphiteError::RequestError(
            "no image to condition on".into(),
        )),
        [_, references @ ..] => {
            log::warn!(
                "Refusing {} mood board image(s): Titan conditions on the sketch only",
                references.len()
            );
            Err(GraphiteError::RequestError(
                "mood board images are not supported by the bedrock backend".into(),
            ))
        }
    }
}

#[async_trait]
impl RenderBackend for BedrockBackend {
    fn name(&self) -> &'static str {
        "bedrock"
    }

    async fn classify_sketch(&self, sketch: &DataUri) -> Result<PlanVerdict> {
        self.text_client
            .classify(&self.classifier_model, sketch)
            .await
    }

    async fn generate_render(&self, request: GenerationRequest) -> Result<Option<DataUri>> {
        let sketch = conditioning_image(&request.images)?;
        self.image_client
            .generate(&request.model, &request.prompt, sketch)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> DataUri {
        "data:image/png;base64,iVBORw0KGgo=".parse().unwrap()
    }

    #[tokio::test]
    async fn builds_from_static_credentials_without_network() {
        let config = BedrockConfig::new()
            .with_region("eu-west-1")
            .with_credentials("AKIDEXAMPLE", "secret");
        let backend = BedrockBackend::new(config).await.unwrap();
        assert_eq!(backend.name(), "bedrock");
    }

    #[test]
    fn conditions_on_a_lone_sketch() {
        let images = vec![png()];
        assert_eq!(conditioning_image(&images).unwrap(), &images[0]);
    }

    #[test]
    fn mood_board_images_are_refused() {
        let images = vec![png(), "data:image/jpeg;base64,/9j/4AA=".parse().unwrap()];
        let err = conditioning_image(&images).unwrap_err();
        assert!(matches!(err, GraphiteError::RequestError(_)));
        assert_eq!(
            err.to_string(),
            "Request error: mood board images are not supported by the bedrock backend"
        );
        assert!(conditioning_image(&[]).is_err());
    }

    #[test]
    fn content_filter_rejections_become_safety_errors() {
        let text = classify_service_error(
            "ValidationException",
            "This request has been blocked by our content filters.",
        );
        assert!(text.starts_with("SAFETY:"));
    }

    #[test]
    fn model_timeouts_become_deadline_errors() {
        let text = classify_service_error("ModelTimeoutException", "Model has timed out");
        assert!(text.contains("DEADLINE_EXCEEDED"));
    }

    #[test]
    fn other_service_errors_keep_code_and_message() {
        assert_eq!(
            classify_service_error("AccessDeniedException", "no access"),
            "Bedrock service error: AccessDeniedException - no access"
        );
    }
}
