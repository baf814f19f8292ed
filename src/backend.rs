use crate::{
    error::Result,
    models::{DataUri, PlanVerdict},
};
use async_trait::async_trait;

/// Instruction sent with the sketch when pre-validation is enabled.
pub const CLASSIFY_INSTRUCTION: &str = "You review uploads for an architectural rendering tool. \
Decide whether the attached image is a genuine architectural plan: a floor plan, site plan, elevation, \
section or hand-drawn architectural sketch. Photos, screenshots, diagrams of other things and blank images are not plans. \
Reply with JSON only, in the form {\"isPlan\": true|false, \"reasoning\": \"one short sentence\"}.";

/// One generation call: instruction text followed by images, in order.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub images: Vec<DataUri>,
}

/// A hosted model able to classify sketches and generate renders.
///
/// `generate_render` returns `Ok(None)` when the call succeeded but no image
/// came back. Errors carry the provider's text so callers can look for
/// `SAFETY` / `DEADLINE_EXCEEDED` markers.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn classify_sketch(&self, sketch: &DataUri) -> Result<PlanVerdict>;

    async fn generate_render(&self, request: GenerationRequest) -> Result<Option<DataUri>>;
}
