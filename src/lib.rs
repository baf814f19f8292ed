pub mod backend;
pub mod bedrock;
pub mod config;
pub mod error;
pub mod gemini;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod prompt;
#[cfg(feature = "server")]
pub mod server;
pub mod validation;

pub use backend::{GenerationRequest, RenderBackend};
pub use bedrock::BedrockBackend;
pub use config::{BackendKind, BedrockConfig, Config, GeminiConfig};
pub use error::{GraphiteError, Result};
pub use gemini::{GeminiBackend, GeminiClient};
pub use models::{
    DataUri, DataUriError, PlanVerdict, RefineSubmission, RenderFailure, RenderOutcome, RenderState,
    RenderSubmission, ValidatedRefinement, ValidatedSubmission,
};
pub use pipeline::RenderService;
pub use prompt::PromptTemplate;
pub use validation::{validate_refinement, validate_submission};
