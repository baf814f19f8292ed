use super::DataUri;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw fields of a render submission, as received from a form or JSON body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSubmission {
    #[serde(default)]
    pub sketch_data_uri: String,
    pub text_prompt: Option<String>,
    #[serde(default)]
    pub mood_board_data_uris: Vec<String>,
}

impl RenderSubmission {
    pub fn new(sketch_data_uri: impl Into<String>) -> Self {
        Self {
            sketch_data_uri: sketch_data_uri.into(),
            ..Default::default()
        }
    }

    pub fn with_text_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.text_prompt = Some(prompt.into());
        self
    }

    pub fn with_mood_board(mut self, uri: impl Into<String>) -> Self {
        self.mood_board_data_uris.push(uri.into());
        self
    }
}

/// A submission that passed validation. Only obtainable through
/// [`crate::validation::validate_submission`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSubmission {
    pub(crate) sketch: DataUri,
    pub(crate) text_prompt: Option<String>,
    pub(crate) mood_board: Vec<DataUri>,
}

impl ValidatedSubmission {
    pub fn sketch(&self) -> &DataUri {
        &self.sketch
    }

    /// The refinement text, `None` when absent or blank.
    pub fn text_prompt(&self) -> Option<&str> {
        self.text_prompt.as_deref()
    }

    pub fn mood_board(&self) -> &[DataUri] {
        &self.mood_board
    }
}

/// Request to refine an existing render with a text prompt.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineSubmission {
    #[serde(default)]
    pub render_data_uri: String,
    #[serde(default)]
    pub text_prompt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRefinement {
    pub(crate) render: DataUri,
    pub(crate) text_prompt: String,
}

impl ValidatedRefinement {
    pub fn render(&self) -> &DataUri {
        &self.render
    }

    pub fn text_prompt(&self) -> &str {
        &self.text_prompt
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderFailure {
    Invalid(String),
    NotAPlan { reasoning: String },
    NoImage,
    SafetyBlocked,
    TimedOut,
    Service(String),
    Unexpected,
}

impl RenderFailure {
    /// Translates the text of a transport or service error into a failure.
    pub fn from_service_error(message: &str) -> Self {
        if message.trim().is_empty() {
            RenderFailure::Unexpected
        } else if message.contains("SAFETY") {
            RenderFailure::SafetyBlocked
        } else if message.contains("DEADLINE_EXCEEDED") {
            RenderFailure::TimedOut
        } else {
            RenderFailure::Service(message.to_string())
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RenderFailure::Invalid(_) => "invalid",
            RenderFailure::NotAPlan { .. } => "not_a_plan",
            RenderFailure::NoImage => "no_image",
            RenderFailure::SafetyBlocked => "safety_blocked",
            RenderFailure::TimedOut => "timed_out",
            RenderFailure::Service(_) => "service",
            RenderFailure::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderFailure::Invalid(msg) => write!(f, "{}", msg),
            RenderFailure::NotAPlan { reasoning } => write!(
                f,
                "The uploaded image does not look like an architectural plan: {}",
                reasoning
            ),
            RenderFailure::NoImage => {
                write!(f, "Image generation failed. The AI did not return an image.")
            }
            RenderFailure::SafetyBlocked => write!(
                f,
                "The generation was blocked due to safety settings. Please modify your prompt or image."
            ),
            RenderFailure::TimedOut => write!(f, "The request timed out. Please try again."),
            RenderFailure::Service(detail) => write!(f, "Generation failed: {}", detail),
            RenderFailure::Unexpected => write!(
                f,
                "An unexpected error occurred during image generation. Please check the server logs."
            ),
        }
    }
}

/// Result of one render request: an image or an error, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Rendered(DataUri),
    Failed(RenderFailure),
}

impl RenderOutcome {
    pub fn render(&self) -> Option<&DataUri> {
        match self {
            RenderOutcome::Rendered(uri) => Some(uri),
            RenderOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RenderFailure> {
        match self {
            RenderOutcome::Rendered(_) => None,
            RenderOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RenderOutcome::Rendered(_))
    }
}

impl From<RenderFailure> for RenderOutcome {
    fn from(failure: RenderFailure) -> Self {
        RenderOutcome::Failed(failure)
    }
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum OutcomeBody<'a> {
    Success {
        #[serde(rename = "renderDataUri")]
        render_data_uri: &'a DataUri,
    },
    Failed {
        kind: &'static str,
        error: String,
    },
}

impl Serialize for RenderOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let body = match self {
            RenderOutcome::Rendered(uri) => OutcomeBody::Success {
                render_data_uri: uri,
            },
            RenderOutcome::Failed(failure) => OutcomeBody::Failed {
                kind: failure.kind(),
                error: failure.to_string(),
            },
        };
        body.serialize(serializer)
    }
}

/// Dashboard request lifecycle: Idle -> Submitting -> {Succeeded, Failed}.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RenderState {
    #[default]
    Idle,
    Submitting,
    Succeeded(DataUri),
    Failed(String),
}

impl RenderState {
    /// Starts a submission. Returns `None` while one is already in flight.
    pub fn begin(&self) -> Option<RenderState> {
        match self {
            RenderState::Submitting => None,
            _ => Some(RenderState::Submitting),
        }
    }

    /// Settles an in-flight submission. Returns `None` from any other state.
    pub fn finish(&self, outcome: RenderOutcome) -> Option<RenderState> {
        match self {
            RenderState::Submitting => Some(match outcome {
                RenderOutcome::Rendered(uri) => RenderState::Succeeded(uri),
                RenderOutcome::Failed(failure) => RenderState::Failed(failure.to_string()),
            }),
            _ => None,
        }
    }
}
