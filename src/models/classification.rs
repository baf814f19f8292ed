use serde::{Deserialize, Serialize};

/// Answer of the "is this an architectural plan" pre-validation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanVerdict {
    pub is_plan: bool,
    #[serde(default)]
    pub reasoning: String,
}

impl PlanVerdict {
    pub fn plan(reasoning: impl Into<String>) -> Self {
        Self {
            is_plan: true,
            reasoning: reasoning.into(),
        }
    }

    pub fn not_plan(reasoning: impl Into<String>) -> Self {
        Self {
            is_plan: false,
            reasoning: reasoning.into(),
        }
    }

    /// Parses the classifier's JSON reply. Models sometimes wrap JSON in a
    /// markdown fence, which is stripped first.
    pub fn from_model_text(text: &str) -> serde_json::Result<Self> {
        let trimmed = text.trim();
        let body = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .and_then(|s| s.strip_suffix("```"))
            .unwrap_or(trimmed);
        serde_json::from_str(body.trim())
    }
}
