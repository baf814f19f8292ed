use crate::{
    error::{GraphiteError, Result},
    models::{ValidatedRefinement, ValidatedSubmission},
};
use minijinja::{context, Environment};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_PRESET: &str = "floor-plan";

const CLAUSE_SEPARATOR: &str = "\n\n";

const FLOOR_PLAN_BASE: &str = "Given a 2D floor plan diagram or sketch, generate a 3D top-down architectural model. \
The output should maintain the exact layout and spatial relationships of rooms, walls, doors, and windows as depicted in the input. \
Ensure that furniture and fixtures are accurately represented. \
The perspective should be a clear, overhead, slightly angled view.";

const FLOOR_PLAN_STYLE: &str = "Use the provided mood board images to strongly influence the colors, textures, materials, and overall aesthetic of the render.";

/// Prompt wording plus the model it is written for. Clauses are minijinja
/// templates; `refinement_clause` and `refine_instruction` receive
/// `text_prompt`, `style_clause` receives `mood_board_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub model: String,
    pub base_instruction: String,
    pub refinement_clause: String,
    pub style_clause: String,
    pub refine_instruction: String,
}

impl PromptTemplate {
    pub fn presets() -> &'static [&'static str] {
        &["floor-plan", "isometric", "mood-board"]
    }

    pub fn preset(name: &str) -> Option<Self> {
        let (base_instruction, style_clause) = match name {
            "floor-plan" => (FLOOR_PLAN_BASE, FLOOR_PLAN_STYLE),
            "isometric" => (
                "Turn the attached 2D architectural sketch into a clean 3D isometric render. \
Keep every wall, opening and room exactly where the sketch places it, extrude walls to a realistic height, \
and show furnishings that match each room's purpose. Use soft daylight and a neutral background.",
                "Match the palette, materials and lighting of the {{ mood_board_count }} reference image(s) that follow the sketch.",
            ),
            "mood-board" => (
                "You generate 3D renders of architectural designs from a 2D sketch and a mood board of images. \
Reproduce the sketch's layout faithfully as a slightly angled overhead 3D view.",
                "The mood board images guide the colors, textures, and overall aesthetic of the 3D render.",
            ),
            _ => return None,
        };
        Some(Self::from_wording(name, base_instruction, style_clause))
    }

    fn from_wording(name: &str, base_instruction: &str, style_clause: &str) -> Self {
        Self {
            name: name.to_string(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            base_instruction: base_instruction.to_string(),
            refinement_clause: "Apply the following refinements: \"{{ text_prompt }}\"".to_string(),
            style_clause: style_clause.to_string(),
            refine_instruction: "Refine the attached 3D architectural render. \
Keep the layout unchanged and incorporate this feedback: \"{{ text_prompt }}\""
                .to_string(),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let template: PromptTemplate = serde_json::from_str(&raw).map_err(|e| {
            GraphiteError::ConfigError(format!(
                "invalid prompt template {}: {}",
                path.display(),
                e
            ))
        })?;
        template.check()?;
        Ok(template)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Compiles every clause so syntax errors surface at start-up.
    pub fn check(&self) -> Result<()> {
        let env = Environment::new();
        for source in [
            &self.base_instruction,
            &self.refinement_clause,
            &self.style_clause,
            &self.refine_instruction,
        ] {
            env.template_from_str(source)?;
        }
        if self.model.trim().is_empty() {
            return Err(GraphiteError::ConfigError(format!(
                "prompt template '{}' has no model",
                self.name
            )));
        }
        Ok(())
    }

    /// Base instruction, then the refinement clause if a text prompt is
    /// present, then the style clause if mood board images are present.
    pub fn build_prompt(&self, submission: &ValidatedSubmission) -> Result<String> {
        let env = Environment::new();
        let mut prompt = env.render_str(&self.base_instruction, context! {})?;

        if let Some(text_prompt) = submission.text_prompt() {
            prompt.push_str(CLAUSE_SEPARATOR);
            prompt.push_str(&env.render_str(&self.refinement_clause, context! { text_prompt })?);
        }

        let mood_board_count = submission.mood_board().len();
        if mood_board_count > 0 {
            prompt.push_str(CLAUSE_SEPARATOR);
            prompt.push_str(&env.render_str(&self.style_clause, context! { mood_board_count })?);
        }

        Ok(prompt)
    }

    pub fn build_refine_prompt(&self, refinement: &ValidatedRefinement) -> Result<String> {
        let env = Environment::new();
        let text_prompt = refinement.text_prompt();
        Ok(env.render_str(&self.refine_instruction, context! { text_prompt })?)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::from_wording(DEFAULT_PRESET, FLOOR_PLAN_BASE, FLOOR_PLAN_STYLE)
    }
}
