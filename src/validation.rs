use crate::models::{
    DataUri, RefineSubmission, RenderFailure, RenderSubmission, ValidatedRefinement,
    ValidatedSubmission,
};
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

pub const MAX_MOOD_BOARD_IMAGES: usize = 4;

const INVALID_INPUT: &str = "Invalid input.";

#[derive(Debug, Validate)]
struct SubmissionFields {
    #[validate(
        length(min = 1, message = "Sketch is required."),
        custom(function = "validate_sketch")
    )]
    sketch_data_uri: String,

    #[validate(
        length(max = 4, message = "You can upload at most 4 mood board images."),
        custom(function = "validate_mood_board")
    )]
    mood_board_data_uris: Vec<String>,
}

#[derive(Debug, Validate)]
struct RefinementFields {
    #[validate(
        length(min = 1, message = "A render to refine is required."),
        custom(function = "validate_render")
    )]
    render_data_uri: String,

    #[validate(custom(function = "validate_refinement_text"))]
    text_prompt: String,
}

fn image_error(code: &'static str, message: String) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Owned(message))
}

fn check_image(value: &str, what: &str) -> Result<(), ValidationError> {
    // Emptiness is reported by the length rule.
    if value.is_empty() {
        return Ok(());
    }
    match value.parse::<DataUri>() {
        Ok(uri) if uri.is_image() => Ok(()),
        Ok(uri) => Err(image_error(
            "image_type",
            format!(
                "{} must be an image, got {}.",
                what,
                uri.mime_type()
            ),
        )),
        Err(e) => Err(image_error(
            "data_uri",
            format!("{} is not a valid base64 data URI ({}).", what, e),
        )),
    }
}

fn validate_sketch(value: &str) -> Result<(), ValidationError> {
    check_image(value, "Sketch")
}

fn validate_render(value: &str) -> Result<(), ValidationError> {
    check_image(value, "Render")
}

fn validate_mood_board(uris: &[String]) -> Result<(), ValidationError> {
    for (index, uri) in uris.iter().enumerate() {
        check_image(uri, &format!("Mood board image {}", index + 1))?;
    }
    Ok(())
}

fn validate_refinement_text(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(image_error(
            "required",
            "A refinement prompt is required.".to_string(),
        ));
    }
    Ok(())
}

/// Message of the first failing field, in form order.
fn first_message(errors: &ValidationErrors, field_order: &[&str]) -> String {
    let fields = errors.field_errors();
    field_order
        .iter()
        .filter_map(|name| fields.get(*name))
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| INVALID_INPUT.to_string())
}

fn parse_checked(value: &str) -> Result<DataUri, RenderFailure> {
    value
        .parse()
        .map_err(|e: crate::models::DataUriError| RenderFailure::Invalid(e.to_string()))
}

/// Checks a raw submission. Pure: no I/O, same input gives the same answer.
pub fn validate_submission(
    submission: &RenderSubmission,
) -> Result<ValidatedSubmission, RenderFailure> {
    let fields = SubmissionFields {
        sketch_data_uri: submission.sketch_data_uri.trim().to_string(),
        mood_board_data_uris: submission
            .mood_board_data_uris
            .iter()
            .map(|uri| uri.trim())
            .filter(|uri| !uri.is_empty())
            .map(String::from)
            .collect(),
    };

    if let Err(errors) = fields.validate() {
        let message = first_message(&errors, &["sketch_data_uri", "mood_board_data_uris"]);
        log::debug!("Rejected render submission: {}", message);
        return Err(RenderFailure::Invalid(message));
    }

    let sketch = parse_checked(&fields.sketch_data_uri)?;
    let mood_board = fields
        .mood_board_data_uris
        .iter()
        .map(|uri| parse_checked(uri))
        .collect::<Result<Vec<_>, _>>()?;
    let text_prompt = submission
        .text_prompt
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .map(String::from);

    Ok(ValidatedSubmission {
        sketch,
        text_prompt,
        mood_board,
    })
}

pub fn validate_refinement(
    submission: &RefineSubmission,
) -> Result<ValidatedRefinement, RenderFailure> {
    let fields = RefinementFields {
        render_data_uri: submission.render_data_uri.trim().to_string(),
        text_prompt: submission.text_prompt.clone(),
    };

    if let Err(errors) = fields.validate() {
        return Err(RenderFailure::Invalid(first_message(
            &errors,
            &["render_data_uri", "text_prompt"],
        )));
    }

    Ok(ValidatedRefinement {
        render: parse_checked(&fields.render_data_uri)?,
        text_prompt: fields.text_prompt,
    })
}
