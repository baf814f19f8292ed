use crate::{
    models::{DataUri, RefineSubmission, RenderFailure, RenderSubmission},
    validation::MAX_MOOD_BOARD_IMAGES,
};
use actix_multipart::{Field, Multipart};
use futures::TryStreamExt;

/// Everything a dashboard form can carry. Files are converted to data URIs.
#[derive(Debug, Default)]
pub struct FormFields {
    pub sketch: Option<String>,
    pub text_prompt: Option<String>,
    pub mood_board: Vec<String>,
    pub render: Option<String>,
}

impl FormFields {
    pub fn into_submission(self) -> RenderSubmission {
        RenderSubmission {
            sketch_data_uri: self.sketch.unwrap_or_default(),
            text_prompt: self.text_prompt,
            mood_board_data_uris: self.mood_board,
        }
    }

    pub fn into_refinement(self) -> RefineSubmission {
        RefineSubmission {
            render_data_uri: self.render.unwrap_or_default(),
            text_prompt: self.text_prompt.unwrap_or_default(),
        }
    }
}

/// Length of `bytes` once base64 encoded into a data URI, with headroom for
/// the `data:` prefix. Saturates instead of overflowing.
pub fn encoded_limit(bytes: usize) -> usize {
    (bytes / 3).saturating_mul(4).saturating_add(1024)
}

fn too_many_mood_board_images() -> RenderFailure {
    RenderFailure::Invalid(format!(
        "You can upload at most {} mood board images.",
        MAX_MOOD_BOARD_IMAGES
    ))
}

fn malformed(e: actix_multipart::MultipartError) -> RenderFailure {
    RenderFailure::Invalid(format!("Malformed form submission: {}", e))
}

fn limit_label(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MB", bytes / (1024 * 1024))
    } else {
        format!("{} bytes", bytes)
    }
}

async fn read_field(field: &mut Field, limit: usize, label: &str) -> Result<Vec<u8>, RenderFailure> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(malformed)? {
        if buf.len().saturating_add(chunk.len()) > limit {
            return Err(RenderFailure::Invalid(format!(
                "{} exceeds the {} upload limit.",
                label,
                limit_label(limit)
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Consumes a field without keeping its bytes.
async fn discard_field(field: &mut Field) -> Result<(), RenderFailure> {
    while field.try_next().await.map_err(malformed)?.is_some() {}
    Ok(())
}

fn field_text(bytes: Vec<u8>) -> Result<String, RenderFailure> {
    String::from_utf8(bytes)
        .map_err(|_| RenderFailure::Invalid("Form fields must be UTF-8 text.".into()))
}

fn file_to_data_uri(field: &Field, bytes: &[u8]) -> String {
    let mime = field
        .content_type()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    DataUri::from_bytes(mime, bytes).to_string()
}

/// Reads a dashboard multipart form. Uploaded files are limited to
/// `max_upload_bytes`; text fields may hold a base64 data URI of that size.
/// Reading stops at the first mood board image past the limit.
pub async fn read_form(mut payload: Multipart, max_upload_bytes: usize) -> Result<FormFields, RenderFailure> {
    let text_limit = encoded_limit(max_upload_bytes);
    let mut form = FormFields::default();

    while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "sketch" => {
                let bytes = read_field(&mut field, max_upload_bytes, "Sketch").await?;
                // Browsers send an empty part when no file was picked.
                if !bytes.is_empty() {
                    form.sketch = Some(file_to_data_uri(&field, &bytes));
                }
            }
            "moodBoard" => {
                let bytes = read_field(&mut field, max_upload_bytes, "Mood board image").await?;
                if !bytes.is_empty() {
                    if form.mood_board.len() >= MAX_MOOD_BOARD_IMAGES {
                        return Err(too_many_mood_board_images());
                    }
                    form.mood_board.push(file_to_data_uri(&field, &bytes));
                }
            }
            "sketchDataUri" => {
                let text = field_text(read_field(&mut field, text_limit, "Sketch").await?)?;
                if form.sketch.is_none() && !text.trim().is_empty() {
                    form.sketch = Some(text);
                }
            }
            "moodBoardDataUri[]" | "moodBoardDataUri" => {
                let text = field_text(read_field(&mut field, text_limit, "Mood board image").await?)?;
                if !text.trim().is_empty() {
                    if form.mood_board.len() >= MAX_MOOD_BOARD_IMAGES {
                        return Err(too_many_mood_board_images());
                    }
                    form.mood_board.push(text);
                }
            }
            "renderDataUri" => {
                form.render = Some(field_text(read_field(&mut field, text_limit, "Render").await?)?);
            }
            "textPrompt" => {
                form.text_prompt = Some(field_text(read_field(&mut field, 64 * 1024, "Text prompt").await?)?);
            }
            other => {
                log::debug!("Ignoring unknown form field '{}'", other);
                discard_field(&mut field).await?;
            }
        }
    }

    Ok(form)
}
