//! Validation of mint drafts and metadata documents.
//!
//! Two checks happen before anything leaves the process:
//!
//! - [`validate_draft`] - all four form fields are filled in. Evaluated on
//!   demand over a [`DraftMint`] value; nothing is cached between calls.
//! - [`validate_metadata`] - the assembled metadata document matches the
//!   embedded JSON Schema (Draft 7) at `schemas/nfm-metadata.json`.
//!
//! # Example
//!
//! ```rust,ignore
//! use nfm::{validate_draft, DraftMint};
//!
//! let draft = DraftMint { title: "Midnight".into(), ..Default::default() };
//! let err = validate_draft(&draft).unwrap_err();
//! assert!(err.to_string().contains("category"));
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::{ValidationError, ValidationResult};
use crate::models::{Category, DraftMint, MediaFile};

static METADATA_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/nfm-metadata.json"))
        .expect("Invalid embedded schema")
});

/// A draft that passed [`validate_draft`], with the category resolved.
#[derive(Debug, Clone)]
pub struct ValidDraft {
    pub title: String,
    pub category: Category,
    pub image: MediaFile,
    pub audio: MediaFile,
}

/// Check that every required field of the draft is present.
///
/// Reports all missing fields at once, in form order. A category that is
/// filled in but not a known genre is reported separately.
pub fn validate_draft(draft: &DraftMint) -> ValidationResult<ValidDraft> {
    let mut missing = Vec::new();

    let title = draft.title.trim();
    if title.is_empty() {
        missing.push("title");
    }
    if draft.category.trim().is_empty() {
        missing.push("category");
    }
    let image = draft.image.as_ref().filter(|f| !f.is_empty());
    if image.is_none() {
        missing.push("image");
    }
    let audio = draft.audio.as_ref().filter(|f| !f.is_empty());
    if audio.is_none() {
        missing.push("audio");
    }

    match (image, audio) {
        (Some(image), Some(audio)) if missing.is_empty() => Ok(ValidDraft {
            title: title.to_string(),
            category: draft.category.parse()?,
            image: image.clone(),
            audio: audio.clone(),
        }),
        _ => Err(ValidationError::MissingFields(missing)),
    }
}

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with every error message otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate an assembled metadata document.
pub fn validate_metadata(document: &Value) -> ValidationResult<()> {
    validate(&METADATA_SCHEMA, document)
        .map_err(|errors| ValidationError::InvalidMetadata { errors })
}

/// Quick check against the metadata schema.
pub fn is_valid_metadata(document: &Value) -> bool {
    jsonschema::draft7::is_valid(&METADATA_SCHEMA, document)
}
