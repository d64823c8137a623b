//! Generation request validation, reference resolution and generator
//! defaults.

use serde::Serialize;

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Generator defaults
// ---------------------------------------------------------------------------

/// Attempts the image generator may spend on a single view.
pub const DEFAULT_RETRY_BUDGET: u32 = 5;

/// Model tried first for every view.
pub const DEFAULT_PRIMARY_MODEL: &str = "gemini-2.5-flash-image";

/// Model the generator falls back to on capacity errors.
pub const DEFAULT_FALLBACK_MODEL: &str = "flux-kontext-pro";

/// Default rendering style passed to the generator.
pub const DEFAULT_STYLE: &str = "product-photography";

/// Maximum length of a user prompt in characters.
pub const MAX_PROMPT_LENGTH: usize = 4_000;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate the inputs of a front-view generation.
///
/// Runs before any credit movement.
pub fn validate_front_view_request(product_id: DbId, prompt: &str) -> Result<(), CoreError> {
    if product_id <= 0 {
        return Err(CoreError::Validation(
            "A product id is required to generate a front view".to_string(),
        ));
    }
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation(
            "A prompt is required to generate a front view".to_string(),
        ));
    }
    if prompt.len() > MAX_PROMPT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Prompt exceeds maximum length of {MAX_PROMPT_LENGTH} characters (got {})",
            prompt.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reference resolution
// ---------------------------------------------------------------------------

/// Where a resolved reference image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    /// Supplied by the caller (e.g. the previous front view on an edit).
    Explicit,
    /// Stored on the product or its brand.
    Product,
}

/// A reference image chosen for a generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedReference {
    pub url: String,
    pub source: ReferenceSource,
}

/// Pick the effective reference image: explicit > product-level > none.
///
/// Blank strings count as absent.
pub fn resolve_reference(
    explicit: Option<&str>,
    product_level: Option<&str>,
) -> Option<ResolvedReference> {
    if let Some(url) = non_blank(explicit) {
        return Some(ResolvedReference {
            url: url.to_string(),
            source: ReferenceSource::Explicit,
        });
    }
    non_blank(product_level).map(|url| ResolvedReference {
        url: url.to_string(),
        source: ReferenceSource::Product,
    })
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
