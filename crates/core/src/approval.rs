//! Front-view approval decisions, feedback validation and the duplicate
//! submission window.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Default window during which a repeated initial generation for the same
/// product and user returns the existing row instead of inserting another.
pub const DUPLICATE_WINDOW_SECS: i64 = 5;

/// Maximum length of edit feedback appended to a prompt.
pub const MAX_FEEDBACK_LENGTH: usize = 2_000;

/// Rejection reason recorded when a newer pending row replaces an older one
/// in the same session.
pub const REASON_SUPERSEDED: &str = "superseded by a newer generation";

/// The user's decision on a pending front view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Approve,
    Edit,
}

impl DecisionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionAction::Approve => "approve",
            DecisionAction::Edit => "edit",
        }
    }
}

/// Validate edit feedback: required, non-blank, bounded.
///
/// Runs before any credit reservation so a bad edit request has no side
/// effects.
pub fn validate_edit_feedback(feedback: Option<&str>) -> Result<&str, CoreError> {
    let text = feedback.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(CoreError::Validation(
            "Edit feedback is required to regenerate the front view".to_string(),
        ));
    }
    if text.len() > MAX_FEEDBACK_LENGTH {
        return Err(CoreError::Validation(format!(
            "Edit feedback exceeds maximum length of {MAX_FEEDBACK_LENGTH} characters (got {})",
            text.len()
        )));
    }
    Ok(text)
}

/// Whether a row created at `created_at` is still inside the duplicate window
/// relative to `now`.
pub fn is_within_duplicate_window(created_at: Timestamp, now: Timestamp, window_secs: i64) -> bool {
    let age = now - created_at;
    age >= chrono::Duration::zero() && age < chrono::Duration::seconds(window_secs)
}

/// Earliest creation time still considered a duplicate at `now`.
pub fn duplicate_window_start(now: Timestamp, window_secs: i64) -> Timestamp {
    now - chrono::Duration::seconds(window_secs)
}
