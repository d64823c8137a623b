//! Errors surfaced by the workflow phases.
//!
//! Display strings are the user-visible messages: validation and credit
//! failures carry the originating text verbatim, while generation and upload
//! failures render a generic per-view message and keep the cause for logs.

use atelier_core::error::CoreError;
use atelier_core::types::DbId;
use atelier_core::views::ViewType;

use crate::ports::{LedgerError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InsufficientCredits(String),

    #[error("Failed to generate {view} view")]
    Generation { view: ViewType, cause: String },

    #[error("Failed to upload {view} view")]
    Upload { view: ViewType, cause: String },

    #[error("Failed to save {operation}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Cannot create revision: missing {} view(s)", join_views(.missing))]
    IncompleteBatch { missing: Vec<ViewType> },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("{0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn join_views(views: &[ViewType]) -> String {
    views
        .iter()
        .map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl WorkflowError {
    pub fn persistence(operation: &'static str, source: StoreError) -> Self {
        WorkflowError::Persistence { operation, source }
    }

    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_) => "VALIDATION_ERROR",
            WorkflowError::InsufficientCredits(_) => "INSUFFICIENT_CREDITS",
            WorkflowError::Generation { .. } => "GENERATION_FAILED",
            WorkflowError::Upload { .. } => "UPLOAD_FAILED",
            WorkflowError::Persistence { .. } => "PERSISTENCE_ERROR",
            WorkflowError::IncompleteBatch { .. } => "INCOMPLETE_BATCH",
            WorkflowError::NotFound { .. } => "NOT_FOUND",
            WorkflowError::InvalidState(_) => "INVALID_STATE",
            WorkflowError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<CoreError> for WorkflowError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(msg) | CoreError::Unauthorized(msg) => {
                WorkflowError::Validation(msg)
            }
            CoreError::NotFound { entity, id } => WorkflowError::NotFound { entity, id },
            CoreError::InvalidTransition(msg) | CoreError::Conflict(msg) => {
                WorkflowError::InvalidState(msg)
            }
            CoreError::Internal(msg) => WorkflowError::Internal(msg),
        }
    }
}

impl From<LedgerError> for WorkflowError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Insufficient { .. } | LedgerError::Rejected(_) => {
                WorkflowError::InsufficientCredits(err.to_string())
            }
            LedgerError::Store(source) => WorkflowError::persistence("credit reservation", source),
        }
    }
}
