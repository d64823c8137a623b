use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use atelier_core::error::CoreError;
use atelier_pipeline::WorkflowError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`WorkflowError`] and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `atelier_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failed workflow phase. Any refund has already been issued.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::InvalidTransition(msg) => {
                    (StatusCode::CONFLICT, "INVALID_STATE", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Workflow errors ---
            AppError::Workflow(err) => classify_workflow_error(err),

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "success": false,
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map a workflow failure to an HTTP status. The message is the error's
/// display text, which never carries upstream causes.
fn classify_workflow_error(err: &WorkflowError) -> (StatusCode, &'static str, String) {
    let status = match err {
        WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
        WorkflowError::InsufficientCredits(_) => StatusCode::PAYMENT_REQUIRED,
        WorkflowError::Generation { .. } | WorkflowError::Upload { .. } => StatusCode::BAD_GATEWAY,
        WorkflowError::IncompleteBatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
        WorkflowError::InvalidState(_) => StatusCode::CONFLICT,
        WorkflowError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        WorkflowError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal workflow error");
            return internal();
        }
    };

    match err {
        WorkflowError::Generation { view, cause } | WorkflowError::Upload { view, cause } => {
            tracing::warn!(view = %view, cause = %cause, code = err.code(), "Workflow phase failed");
        }
        WorkflowError::Persistence { operation, source } => {
            tracing::error!(operation, error = %source, "Workflow persistence failed");
        }
        _ => {}
    }

    (status, err.code(), err.to_string())
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}
