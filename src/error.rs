use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{forms::FieldErrors, repository::RepoError};

pub type AppResult<T, E = AppError> = std::result::Result<T, E>;

/// AppError
///
/// Every way a request can fail. Handlers return `AppResult<T>` and let the
/// `IntoResponse` implementation below decide between an error page and a redirect.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing resource, or one the viewer may not see. Both answer the same 404.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// The submitted form failed validation. Nothing was written.
    #[error("submitted form is invalid")]
    Validation(FieldErrors),
    /// A login-only route was requested without a session.
    #[error("authentication required")]
    Unauthenticated { redirect_to: String },
    /// Post mutation by someone other than its author. Soft-fails back to the post.
    #[error("only the author may change this post")]
    PermissionDenied { redirect_to: String },
    #[error("staff privileges required")]
    Forbidden,
    #[error(transparent)]
    Repository(RepoError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthenticated { .. } | AppError::PermissionDenied { .. } => {
                StatusCode::SEE_OTHER
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            // Unique constraints surface as a field error on the offending input.
            RepoError::Conflict { field } => {
                AppError::Validation(FieldErrors::single(field, "This value is already in use."))
            }
            other => AppError::Repository(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Serialize)]
struct ValidationResponse {
    status: u16,
    errors: FieldErrors,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            AppError::Unauthenticated { redirect_to } | AppError::PermissionDenied { redirect_to } => {
                tracing::debug!(%redirect_to, "Redirecting instead of serving the request");
                Redirect::to(&redirect_to).into_response()
            }
            AppError::Validation(errors) => {
                tracing::debug!(?errors, "Form rejected");
                let body = ValidationResponse {
                    status: status.as_u16(),
                    errors,
                };
                (status, Json(body)).into_response()
            }
            AppError::Repository(ref err) => {
                tracing::error!(error = %err, %status, "Replying with error");
                let body = ErrorResponse {
                    status: status.as_u16(),
                    detail: "Internal server error".to_string(),
                };
                (status, Json(body)).into_response()
            }
            other => {
                tracing::debug!(error = %other, %status, "Replying with error");
                let body = ErrorResponse {
                    status: status.as_u16(),
                    detail: other.to_string(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
