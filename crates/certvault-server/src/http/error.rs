use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::admin::AdminError;
use crate::issuance::IssuanceError;
use crate::storage::DatabaseError;
use crate::verification::VerifyError;

const UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable, try again";

/// An error rendered as `{"error": "..."}` with a matching status code.
///
/// `Unavailable` and `Internal` carry server-side detail that is logged and
/// never sent to the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Unavailable(detail) | Self::Internal(detail) => {
                error!(status = status.as_u16(), error = %detail, "Request failed");
                UNAVAILABLE_MESSAGE.to_string()
            }
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m) => m,
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            DatabaseError::Constraint(_) => {
                Self::Conflict("Request conflicts with existing data".to_string())
            }
            DatabaseError::Connection(_) | DatabaseError::Io(_) => Self::Unavailable(e.to_string()),
            DatabaseError::Query(_) | DatabaseError::Migration(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<VerifyError> for ApiError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::EmptyIdentifier => Self::BadRequest(e.to_string()),
            VerifyError::LookupFailed(source) => Self::Unavailable(source.to_string()),
        }
    }
}

impl From<IssuanceError> for ApiError {
    fn from(e: IssuanceError) -> Self {
        match e {
            IssuanceError::Validation(message) => Self::BadRequest(message),
            // Lookups and inserts both went through the database.
            IssuanceError::Persistence(source) => match source {
                DatabaseError::NotFound(_) | DatabaseError::Constraint(_) => {
                    Self::Internal(source.to_string())
                }
                other => other.into(),
            },
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(e: AdminError) -> Self {
        match e {
            AdminError::InvalidCredentials => Self::Unauthorized(e.to_string()),
            AdminError::Validation(m) => Self::BadRequest(m),
            AdminError::NotFound(_) => Self::NotFound(e.to_string()),
            AdminError::Conflict(m) => Self::Conflict(m),
            AdminError::Internal(detail) => Self::Internal(detail),
            AdminError::Persistence(source) => source.into(),
        }
    }
}
