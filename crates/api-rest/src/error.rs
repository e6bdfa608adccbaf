//! Error-to-response mapping for the REST surface.
//!
//! Domain errors carry their own user-facing messages; infrastructure errors
//! are logged with their detail and surfaced as a generic 500.

use api_shared::ErrorRes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use physio_core::BookingError;

/// Wrapper turning a [`BookingError`] into an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub BookingError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            BookingError::InvalidInput(_)
            | BookingError::InvalidText(_)
            | BookingError::InvalidId(_)
            | BookingError::InvalidState(_)
            | BookingError::Unverified
            | BookingError::TokenInvalid => (StatusCode::BAD_REQUEST, self.0.to_string()),

            BookingError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.0.to_string()),
            BookingError::Forbidden(_) => (StatusCode::FORBIDDEN, self.0.to_string()),
            BookingError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),

            BookingError::EmailTaken | BookingError::SlotConflict => {
                (StatusCode::CONFLICT, self.0.to_string())
            }

            BookingError::Payment(_)
            | BookingError::Email(_)
            | BookingError::StorageDirCreation(_)
            | BookingError::FileWrite(_)
            | BookingError::FileRead(_)
            | BookingError::Serialization(_)
            | BookingError::Deserialization(_) => {
                tracing::error!(error = %self.0, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
            }
        };

        (status, Json(ErrorRes::new(message))).into_response()
    }
}
