//! Bearer-token authentication extractor.
//!
//! Handlers take an [`AuthUser`] argument; extraction resolves the
//! `Authorization: Bearer <token>` header against the session store and
//! re-checks that the account still exists and is active, so a revoked or
//! deactivated account loses access immediately.

use crate::error::ApiError;
use crate::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::TypedHeader;
use headers::authorization::Bearer;
use headers::Authorization;
use physio_core::{BookingError, Caller};

/// The authenticated caller, resolved from the bearer session token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Caller);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| {
                BookingError::Unauthorized(
                    "You are not logged in! Please log in to get access.".into(),
                )
            })?;

        let session = state.sessions.resolve(bearer.token())?.ok_or_else(|| {
            BookingError::Unauthorized("Invalid or expired session. Please log in again.".into())
        })?;

        let user = state.users.find(&session.user_id).map_err(|_| {
            BookingError::Unauthorized(
                "The user belonging to this token does no longer exist.".into(),
            )
        })?;

        if !user.is_active {
            return Err(ApiError(BookingError::Unauthorized(
                "Your account has been deactivated. Please contact support.".into(),
            )));
        }

        Ok(AuthUser(Caller::new(user.id, user.role)))
    }
}
