//! Admin endpoints.

use crate::error::ApiResult;
use crate::extract::AuthUser;
use crate::handlers::parse_id;
use crate::AppState;
use api_shared::auth::VerificationReq;
use api_shared::MessageRes;
use axum::extract::{Path, State};
use axum::response::Json;
use physio_core::users::VerificationStatus;
use physio_core::BookingError;

#[utoipa::path(
    patch,
    path = "/admin/users/{id}/verification",
    request_body = VerificationReq,
    responses(
        (status = 200, description = "Verification status updated", body = MessageRes),
        (status = 400, description = "Bad status or missing rejection reason"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "User is not a physiotherapist")
    )
)]
/// Approve or reject a physiotherapist account after document review.
#[axum::debug_handler]
pub async fn set_verification(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<VerificationReq>,
) -> ApiResult<Json<MessageRes>> {
    if !caller.is_admin() {
        return Err(BookingError::Forbidden(
            "You do not have permission to perform this action".into(),
        )
        .into());
    }

    let status = match req.status.as_str() {
        "verified" => VerificationStatus::Verified,
        "rejected" => VerificationStatus::Rejected,
        other => {
            return Err(BookingError::InvalidInput(format!(
                "invalid verification status {other:?}"
            ))
            .into())
        }
    };

    if status == VerificationStatus::Rejected && req.rejection_reason.is_none() {
        return Err(
            BookingError::InvalidInput("Rejection reason is required".into()).into(),
        );
    }

    state
        .users
        .set_verification(&parse_id(&id)?, status, req.rejection_reason)?;

    Ok(Json(MessageRes::success(
        "Verification status updated successfully",
    )))
}
