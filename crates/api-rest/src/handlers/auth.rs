//! Account endpoints: registration, login, verification, password flows.

use crate::error::ApiResult;
use crate::extract::AuthUser;
use crate::handlers::parse_registration_role;
use crate::views::user_view;
use crate::AppState;
use api_shared::auth::{
    ForgotPasswordReq, LoginReq, LoginRes, MeRes, RegisterReq, RegisterRes, ResendVerificationReq,
    ResetPasswordReq, UpdatePasswordReq,
};
use api_shared::{MessageRes, STATUS_SUCCESS};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum_extra::TypedHeader;
use headers::authorization::Bearer;
use headers::Authorization;
use physio_core::accounts::RegisterInput;

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = RegisterRes),
        (status = 400, description = "Bad request"),
        (status = 409, description = "Email already registered")
    )
)]
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterReq>,
) -> ApiResult<(StatusCode, Json<RegisterRes>)> {
    let role = parse_registration_role(&req.role)?;

    let user = state.accounts.register(RegisterInput {
        name: req.name,
        email: req.email,
        password: req.password,
        phone: req.phone,
        role,
        specialization: req.specialization,
        experience_years: req.experience_years,
        licence_number: req.licence_number,
    })?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterRes {
            status: STATUS_SUCCESS.into(),
            message: "User registered successfully! Please check your email to verify your \
                      account."
                .into(),
            user: user_view(&user),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Login successful", body = LoginRes),
        (status = 401, description = "Invalid credentials or account not ready")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> ApiResult<Json<LoginRes>> {
    let (user, token) = state.accounts.login(&req.email, &req.password)?;

    Ok(Json(LoginRes {
        status: STATUS_SUCCESS.into(),
        message: "Login successful".into(),
        token,
        user: user_view(&user),
    }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> ApiResult<Json<MessageRes>> {
    state.accounts.logout(bearer.token())?;
    Ok(Json(MessageRes::success("Logged out successfully")))
}

#[utoipa::path(
    get,
    path = "/auth/verify-email/{token}",
    responses(
        (status = 200, description = "Email verified", body = MessageRes),
        (status = 400, description = "Token invalid or expired")
    )
)]
#[axum::debug_handler]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<Json<MessageRes>> {
    state.accounts.verify_email(&token)?;
    Ok(Json(MessageRes::success(
        "Email verified successfully! You can now log in.",
    )))
}

#[utoipa::path(
    post,
    path = "/auth/resend-verification",
    request_body = ResendVerificationReq,
    responses(
        (status = 200, description = "Verification email sent", body = MessageRes),
        (status = 400, description = "Already verified"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(req): Json<ResendVerificationReq>,
) -> ApiResult<Json<MessageRes>> {
    state.accounts.resend_verification(&req.email)?;
    Ok(Json(MessageRes::success(
        "Verification email sent successfully!",
    )))
}

#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordReq,
    responses(
        (status = 200, description = "Reset email sent", body = MessageRes),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordReq>,
) -> ApiResult<Json<MessageRes>> {
    state.accounts.forgot_password(&req.email)?;
    Ok(Json(MessageRes::success("Token sent to email!")))
}

#[utoipa::path(
    patch,
    path = "/auth/reset-password/{token}",
    request_body = ResetPasswordReq,
    responses(
        (status = 200, description = "Password reset", body = MessageRes),
        (status = 400, description = "Token invalid or expired")
    )
)]
#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<ResetPasswordReq>,
) -> ApiResult<Json<MessageRes>> {
    state.accounts.reset_password(&token, &req.password)?;
    Ok(Json(MessageRes::success(
        "Password reset successful! You can now log in with your new password.",
    )))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Caller profile", body = MeRes),
        (status = 401, description = "Not logged in")
    )
)]
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<MeRes>> {
    let user = state.accounts.me(&caller)?;
    Ok(Json(MeRes {
        status: STATUS_SUCCESS.into(),
        user: user_view(&user),
    }))
}

#[utoipa::path(
    patch,
    path = "/auth/update-password",
    request_body = UpdatePasswordReq,
    responses(
        (status = 200, description = "Password updated", body = MessageRes),
        (status = 401, description = "Current password wrong")
    )
)]
#[axum::debug_handler]
pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(req): Json<UpdatePasswordReq>,
) -> ApiResult<Json<MessageRes>> {
    state
        .accounts
        .update_password(&caller, &req.current_password, &req.new_password)?;
    Ok(Json(MessageRes::success("Password updated successfully!")))
}
