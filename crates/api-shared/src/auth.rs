//! Wire types for the account endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterReq {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: String,
    /// "patient" or "physiotherapist".
    pub role: String,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub licence_number: Option<String>,
}

/// Public view of a user account.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub is_email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegisterRes {
    pub status: String,
    pub message: String,
    pub user: UserView,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginRes {
    pub status: String,
    pub message: String,
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MeRes {
    pub status: String,
    pub user: UserView,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResendVerificationReq {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ForgotPasswordReq {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResetPasswordReq {
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePasswordReq {
    pub current_password: String,
    pub new_password: String,
}

/// Admin review of a physiotherapist account: "verified" or "rejected".
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerificationReq {
    pub status: String,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}
