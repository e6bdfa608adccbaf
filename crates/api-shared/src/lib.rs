//! # API Shared
//!
//! Shared request/response types for the booking platform's HTTP surface.
//!
//! Contains:
//! - Wire DTOs per endpoint group (`auth`, `appointments`, `chat`)
//! - The shared `HealthService`
//!
//! Every response carries a `status` flag and a human-readable `message`,
//! mirroring what API clients already consume. Identifiers and enums travel
//! as strings on the wire; parsing and validation happen at the API layer.

pub mod appointments;
pub mod auth;
pub mod chat;
pub mod health;

pub use health::{HealthRes, HealthService};

/// The `status` value used by every successful response.
pub const STATUS_SUCCESS: &str = "success";
/// The `status` value used by every error response.
pub const STATUS_ERROR: &str = "error";

/// Bare acknowledgement, for endpoints with no payload to return.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct MessageRes {
    pub status: String,
    pub message: String,
}

impl MessageRes {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS.into(),
            message: message.into(),
        }
    }
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorRes {
    pub status: String,
    pub message: String,
}

impl ErrorRes {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.into(),
            message: message.into(),
        }
    }
}
