//! Request handlers, grouped by endpoint family.

pub mod admin;
pub mod appointments;
pub mod auth;
pub mod chat;

use crate::error::ApiResult;
use crate::AppState;
use api_shared::appointments::ConsultationDto;
use api_shared::HealthRes;
use axum::extract::State;
use axum::response::Json;
use chrono::NaiveDate;
use physio_core::appointments::{Address, AppointmentStatus, Consultation, ConsultationMode};
use physio_core::chat::MessageType;
use physio_core::users::Role;
use physio_core::{BookingError, BookingUuid};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint, used for monitoring and load balancer checks.
#[axum::debug_handler]
pub async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(api_shared::HealthService::check_health())
}

// ----------------------------------------------------------------------
// Wire-format parsing
// ----------------------------------------------------------------------

pub(crate) fn parse_id(value: &str) -> ApiResult<BookingUuid> {
    Ok(BookingUuid::parse(value).map_err(BookingError::from)?)
}

pub(crate) fn parse_date(value: &str) -> ApiResult<NaiveDate> {
    value.parse::<NaiveDate>().map_err(|_| {
        BookingError::InvalidInput(format!("invalid date {value:?}, expected YYYY-MM-DD")).into()
    })
}

/// Roles accepted at registration; admin accounts are provisioned elsewhere.
pub(crate) fn parse_registration_role(value: &str) -> ApiResult<Role> {
    match value {
        "patient" => Ok(Role::Patient),
        "physiotherapist" => Ok(Role::Physiotherapist),
        other => Err(BookingError::InvalidInput(format!(
            "invalid role {other:?}, expected \"patient\" or \"physiotherapist\""
        ))
        .into()),
    }
}

pub(crate) fn parse_appointment_status(value: &str) -> ApiResult<AppointmentStatus> {
    match value {
        "pending" => Ok(AppointmentStatus::Pending),
        "confirmed" => Ok(AppointmentStatus::Confirmed),
        "rejected" => Ok(AppointmentStatus::Rejected),
        "completed" => Ok(AppointmentStatus::Completed),
        "cancelled" => Ok(AppointmentStatus::Cancelled),
        "in-progress" => Ok(AppointmentStatus::InProgress),
        other => {
            Err(BookingError::InvalidInput(format!("invalid status {other:?}")).into())
        }
    }
}

pub(crate) fn parse_consultation(dto: &ConsultationDto) -> ApiResult<Consultation> {
    let mode = match dto.mode.as_str() {
        "home-visit" => ConsultationMode::HomeVisit,
        "video-call" => ConsultationMode::VideoCall,
        "clinic" => ConsultationMode::Clinic,
        other => {
            return Err(BookingError::InvalidInput(format!(
                "invalid consultation mode {other:?}"
            ))
            .into())
        }
    };

    Ok(Consultation {
        mode,
        address: dto.address.as_ref().map(|a| Address {
            street: a.street.clone(),
            city: a.city.clone(),
            state: a.state.clone(),
            zip_code: a.zip_code.clone(),
            landmark: a.landmark.clone(),
        }),
        video_call_link: dto.video_call_link.clone(),
        video_call_scheduled: None,
    })
}

pub(crate) fn parse_message_type(value: Option<&str>) -> ApiResult<MessageType> {
    match value.unwrap_or("text") {
        "text" => Ok(MessageType::Text),
        "image" => Ok(MessageType::Image),
        "file" => Ok(MessageType::File),
        "video-call-link" => Ok(MessageType::VideoCallLink),
        other => {
            Err(BookingError::InvalidInput(format!("invalid message type {other:?}")).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_appointment_status_accepts_wire_forms() {
        assert_eq!(
            parse_appointment_status("in-progress").expect("should parse"),
            AppointmentStatus::InProgress
        );
        assert!(parse_appointment_status("in_progress").is_err());
        assert!(parse_appointment_status("unknown").is_err());
    }

    #[test]
    fn test_parse_registration_role_excludes_admin() {
        assert_eq!(
            parse_registration_role("patient").expect("should parse"),
            Role::Patient
        );
        assert!(parse_registration_role("admin").is_err());
    }

    #[test]
    fn test_parse_date_requires_iso_format() {
        assert!(parse_date("2025-03-10").is_ok());
        assert!(parse_date("10/03/2025").is_err());
    }
}
