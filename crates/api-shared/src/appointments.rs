//! Wire types for the appointment endpoints.
//!
//! Dates travel as "YYYY-MM-DD" strings and times as "HH:MM"; timestamps are
//! RFC 3339. Status enums are their kebab/snake-case string forms.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TimeSlotDto {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AddressDto {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ConsultationDto {
    /// "home-visit", "video-call" or "clinic".
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_call_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAppointmentReq {
    pub physiotherapist: String,
    /// "YYYY-MM-DD".
    pub appointment_date: String,
    pub time_slot: TimeSlotDto,
    pub reason: String,
    #[serde(default)]
    pub symptoms: Option<String>,
    pub total_amount: f64,
    pub consultation: ConsultationDto,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AmountDto {
    pub total: f64,
    pub platform_fee: f64,
    pub physiotherapist_amount: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentDto {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<f64>,
    pub refund_status: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RatingEntryDto {
    pub rating: u8,
    pub review: String,
    pub rated_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppointmentRatingsDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_rating: Option<RatingEntryDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physiotherapist_rating: Option<RatingEntryDto>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotesDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physiotherapist_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}

/// Full appointment view returned by every appointment endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppointmentView {
    pub id: String,
    pub patient: String,
    pub physiotherapist: String,
    pub appointment_date: String,
    pub time_slot: TimeSlotDto,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub amount: AmountDto,
    pub payment: PaymentDto,
    pub consultation: ConsultationDto,
    pub rating: AppointmentRatingsDto,
    pub notes: NotesDto,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppointmentRes {
    pub status: String,
    pub message: String,
    pub appointment: AppointmentView,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginationDto {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppointmentListRes {
    pub status: String,
    pub appointments: Vec<AppointmentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationDto>,
}

/// Listing filter: `?status=…&page=…&limit=…`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// "confirmed" or "rejected"; a reason is required when rejecting.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RespondReq {
    pub status: String,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// "in-progress", "completed" or "cancelled".
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StatusUpdateReq {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NotesReq {
    pub notes: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RatingReq {
    pub rating: u8,
    #[serde(default)]
    pub review: Option<String>,
}
