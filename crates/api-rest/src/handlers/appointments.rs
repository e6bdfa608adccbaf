//! Appointment endpoints, delegating every decision to the lifecycle
//! manager.

use crate::error::ApiResult;
use crate::extract::AuthUser;
use crate::handlers::{parse_appointment_status, parse_consultation, parse_date, parse_id};
use crate::views::{appointment_view, pagination_dto};
use crate::AppState;
use api_shared::appointments::{
    AppointmentListRes, AppointmentRes, CreateAppointmentReq, ListQuery, NotesReq, RatingReq,
    RespondReq, StatusUpdateReq,
};
use api_shared::STATUS_SUCCESS;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use physio_core::appointments::TimeSlot;
use physio_core::lifecycle::{CreateRequest, ListFilter, RespondDecision};
use physio_core::BookingError;

#[utoipa::path(
    post,
    path = "/appointments",
    request_body = CreateAppointmentReq,
    responses(
        (status = 201, description = "Appointment request submitted", body = AppointmentRes),
        (status = 400, description = "Bad request or unverified physiotherapist"),
        (status = 404, description = "Physiotherapist not found"),
        (status = 409, description = "Time slot not available")
    )
)]
#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(req): Json<CreateAppointmentReq>,
) -> ApiResult<(StatusCode, Json<AppointmentRes>)> {
    let request = CreateRequest {
        physiotherapist: parse_id(&req.physiotherapist)?,
        appointment_date: parse_date(&req.appointment_date)?,
        time_slot: TimeSlot::new(&req.time_slot.start_time, &req.time_slot.end_time)?,
        reason: req.reason,
        symptoms: req.symptoms,
        total_amount: req.total_amount,
        consultation: parse_consultation(&req.consultation)?,
    };

    let appointment = state.lifecycle.create(&caller, request)?;

    Ok((
        StatusCode::CREATED,
        Json(AppointmentRes {
            status: STATUS_SUCCESS.into(),
            message: "Appointment request submitted successfully".into(),
            appointment: appointment_view(&appointment),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/appointments",
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("page" = Option<usize>, Query, description = "Page number, 1-based"),
        ("limit" = Option<usize>, Query, description = "Page size, default 10")
    ),
    responses(
        (status = 200, description = "Role-scoped appointment listing", body = AppointmentListRes)
    )
)]
#[axum::debug_handler]
pub async fn list(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<AppointmentListRes>> {
    let status = query
        .status
        .as_deref()
        .map(parse_appointment_status)
        .transpose()?;

    let (appointments, pagination) = state.lifecycle.list(
        &caller,
        &ListFilter {
            status,
            page: query.page,
            limit: query.limit,
        },
    )?;

    Ok(Json(AppointmentListRes {
        status: STATUS_SUCCESS.into(),
        appointments: appointments.iter().map(appointment_view).collect(),
        pagination: Some(pagination_dto(pagination)),
    }))
}

#[utoipa::path(
    get,
    path = "/appointments/my-appointments",
    params(
        ("status" = Option<String>, Query, description = "Filter by status")
    ),
    responses(
        (status = 200, description = "Appointments the caller participates in", body = AppointmentListRes)
    )
)]
#[axum::debug_handler]
pub async fn my_appointments(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<AppointmentListRes>> {
    let status = query
        .status
        .as_deref()
        .map(parse_appointment_status)
        .transpose()?;

    let appointments = state.lifecycle.my_appointments(&caller, status);

    Ok(Json(AppointmentListRes {
        status: STATUS_SUCCESS.into(),
        appointments: appointments.iter().map(appointment_view).collect(),
        pagination: None,
    }))
}

#[utoipa::path(
    get,
    path = "/appointments/physio/requests",
    responses(
        (status = 200, description = "Pending requests for the physiotherapist", body = AppointmentListRes),
        (status = 403, description = "Caller is not a physiotherapist")
    )
)]
#[axum::debug_handler]
pub async fn physio_requests(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> ApiResult<Json<AppointmentListRes>> {
    let appointments = state.lifecycle.pending_requests(&caller)?;

    Ok(Json(AppointmentListRes {
        status: STATUS_SUCCESS.into(),
        appointments: appointments.iter().map(appointment_view).collect(),
        pagination: None,
    }))
}

#[utoipa::path(
    get,
    path = "/appointments/{id}",
    responses(
        (status = 200, description = "Appointment detail", body = AppointmentRes),
        (status = 403, description = "Caller is not a party"),
        (status = 404, description = "Appointment not found")
    )
)]
#[axum::debug_handler]
pub async fn get_one(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<AppointmentRes>> {
    let appointment = state.lifecycle.get(&caller, &parse_id(&id)?)?;

    Ok(Json(AppointmentRes {
        status: STATUS_SUCCESS.into(),
        message: "Appointment retrieved successfully".into(),
        appointment: appointment_view(&appointment),
    }))
}

#[utoipa::path(
    patch,
    path = "/appointments/{id}/respond",
    request_body = RespondReq,
    responses(
        (status = 200, description = "Response recorded", body = AppointmentRes),
        (status = 400, description = "Already responded or missing reason"),
        (status = 403, description = "Not the assigned physiotherapist")
    )
)]
#[axum::debug_handler]
pub async fn respond(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<RespondReq>,
) -> ApiResult<Json<AppointmentRes>> {
    let decision = match req.status.as_str() {
        "confirmed" => RespondDecision::Confirmed,
        "rejected" => RespondDecision::Rejected,
        _ => {
            return Err(BookingError::InvalidInput(
                "Invalid status. Use \"confirmed\" or \"rejected\"".into(),
            )
            .into())
        }
    };

    let appointment =
        state
            .lifecycle
            .respond(&caller, &parse_id(&id)?, decision, req.rejection_reason)?;

    Ok(Json(AppointmentRes {
        status: STATUS_SUCCESS.into(),
        message: format!("Appointment {} successfully", appointment.status),
        appointment: appointment_view(&appointment),
    }))
}

#[utoipa::path(
    patch,
    path = "/appointments/{id}/status",
    request_body = StatusUpdateReq,
    responses(
        (status = 200, description = "Status updated", body = AppointmentRes),
        (status = 400, description = "Illegal transition"),
        (status = 403, description = "Caller is not a party or admin")
    )
)]
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateReq>,
) -> ApiResult<Json<AppointmentRes>> {
    let new_status = parse_appointment_status(&req.status)?;
    let appointment = state
        .lifecycle
        .update_progress(&caller, &parse_id(&id)?, new_status)?;

    Ok(Json(AppointmentRes {
        status: STATUS_SUCCESS.into(),
        message: "Appointment status updated successfully".into(),
        appointment: appointment_view(&appointment),
    }))
}

#[utoipa::path(
    patch,
    path = "/appointments/{id}/notes",
    request_body = NotesReq,
    responses(
        (status = 200, description = "Notes updated", body = AppointmentRes),
        (status = 403, description = "Caller is not a party")
    )
)]
#[axum::debug_handler]
pub async fn update_notes(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<NotesReq>,
) -> ApiResult<Json<AppointmentRes>> {
    let appointment = state
        .lifecycle
        .update_notes(&caller, &parse_id(&id)?, req.notes)?;

    Ok(Json(AppointmentRes {
        status: STATUS_SUCCESS.into(),
        message: "Appointment notes updated successfully".into(),
        appointment: appointment_view(&appointment),
    }))
}

#[utoipa::path(
    patch,
    path = "/appointments/{id}/rating",
    request_body = RatingReq,
    responses(
        (status = 200, description = "Rating recorded", body = AppointmentRes),
        (status = 400, description = "Not completed, already rated, or rating out of range"),
        (status = 403, description = "Caller is not a party")
    )
)]
#[axum::debug_handler]
pub async fn rate(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<RatingReq>,
) -> ApiResult<Json<AppointmentRes>> {
    let appointment = state
        .lifecycle
        .rate(&caller, &parse_id(&id)?, req.rating, req.review)?;

    Ok(Json(AppointmentRes {
        status: STATUS_SUCCESS.into(),
        message: "Rating submitted successfully".into(),
        appointment: appointment_view(&appointment),
    }))
}

#[utoipa::path(
    delete,
    path = "/appointments/{id}",
    responses(
        (status = 200, description = "Appointment cancelled", body = AppointmentRes),
        (status = 400, description = "Appointment cannot be cancelled"),
        (status = 403, description = "Caller is not a party or admin")
    )
)]
#[axum::debug_handler]
pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<AppointmentRes>> {
    let appointment = state.lifecycle.cancel(&caller, &parse_id(&id)?)?;

    Ok(Json(AppointmentRes {
        status: STATUS_SUCCESS.into(),
        message: "Appointment cancelled successfully".into(),
        appointment: appointment_view(&appointment),
    }))
}
