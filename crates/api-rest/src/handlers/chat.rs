//! Chat endpoints, keyed by appointment id.

use crate::error::ApiResult;
use crate::extract::AuthUser;
use crate::handlers::{parse_id, parse_message_type};
use crate::views::{message_dto, thread_view};
use crate::AppState;
use api_shared::chat::{ChatThreadRes, SendMessageReq, SendMessageRes};
use api_shared::STATUS_SUCCESS;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;

#[utoipa::path(
    get,
    path = "/chats/{appointment_id}",
    responses(
        (status = 200, description = "Chat thread for the appointment", body = ChatThreadRes),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "No thread for this appointment")
    )
)]
#[axum::debug_handler]
pub async fn get_thread(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(appointment_id): Path<String>,
) -> ApiResult<Json<ChatThreadRes>> {
    let thread = state.chat.thread_for(&caller, &parse_id(&appointment_id)?)?;

    Ok(Json(ChatThreadRes {
        status: STATUS_SUCCESS.into(),
        thread: thread_view(&thread),
    }))
}

#[utoipa::path(
    post,
    path = "/chats/{appointment_id}/messages",
    request_body = SendMessageReq,
    responses(
        (status = 201, description = "Message appended", body = SendMessageRes),
        (status = 400, description = "Empty or overlong message"),
        (status = 403, description = "Caller is not a participant")
    )
)]
#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(appointment_id): Path<String>,
    Json(req): Json<SendMessageReq>,
) -> ApiResult<(StatusCode, Json<SendMessageRes>)> {
    let message_type = parse_message_type(req.message_type.as_deref())?;
    let message = state.chat.append_message(
        &caller,
        &parse_id(&appointment_id)?,
        &req.content,
        message_type,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageRes {
            status: STATUS_SUCCESS.into(),
            message: message_dto(&message),
        }),
    ))
}
