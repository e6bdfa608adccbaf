//! Wire types for the chat endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatMessageDto {
    pub sender: String,
    pub content: String,
    pub message_type: String,
    pub sent_at: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LastMessageDto {
    pub content: String,
    pub sender: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatThreadView {
    pub id: String,
    pub appointment: String,
    pub participants: Vec<String>,
    pub messages: Vec<ChatMessageDto>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessageDto>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatThreadRes {
    pub status: String,
    pub thread: ChatThreadView,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SendMessageReq {
    pub content: String,
    /// "text", "image", "file" or "video-call-link"; defaults to "text".
    #[serde(default)]
    pub message_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SendMessageRes {
    pub status: String,
    pub message: ChatMessageDto,
}
