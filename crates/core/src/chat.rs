//! Per-appointment chat threads.
//!
//! A thread is created when an appointment is confirmed, scoped to exactly
//! the two participants. Messages are an embedded append-only array with a
//! `last_message` summary; there is no pagination or delivery acknowledgment.
//! Threads are keyed by their appointment id: one thread per appointment.

use crate::config::CoreConfig;
use crate::constants::{CHATS_DIR_NAME, CHAT_FILE_NAME, MAX_CHAT_MESSAGE_LEN};
use crate::policy::Caller;
use crate::store::Collection;
use crate::{BookingError, BookingResult};
use chrono::{DateTime, Utc};
use physio_types::{BookingUuid, NonEmptyText};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    Text,
    Image,
    File,
    VideoCallLink,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: BookingUuid,
    pub content: String,
    pub message_type: MessageType,
    pub sent_at: DateTime<Utc>,
}

/// Denormalised summary of the newest message, for thread listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub sender: BookingUuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatThread {
    /// Same as the appointment id; one thread per appointment.
    pub id: BookingUuid,
    pub appointment: BookingUuid,
    pub participants: Vec<BookingUuid>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatThread {
    pub fn is_participant(&self, user_id: &BookingUuid) -> bool {
        self.participants.contains(user_id)
    }
}

/// Chat thread operations.
#[derive(Debug)]
pub struct ChatService {
    threads: Collection<ChatThread>,
}

impl ChatService {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            threads: Collection::new(
                cfg.data_dir().join(CHATS_DIR_NAME),
                CHAT_FILE_NAME,
                "Chat thread",
            ),
        }
    }

    /// Creates the thread for a confirmed appointment.
    ///
    /// Idempotent: if the thread already exists it is returned unchanged.
    pub fn create_thread(
        &self,
        appointment_id: &BookingUuid,
        participants: [BookingUuid; 2],
    ) -> BookingResult<ChatThread> {
        if let Some(existing) = self.threads.try_get(appointment_id)? {
            return Ok(existing);
        }

        let now = Utc::now();
        let thread = ChatThread {
            id: appointment_id.clone(),
            appointment: appointment_id.clone(),
            participants: participants.to_vec(),
            messages: vec![],
            is_active: true,
            last_message: None,
            created_at: now,
            updated_at: now,
        };

        self.threads.insert(appointment_id, &thread)?;
        Ok(thread)
    }

    /// Fetches the thread for an appointment, for a participant or admin.
    pub fn thread_for(
        &self,
        caller: &Caller,
        appointment_id: &BookingUuid,
    ) -> BookingResult<ChatThread> {
        let thread = self.threads.get(appointment_id)?;

        if !caller.is_admin() && !thread.is_participant(&caller.id) {
            return Err(BookingError::Forbidden(
                "You do not have access to this chat".into(),
            ));
        }

        Ok(thread)
    }

    /// Appends a message to a thread. Participants only.
    pub fn append_message(
        &self,
        caller: &Caller,
        appointment_id: &BookingUuid,
        content: &str,
        message_type: MessageType,
    ) -> BookingResult<ChatMessage> {
        let content = NonEmptyText::bounded(content, MAX_CHAT_MESSAGE_LEN)?;

        self.threads.update_where(appointment_id, |thread| {
            if !thread.is_participant(&caller.id) {
                return Err(BookingError::Forbidden(
                    "Only participants can send messages".into(),
                ));
            }
            if !thread.is_active {
                return Err(BookingError::InvalidState("This chat is closed".into()));
            }

            let message = ChatMessage {
                sender: caller.id.clone(),
                content: content.as_str().to_owned(),
                message_type,
                sent_at: Utc::now(),
            };

            thread.last_message = Some(LastMessage {
                content: message.content.clone(),
                sender: message.sender.clone(),
                timestamp: message.sent_at,
            });
            thread.updated_at = message.sent_at;
            thread.messages.push(message.clone());

            Ok(message)
        })
    }
}
