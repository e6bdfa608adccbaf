//! Storage layout names and platform-wide limits.

/// Collection directory for user documents.
pub const USERS_DIR_NAME: &str = "users";
/// Collection directory for appointment documents.
pub const APPOINTMENTS_DIR_NAME: &str = "appointments";
/// Collection directory for chat threads.
pub const CHATS_DIR_NAME: &str = "chats";
/// Directory for session files (flat, keyed by token digest).
pub const SESSIONS_DIR_NAME: &str = "sessions";
/// Email uniqueness index, under the users collection.
pub const EMAIL_INDEX_DIR_NAME: &str = "email-index";
/// Slot ledger, under the appointments collection.
pub const SLOTS_DIR_NAME: &str = "slots";

/// Document file names inside each sharded directory.
pub const USER_FILE_NAME: &str = "user.json";
pub const APPOINTMENT_FILE_NAME: &str = "appointment.json";
pub const CHAT_FILE_NAME: &str = "thread.json";

/// Default data directory when none is configured.
pub const DEFAULT_DATA_DIR: &str = "/booking_data";

/// Platform cut of each appointment, unless configured otherwise.
pub const DEFAULT_COMMISSION_RATE: f64 = 0.20;

/// Input limits, matching the stored document constraints.
pub const MAX_REASON_LEN: usize = 500;
pub const MAX_SYMPTOMS_LEN: usize = 1000;
pub const MAX_REJECTION_REASON_LEN: usize = 200;
pub const MAX_CHAT_MESSAGE_LEN: usize = 1000;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Token lifetimes.
pub const EMAIL_VERIFICATION_TTL_HOURS: i64 = 24;
pub const PASSWORD_RESET_TTL_HOURS: i64 = 1;
