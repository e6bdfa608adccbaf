//! Bearer-token sessions.
//!
//! Login issues an opaque token; the client presents it as
//! `Authorization: Bearer <token>` and the API layer resolves it back to a
//! caller id and role. Only the token's SHA-256 digest is stored:
//!
//! ```text
//! <data_dir>/sessions/<sha256(token)>.json
//! ```

use crate::config::CoreConfig;
use crate::constants::SESSIONS_DIR_NAME;
use crate::tokens;
use crate::users::Role;
use crate::{BookingError, BookingResult};
use chrono::{DateTime, Utc};
use physio_types::BookingUuid;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// A resolved session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: BookingUuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// File-backed session store.
#[derive(Debug)]
pub struct SessionStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            dir: cfg.data_dir().join(SESSIONS_DIR_NAME),
            lock: Mutex::new(()),
        }
    }

    fn session_path(&self, token: &str) -> PathBuf {
        self.dir.join(format!("{}.json", tokens::sha256_hex(token)))
    }

    /// Issues a new session and returns the plaintext token.
    pub fn issue(&self, user_id: &BookingUuid, role: Role) -> BookingResult<String> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());

        let token = tokens::generate();
        let session = Session {
            user_id: user_id.clone(),
            role,
            created_at: Utc::now(),
        };

        fs::create_dir_all(&self.dir).map_err(BookingError::StorageDirCreation)?;
        let json = serde_json::to_string(&session).map_err(BookingError::Serialization)?;
        fs::write(self.session_path(&token), json).map_err(BookingError::FileWrite)?;

        Ok(token)
    }

    /// Resolves a presented token, returning `None` for unknown tokens.
    pub fn resolve(&self, token: &str) -> BookingResult<Option<Session>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());

        let contents = match fs::read_to_string(self.session_path(token)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BookingError::FileRead(e)),
        };

        let session = serde_json::from_str(&contents).map_err(BookingError::Deserialization)?;
        Ok(Some(session))
    }

    /// Revokes a token. Revoking an unknown token is a no-op.
    pub fn revoke(&self, token: &str) -> BookingResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());

        match fs::remove_file(self.session_path(token)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BookingError::FileWrite(e)),
        }
    }
}
