//! Canonical UUIDs and sharded-path derivation.
//!
//! The platform stores every document under a directory derived from its
//! UUID. To keep path derivation deterministic across the codebase, a
//! *canonical* representation is used for storage identifiers: **32 lowercase
//! hexadecimal characters** (no hyphens), the same value produced by
//! `Uuid::new_v4().simple().to_string()`.
//!
//! ## Sharded directory layout
//!
//! For a canonical UUID `u`, documents live under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `data/appointments/55/0e/550e8400e29b41d4a716446655440000/`
//!
//! Two levels of sharding keep per-directory fan-out small even with millions
//! of documents.
//!
//! Externally supplied identifiers (path parameters, request bodies) must be
//! validated with [`BookingUuid::parse`]; non-canonical values (uppercase,
//! hyphenated, wrong length, non-hex) are rejected.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;

/// The platform's canonical UUID representation (32 lowercase hex characters).
///
/// Once constructed, the contained UUID is guaranteed to be in canonical form,
/// so sharded paths derived from it are consistent everywhere.
///
/// # Construction
/// - [`BookingUuid::new`] allocates a fresh identifier for a new document.
/// - [`BookingUuid::parse`] validates an externally supplied identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BookingUuid(uuid::Uuid);

impl Default for BookingUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingUuid {
    /// Generates a new canonical UUID (RFC 4122 version 4).
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Validates an externally supplied identifier.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] unless the input is exactly 32
    /// lowercase hexadecimal characters.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if input.len() != 32 {
            return Err(UuidError::InvalidInput(format!(
                "identifier must be 32 characters, got {}",
                input.len()
            )));
        }

        if !input
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return Err(UuidError::InvalidInput(
                "identifier must contain only lowercase hexadecimal characters".into(),
            ));
        }

        let parsed = uuid::Uuid::from_str(input)
            .map_err(|e| UuidError::InvalidInput(format!("invalid UUID: {e}")))?;

        Ok(Self(parsed))
    }

    /// Returns the underlying [`uuid::Uuid`].
    pub fn uuid(&self) -> uuid::Uuid {
        self.0
    }

    /// Derives the sharded directory for this identifier under `parent`.
    ///
    /// Layout: `parent/<hex[0..2]>/<hex[2..4]>/<hex>`.
    pub fn sharded_dir(&self, parent: &Path) -> PathBuf {
        let hex = self.0.simple().to_string();
        parent.join(&hex[0..2]).join(&hex[2..4]).join(&hex)
    }
}

impl fmt::Display for BookingUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl serde::Serialize for BookingUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.simple().to_string())
    }
}

impl<'de> serde::Deserialize<'de> for BookingUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BookingUuid::parse(&s).map_err(serde::de::Error::custom)
    }
}
