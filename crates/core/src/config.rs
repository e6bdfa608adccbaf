//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core
//! services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in
//! multi-threaded runtimes and test harnesses.

use crate::constants::DEFAULT_COMMISSION_RATE;
use crate::{BookingError, BookingResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    commission_rate: f64,
    public_base_url: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `BookingError::InvalidInput` if the commission rate is outside
    /// `[0, 1]` or the public base URL is empty.
    pub fn new(
        data_dir: PathBuf,
        commission_rate: Option<f64>,
        public_base_url: String,
    ) -> BookingResult<Self> {
        let commission_rate = commission_rate.unwrap_or(DEFAULT_COMMISSION_RATE);

        if !(0.0..=1.0).contains(&commission_rate) {
            return Err(BookingError::InvalidInput(format!(
                "commission rate must be within [0, 1], got {commission_rate}"
            )));
        }

        if public_base_url.trim().is_empty() {
            return Err(BookingError::InvalidInput(
                "public_base_url cannot be empty".into(),
            ));
        }

        Ok(Self {
            data_dir,
            commission_rate,
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Platform cut of each appointment total, in `[0, 1]`.
    pub fn commission_rate(&self) -> f64 {
        self.commission_rate
    }

    /// Base URL embedded in verification/reset links, without trailing slash.
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    /// Full URL for an email-verification token.
    pub fn verify_email_url(&self, token: &str) -> String {
        format!("{}/verify-email/{token}", self.public_base_url)
    }

    /// Full URL for a password-reset token.
    pub fn reset_password_url(&self, token: &str) -> String {
        format!("{}/reset-password/{token}", self.public_base_url)
    }
}

/// Parse the commission rate from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, returns `None` (caller falls back
/// to the default rate).
pub fn commission_rate_from_env_value(value: Option<String>) -> BookingResult<Option<f64>> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    value
        .map(|v| {
            v.parse::<f64>().map_err(|e| {
                BookingError::InvalidInput(format!("invalid commission rate {v:?}: {e}"))
            })
        })
        .transpose()
}
