//! User directory: patients, physiotherapists and admins.
//!
//! Physiotherapist accounts carry extra provider state: an admin-gated
//! verification status (distinct from email verification) and a running
//! rating average maintained from patient reviews.

use crate::config::CoreConfig;
use crate::constants::{EMAIL_INDEX_DIR_NAME, USERS_DIR_NAME, USER_FILE_NAME};
use crate::store::{Collection, EmailIndex};
use crate::{BookingError, BookingResult};
use chrono::{DateTime, Utc};
use physio_types::{BookingUuid, EmailAddress};
use serde::{Deserialize, Serialize};

/// Account role. Read off the caller's session for permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Physiotherapist,
    Admin,
}

/// Admin-gated approval state for physiotherapist accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

/// Running rating average for a provider, rounded to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderRating {
    pub average: f64,
    pub count: u64,
}

impl Default for ProviderRating {
    fn default() -> Self {
        Self {
            average: 0.0,
            count: 0,
        }
    }
}

/// Physiotherapist-specific account state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub specialization: String,
    pub experience_years: u32,
    pub licence_number: String,
    pub verification_status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub rating: ProviderRating,
}

/// Stored password material. The plaintext never touches disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordRecord {
    pub salt: String,
    pub rounds: u32,
    pub digest: String,
}

/// A single-use token digest with expiry (email verification, password reset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn matches(&self, token_digest: &str, now: DateTime<Utc>) -> bool {
        self.digest == token_digest && self.expires_at > now
    }
}

/// A user document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: BookingUuid,
    pub name: String,
    pub email: EmailAddress,
    pub phone: String,
    pub role: Role,
    pub password: PasswordRecord,
    pub is_active: bool,
    pub is_email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verification: Option<TokenRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_reset: Option<TokenRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderProfile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// True for physiotherapist accounts.
    pub fn is_provider(&self) -> bool {
        self.role == Role::Physiotherapist
    }

    /// True if a physiotherapist account has passed admin review.
    pub fn is_verified_provider(&self) -> bool {
        matches!(
            self.provider,
            Some(ProviderProfile {
                verification_status: VerificationStatus::Verified,
                ..
            })
        )
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Lookup and mutation service for user documents.
///
/// Wraps the users collection and the email uniqueness index.
#[derive(Debug)]
pub struct UserDirectory {
    users: Collection<User>,
    email_index: EmailIndex,
}

impl UserDirectory {
    pub fn new(cfg: &CoreConfig) -> Self {
        let users_dir = cfg.data_dir().join(USERS_DIR_NAME);
        Self {
            users: Collection::new(users_dir.clone(), USER_FILE_NAME, "User"),
            email_index: EmailIndex::new(users_dir.join(EMAIL_INDEX_DIR_NAME)),
        }
    }

    /// Persists a new user, claiming their email address.
    ///
    /// # Errors
    ///
    /// Returns `EmailTaken` if the address is already registered. If the
    /// document write fails after the claim, the claim is released again.
    pub fn create(&self, user: &User) -> BookingResult<()> {
        self.email_index.claim(user.email.as_str(), &user.id)?;

        if let Err(e) = self.users.insert(&user.id, user) {
            if let Err(release_err) = self.email_index.release(user.email.as_str()) {
                tracing::error!(
                    email = %user.email,
                    error = %release_err,
                    "failed to release email claim after insert failure"
                );
            }
            return Err(e);
        }

        Ok(())
    }

    pub fn find(&self, id: &BookingUuid) -> BookingResult<User> {
        self.users.get(id)
    }

    pub fn find_by_email(&self, email: &EmailAddress) -> BookingResult<Option<User>> {
        match self.email_index.lookup(email.as_str())? {
            Some(id) => self.users.try_get(&id),
            None => Ok(None),
        }
    }

    /// Finds the user holding an unexpired email-verification token.
    pub fn find_by_verification_token(&self, token_digest: &str) -> Option<User> {
        let now = Utc::now();
        self.users.list().into_iter().find(|user| {
            user.email_verification
                .as_ref()
                .is_some_and(|record| record.matches(token_digest, now))
        })
    }

    /// Finds the user holding an unexpired password-reset token.
    pub fn find_by_reset_token(&self, token_digest: &str) -> Option<User> {
        let now = Utc::now();
        self.users.list().into_iter().find(|user| {
            user.password_reset
                .as_ref()
                .is_some_and(|record| record.matches(token_digest, now))
        })
    }

    /// Conditionally mutates a user document (see [`Collection::update_where`]).
    pub fn update_where<R>(
        &self,
        id: &BookingUuid,
        f: impl FnOnce(&mut User) -> BookingResult<R>,
    ) -> BookingResult<R> {
        self.users.update_where(id, |user| {
            let outcome = f(user)?;
            user.updated_at = Utc::now();
            Ok(outcome)
        })
    }

    /// Folds a new patient rating into a provider's running average.
    ///
    /// `new_avg = (old_avg * old_count + rating) / (old_count + 1)`, rounded
    /// to 2 decimals. Runs under the collection lock, so concurrent ratings
    /// serialise.
    pub fn record_provider_rating(
        &self,
        physio_id: &BookingUuid,
        rating: u8,
    ) -> BookingResult<ProviderRating> {
        self.update_where(physio_id, |user| {
            let profile = user
                .provider
                .as_mut()
                .ok_or(BookingError::NotFound("Physiotherapist"))?;

            let current = profile.rating;
            let new_count = current.count + 1;
            let new_average =
                round2((current.average * current.count as f64 + rating as f64) / new_count as f64);

            profile.rating = ProviderRating {
                average: new_average,
                count: new_count,
            };
            Ok(profile.rating)
        })
    }

    /// Admin approval/rejection of a physiotherapist account.
    pub fn set_verification(
        &self,
        id: &BookingUuid,
        status: VerificationStatus,
        rejection_reason: Option<String>,
    ) -> BookingResult<()> {
        self.update_where(id, |user| {
            let profile = user
                .provider
                .as_mut()
                .ok_or(BookingError::NotFound("Physiotherapist"))?;

            profile.verification_status = status;
            profile.rejection_reason = match status {
                VerificationStatus::Rejected => rejection_reason,
                _ => None,
            };
            Ok(())
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// A ready-made user document for tests. Physiotherapists come back
    /// admin-verified with a zeroed rating.
    pub(crate) fn sample_user(role: Role) -> User {
        let id = BookingUuid::new();
        let now = Utc::now();
        let provider = (role == Role::Physiotherapist).then(|| ProviderProfile {
            specialization: "Sports rehabilitation".into(),
            experience_years: 5,
            licence_number: "PT-1234".into(),
            verification_status: VerificationStatus::Verified,
            rejection_reason: None,
            rating: ProviderRating::default(),
        });

        User {
            email: EmailAddress::parse(format!("user-{id}@example.com")).expect("valid email"),
            id,
            name: "Test User".into(),
            phone: "+44 7700 900000".into(),
            role,
            password: PasswordRecord {
                salt: "c2FsdA".into(),
                rounds: 1,
                digest: "digest".into(),
            },
            is_active: true,
            is_email_verified: true,
            last_login: None,
            email_verification: None,
            password_reset: None,
            provider,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::sample_user;
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn directory(path: &Path) -> UserDirectory {
        let cfg = CoreConfig::new(path.to_path_buf(), None, "https://physio.example".into())
            .expect("config should build");
        UserDirectory::new(&cfg)
    }

    #[test]
    fn test_create_and_find_round_trips() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let directory = directory(temp.path());

        let user = sample_user(Role::Patient);
        directory.create(&user).expect("create should succeed");

        let found = directory.find(&user.id).expect("find should succeed");
        assert_eq!(found.email, user.email);

        let by_email = directory
            .find_by_email(&user.email)
            .expect("lookup should succeed")
            .expect("user should exist");
        assert_eq!(by_email.id, user.id);
    }

    #[test]
    fn test_create_rejects_duplicate_email() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let directory = directory(temp.path());

        let user = sample_user(Role::Patient);
        directory.create(&user).expect("create should succeed");

        let mut duplicate = sample_user(Role::Patient);
        duplicate.email = user.email.clone();

        let err = directory
            .create(&duplicate)
            .expect_err("duplicate email should fail");
        assert!(matches!(err, BookingError::EmailTaken));
    }

    #[test]
    fn test_record_provider_rating_updates_running_average() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let directory = directory(temp.path());

        let mut physio = sample_user(Role::Physiotherapist);
        physio.provider.as_mut().expect("provider profile").rating = ProviderRating {
            average: 4.0,
            count: 3,
        };
        directory.create(&physio).expect("create should succeed");

        let rating = directory
            .record_provider_rating(&physio.id, 5)
            .expect("rating should record");

        assert_eq!(rating.average, 4.25, "(4.0*3 + 5) / 4 = 4.25");
        assert_eq!(rating.count, 4);

        let stored = directory.find(&physio.id).expect("find should succeed");
        assert_eq!(
            stored.provider.expect("provider profile").rating,
            rating,
            "rating should persist"
        );
    }

    #[test]
    fn test_record_provider_rating_rounds_to_two_decimals() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let directory = directory(temp.path());

        let mut physio = sample_user(Role::Physiotherapist);
        physio.provider.as_mut().expect("provider profile").rating = ProviderRating {
            average: 4.0,
            count: 2,
        };
        directory.create(&physio).expect("create should succeed");

        // (4.0*2 + 5) / 3 = 4.3333... -> 4.33
        let rating = directory
            .record_provider_rating(&physio.id, 5)
            .expect("rating should record");
        assert_eq!(rating.average, 4.33);
    }

    #[test]
    fn test_record_provider_rating_requires_provider_profile() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let directory = directory(temp.path());

        let patient = sample_user(Role::Patient);
        directory.create(&patient).expect("create should succeed");

        let err = directory
            .record_provider_rating(&patient.id, 5)
            .expect_err("patients carry no provider rating");
        assert!(matches!(err, BookingError::NotFound("Physiotherapist")));
    }

    #[test]
    fn test_set_verification_transitions_status() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let directory = directory(temp.path());

        let mut physio = sample_user(Role::Physiotherapist);
        physio
            .provider
            .as_mut()
            .expect("provider profile")
            .verification_status = VerificationStatus::Pending;
        directory.create(&physio).expect("create should succeed");

        directory
            .set_verification(
                &physio.id,
                VerificationStatus::Rejected,
                Some("documents unreadable".into()),
            )
            .expect("set_verification should succeed");

        let stored = directory.find(&physio.id).expect("find should succeed");
        let profile = stored.provider.expect("provider profile");
        assert_eq!(profile.verification_status, VerificationStatus::Rejected);
        assert_eq!(
            profile.rejection_reason.as_deref(),
            Some("documents unreadable")
        );
    }
}
