//! Account flows: registration, login, email verification, password reset.
//!
//! Token handling follows one rule throughout: plaintext tokens are emailed
//! to the user exactly once and only their SHA-256 digests are stored (see
//! [`crate::tokens`]). Password material is salted and stretched before it
//! touches disk; the primitives are isolated below so a dedicated KDF can be
//! swapped in without touching the flows.

use crate::config::CoreConfig;
use crate::constants::{
    EMAIL_VERIFICATION_TTL_HOURS, MIN_PASSWORD_LEN, PASSWORD_RESET_TTL_HOURS,
};
use crate::notify::Notifier;
use crate::policy::Caller;
use crate::sessions::SessionStore;
use crate::tokens;
use crate::users::{
    PasswordRecord, ProviderProfile, ProviderRating, Role, TokenRecord, User, UserDirectory,
    VerificationStatus,
};
use crate::{BookingError, BookingResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use physio_email::EmailTemplate;
use physio_types::{BookingUuid, EmailAddress, NonEmptyText};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;

// ----------------------------------------------------------------------
// Password primitives
// ----------------------------------------------------------------------

const PASSWORD_ROUNDS: u32 = 10_000;

fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn derive_digest(password: &str, salt: &str, rounds: u32) -> String {
    let mut digest = Sha256::digest(format!("{salt}:{password}").as_bytes());
    for _ in 1..rounds {
        digest = Sha256::digest(digest);
    }

    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn password_record(password: &str) -> PasswordRecord {
    let salt = generate_salt();
    let digest = derive_digest(password, &salt, PASSWORD_ROUNDS);
    PasswordRecord {
        salt,
        rounds: PASSWORD_ROUNDS,
        digest,
    }
}

fn verify_password(record: &PasswordRecord, candidate: &str) -> bool {
    derive_digest(candidate, &record.salt, record.rounds) == record.digest
}

fn check_password_strength(password: &str) -> BookingResult<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(BookingError::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

// ----------------------------------------------------------------------
// Service
// ----------------------------------------------------------------------

/// Registration input. Physiotherapists must supply their professional
/// details; they are ignored for patients.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub role: Role,
    pub specialization: Option<String>,
    pub experience_years: Option<u32>,
    pub licence_number: Option<String>,
}

/// Account flows over the user directory and session store.
pub struct AccountService {
    cfg: Arc<CoreConfig>,
    users: Arc<UserDirectory>,
    sessions: Arc<SessionStore>,
    notifier: Notifier,
}

impl AccountService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        users: Arc<UserDirectory>,
        sessions: Arc<SessionStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            cfg,
            users,
            sessions,
            notifier,
        }
    }

    /// Registers a new account and emails a verification link.
    ///
    /// The verification email is the one delivery that is *not* best-effort:
    /// if the transport fails the stored token is cleared again and the error
    /// surfaces, so the user can retry registration or resend later.
    pub fn register(&self, input: RegisterInput) -> BookingResult<User> {
        let name = NonEmptyText::new(&input.name)?;
        let email = EmailAddress::parse(&input.email)?;
        check_password_strength(&input.password)?;

        let provider = match input.role {
            Role::Patient => None,
            Role::Physiotherapist => {
                let specialization = input.specialization.as_deref().ok_or_else(|| {
                    BookingError::InvalidInput(
                        "Specialization is required for physiotherapists".into(),
                    )
                })?;
                let licence_number = input.licence_number.as_deref().ok_or_else(|| {
                    BookingError::InvalidInput(
                        "Licence number is required for physiotherapists".into(),
                    )
                })?;

                Some(ProviderProfile {
                    specialization: NonEmptyText::new(specialization)?.into_string(),
                    experience_years: input.experience_years.unwrap_or(0),
                    licence_number: NonEmptyText::new(licence_number)?.into_string(),
                    verification_status: VerificationStatus::Pending,
                    rejection_reason: None,
                    rating: ProviderRating::default(),
                })
            }
            Role::Admin => {
                return Err(BookingError::InvalidInput(
                    "Admin accounts cannot self-register".into(),
                ))
            }
        };

        let verify_token = tokens::generate();
        let now = Utc::now();
        let user = User {
            id: BookingUuid::new(),
            name: name.into_string(),
            email: email.clone(),
            phone: input.phone.trim().to_owned(),
            role: input.role,
            password: password_record(&input.password),
            is_active: true,
            is_email_verified: false,
            last_login: None,
            email_verification: Some(TokenRecord {
                digest: tokens::sha256_hex(&verify_token),
                expires_at: now + Duration::hours(EMAIL_VERIFICATION_TTL_HOURS),
            }),
            password_reset: None,
            provider,
            created_at: now,
            updated_at: now,
        };

        self.users.create(&user)?;

        let send_result = self.notifier.send_now(
            EmailTemplate::EmailVerification {
                name: user.name.clone(),
                verify_url: self.cfg.verify_email_url(&verify_token),
            },
            &user.email,
        );

        if let Err(e) = send_result {
            self.users.update_where(&user.id, |stored| {
                stored.email_verification = None;
                Ok(())
            })?;
            return Err(e.into());
        }

        Ok(user)
    }

    /// Redeems an email-verification token.
    pub fn verify_email(&self, token: &str) -> BookingResult<User> {
        let digest = tokens::sha256_hex(token);
        let user = self
            .users
            .find_by_verification_token(&digest)
            .ok_or(BookingError::TokenInvalid)?;

        let user = self.users.update_where(&user.id, |stored| {
            stored.is_email_verified = true;
            stored.email_verification = None;
            Ok(stored.clone())
        })?;

        self.notifier.send_best_effort(
            EmailTemplate::Welcome {
                name: user.name.clone(),
                provider_under_review: user.is_provider() && !user.is_verified_provider(),
            },
            &user.email,
        );

        Ok(user)
    }

    /// Issues a fresh verification token for an unverified account.
    pub fn resend_verification(&self, email: &str) -> BookingResult<()> {
        let email = EmailAddress::parse(email)?;
        let user = self
            .users
            .find_by_email(&email)?
            .ok_or(BookingError::NotFound("User"))?;

        if user.is_email_verified {
            return Err(BookingError::InvalidState(
                "Email is already verified".into(),
            ));
        }

        let verify_token = tokens::generate();
        self.users.update_where(&user.id, |stored| {
            stored.email_verification = Some(TokenRecord {
                digest: tokens::sha256_hex(&verify_token),
                expires_at: Utc::now() + Duration::hours(EMAIL_VERIFICATION_TTL_HOURS),
            });
            Ok(())
        })?;

        let send_result = self.notifier.send_now(
            EmailTemplate::EmailVerification {
                name: user.name.clone(),
                verify_url: self.cfg.verify_email_url(&verify_token),
            },
            &user.email,
        );

        if let Err(e) = send_result {
            self.users.update_where(&user.id, |stored| {
                stored.email_verification = None;
                Ok(())
            })?;
            return Err(e.into());
        }

        Ok(())
    }

    /// Authenticates a user and issues a session token.
    pub fn login(&self, email: &str, password: &str) -> BookingResult<(User, String)> {
        let bad_credentials =
            || BookingError::Unauthorized("Incorrect email or password".into());

        let email = EmailAddress::parse(email).map_err(|_| bad_credentials())?;
        let user = self
            .users
            .find_by_email(&email)?
            .ok_or_else(bad_credentials)?;

        if !verify_password(&user.password, password) {
            return Err(bad_credentials());
        }

        if !user.is_active {
            return Err(BookingError::Unauthorized(
                "Your account has been deactivated. Please contact support.".into(),
            ));
        }

        if !user.is_email_verified {
            return Err(BookingError::Unauthorized(
                "Please verify your email before logging in.".into(),
            ));
        }

        if let Some(profile) = &user.provider {
            match profile.verification_status {
                VerificationStatus::Verified => {}
                VerificationStatus::Rejected => {
                    let reason = profile
                        .rejection_reason
                        .as_deref()
                        .unwrap_or("Please contact support.");
                    return Err(BookingError::Unauthorized(format!(
                        "Your account verification was rejected. Reason: {reason}"
                    )));
                }
                VerificationStatus::Pending => {
                    return Err(BookingError::Unauthorized(
                        "Your account is pending verification.".into(),
                    ));
                }
            }
        }

        let user = self.users.update_where(&user.id, |stored| {
            stored.last_login = Some(Utc::now());
            Ok(stored.clone())
        })?;

        let token = self.sessions.issue(&user.id, user.role)?;
        Ok((user, token))
    }

    /// Revokes a session token.
    pub fn logout(&self, token: &str) -> BookingResult<()> {
        self.sessions.revoke(token)
    }

    /// Emails a password-reset link.
    pub fn forgot_password(&self, email: &str) -> BookingResult<()> {
        let email = EmailAddress::parse(email)?;
        let user = self
            .users
            .find_by_email(&email)?
            .ok_or(BookingError::NotFound("User"))?;

        let reset_token = tokens::generate();
        self.users.update_where(&user.id, |stored| {
            stored.password_reset = Some(TokenRecord {
                digest: tokens::sha256_hex(&reset_token),
                expires_at: Utc::now() + Duration::hours(PASSWORD_RESET_TTL_HOURS),
            });
            Ok(())
        })?;

        let send_result = self.notifier.send_now(
            EmailTemplate::PasswordReset {
                name: user.name.clone(),
                reset_url: self.cfg.reset_password_url(&reset_token),
            },
            &user.email,
        );

        if let Err(e) = send_result {
            self.users.update_where(&user.id, |stored| {
                stored.password_reset = None;
                Ok(())
            })?;
            return Err(e.into());
        }

        Ok(())
    }

    /// Redeems a password-reset token and stores the new password.
    pub fn reset_password(&self, token: &str, new_password: &str) -> BookingResult<()> {
        check_password_strength(new_password)?;

        let digest = tokens::sha256_hex(token);
        let user = self
            .users
            .find_by_reset_token(&digest)
            .ok_or(BookingError::TokenInvalid)?;

        let user = self.users.update_where(&user.id, |stored| {
            stored.password = password_record(new_password);
            stored.password_reset = None;
            Ok(stored.clone())
        })?;

        self.notifier.send_best_effort(
            EmailTemplate::PasswordChanged {
                name: user.name.clone(),
            },
            &user.email,
        );

        Ok(())
    }

    /// Changes the password of a logged-in user.
    pub fn update_password(
        &self,
        caller: &Caller,
        current_password: &str,
        new_password: &str,
    ) -> BookingResult<()> {
        check_password_strength(new_password)?;

        let user = self.users.find(&caller.id)?;
        if !verify_password(&user.password, current_password) {
            return Err(BookingError::Unauthorized(
                "Your current password is wrong".into(),
            ));
        }

        self.users.update_where(&user.id, |stored| {
            stored.password = password_record(new_password);
            Ok(())
        })
    }

    /// The caller's own profile.
    pub fn me(&self, caller: &Caller) -> BookingResult<User> {
        self.users.find(&caller.id)
    }
}
