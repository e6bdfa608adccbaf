//! Fire-and-forget side effects.
//!
//! Emails and refunds never gate a state transition: once the primary
//! mutation has been committed, side effects run decoupled from the
//! request/response cycle. Inside a tokio runtime each effect becomes an
//! independent task with bounded retry and backoff, ending in a dead-letter
//! log entry if every attempt fails. Outside a runtime (unit tests, CLI
//! tools) the effect runs inline with a single attempt.
//!
//! Either way the guarantee is at-most-once, best-effort: failures are
//! logged, never retried across process restarts, and never roll back the
//! transition that preceded them.

use crate::BookingResult;
use physio_email::{EmailTemplate, Mailer};
use physio_types::EmailAddress;
use std::sync::Arc;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Dispatches best-effort notification emails.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    /// Sends synchronously and propagates the transport error.
    ///
    /// Used where the caller's contract depends on delivery, e.g. the
    /// registration flow clears its verification token if this fails.
    pub fn send_now(
        &self,
        template: EmailTemplate,
        to: &EmailAddress,
    ) -> physio_email::EmailResult<()> {
        self.mailer.send(&template.into_message(to.as_str()))
    }

    /// Sends without blocking the caller and without surfacing failure.
    pub fn send_best_effort(&self, template: EmailTemplate, to: &EmailAddress) {
        let message = template.into_message(to.as_str());
        let mailer = self.mailer.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    for attempt in 1..=MAX_ATTEMPTS {
                        match mailer.send(&message) {
                            Ok(()) => return,
                            Err(e) if attempt < MAX_ATTEMPTS => {
                                tracing::warn!(
                                    template = message.template,
                                    to = %message.to,
                                    attempt,
                                    error = %e,
                                    "email delivery failed, retrying"
                                );
                                tokio::time::sleep(BACKOFF_BASE * attempt).await;
                            }
                            Err(e) => {
                                tracing::error!(
                                    template = message.template,
                                    to = %message.to,
                                    error = %e,
                                    "email dead-lettered after {MAX_ATTEMPTS} attempts"
                                );
                            }
                        }
                    }
                });
            }
            Err(_) => {
                if let Err(e) = mailer.send(&message) {
                    tracing::warn!(
                        template = message.template,
                        to = %message.to,
                        error = %e,
                        "email delivery failed"
                    );
                }
            }
        }
    }
}

/// Runs `task` decoupled from the caller, logging failure instead of
/// propagating it.
///
/// Used for refund issuance: the task re-reads and mutates documents itself,
/// so retrying it is safe.
pub fn run_best_effort<F>(label: &'static str, task: F)
where
    F: Fn() -> BookingResult<()> + Send + Sync + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                for attempt in 1..=MAX_ATTEMPTS {
                    match task() {
                        Ok(()) => return,
                        Err(e) if attempt < MAX_ATTEMPTS => {
                            tracing::warn!(label, attempt, error = %e, "side effect failed, retrying");
                            tokio::time::sleep(BACKOFF_BASE * attempt).await;
                        }
                        Err(e) => {
                            tracing::error!(
                                label,
                                error = %e,
                                "side effect dead-lettered after {MAX_ATTEMPTS} attempts"
                            );
                        }
                    }
                }
            });
        }
        Err(_) => {
            if let Err(e) = task() {
                tracing::warn!(label, error = %e, "side effect failed");
            }
        }
    }
}
