//! Mail transport seam.
//!
//! Outbound SMTP is an external collaborator; the platform only depends on the
//! [`Mailer`] trait. The implementations here cover development and testing:
//! production deployments plug in a real transport behind the same trait.

use crate::{EmailError, EmailResult, OutgoingEmail};
use std::sync::Mutex;

/// A mail transport.
///
/// Implementations must be cheap to call from request handlers; slow
/// transports should queue internally.
pub trait Mailer: Send + Sync {
    /// Delivers one message.
    fn send(&self, email: &OutgoingEmail) -> EmailResult<()>;
}

/// Transport that logs deliveries instead of sending them.
///
/// The default for local development: every "sent" email shows up in the
/// process log with its template name and recipient.
#[derive(Debug, Default, Clone)]
pub struct TracingMailer;

impl TracingMailer {
    pub fn new() -> Self {
        Self
    }
}

impl Mailer for TracingMailer {
    fn send(&self, email: &OutgoingEmail) -> EmailResult<()> {
        tracing::info!(
            template = email.template,
            to = %email.to,
            subject = %email.subject,
            "email delivered (logged transport)"
        );
        Ok(())
    }
}

/// Transport that records every message in memory.
///
/// Used by tests to assert on the outbox, and handy for demo environments
/// where an admin page lists "sent" mail.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<OutgoingEmail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every message delivered so far.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.outbox
            .lock()
            .expect("outbox lock poisoned")
            .clone()
    }

    /// Messages delivered to `to`, in order.
    pub fn sent_to(&self, to: &str) -> Vec<OutgoingEmail> {
        self.sent().into_iter().filter(|m| m.to == to).collect()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, email: &OutgoingEmail) -> EmailResult<()> {
        self.outbox
            .lock()
            .expect("outbox lock poisoned")
            .push(email.clone());
        Ok(())
    }
}

/// Transport that always fails.
///
/// A test double for exercising the platform's best-effort delivery paths.
#[derive(Debug, Default, Clone)]
pub struct FailingMailer;

impl Mailer for FailingMailer {
    fn send(&self, _email: &OutgoingEmail) -> EmailResult<()> {
        Err(EmailError::Delivery("transport unavailable".into()))
    }
}
