//! Transactional email for the booking platform.
//!
//! Two halves, deliberately separated:
//!
//! - [`EmailTemplate`]: a closed registry of every message the platform sends.
//!   Each variant carries its own typed data and rendering is a pure function
//!   of that data; there is no shared template state anywhere in the process.
//! - [`Mailer`]: the transport seam. Actual SMTP delivery is an external
//!   concern; the in-tree implementations log deliveries ([`TracingMailer`])
//!   or record them for inspection ([`MemoryMailer`]).
//!
//! Callers build an [`OutgoingEmail`] with [`EmailTemplate::into_message`] and
//! hand it to whichever [`Mailer`] the process was wired with.

mod mailer;
mod templates;

pub use mailer::{FailingMailer, Mailer, MemoryMailer, TracingMailer};
pub use templates::{EmailTemplate, OutgoingEmail};

/// Errors produced by a mail transport.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// The transport could not deliver the message.
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

/// Result type for mail operations.
pub type EmailResult<T> = Result<T, EmailError>;
