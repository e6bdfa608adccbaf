//! Payment gateway seam.
//!
//! Capture happens before a booking reaches this system; the only operation
//! the core needs is issuing refunds. Real gateway integration is an external
//! collaborator behind [`PaymentGateway`]; the in-tree implementations cover
//! development and the best-effort failure paths.

use crate::appointments::Appointment;
use physio_types::BookingUuid;

/// Errors produced by a payment gateway.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The gateway refused or failed to process the refund.
    #[error("refund failed: {0}")]
    Refund(String),
}

/// Result of a successfully issued refund.
#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub amount: f64,
}

/// A payment gateway capable of refunding a captured appointment payment.
pub trait PaymentGateway: Send + Sync {
    /// Issues a full refund for the appointment's total amount.
    fn process_refund(&self, appointment: &Appointment) -> Result<RefundReceipt, PaymentError>;
}

/// Gateway stub that "processes" every refund locally.
///
/// Generates a receipt with a fresh refund id; useful for development and as
/// the default until a real gateway is wired in.
#[derive(Debug, Default, Clone)]
pub struct StubGateway;

impl StubGateway {
    pub fn new() -> Self {
        Self
    }
}

impl PaymentGateway for StubGateway {
    fn process_refund(&self, appointment: &Appointment) -> Result<RefundReceipt, PaymentError> {
        Ok(RefundReceipt {
            refund_id: format!("re_{}", BookingUuid::new()),
            amount: appointment.amount.total,
        })
    }
}

/// Gateway that fails every refund.
///
/// A test double for exercising the best-effort refund paths.
#[derive(Debug, Default, Clone)]
pub struct FailingGateway;

impl PaymentGateway for FailingGateway {
    fn process_refund(&self, _appointment: &Appointment) -> Result<RefundReceipt, PaymentError> {
        Err(PaymentError::Refund("gateway unavailable".into()))
    }
}
