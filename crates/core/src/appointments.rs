//! Appointment documents and their state machine.
//!
//! An appointment is created by a patient request and then moves through a
//! one-directional status graph:
//!
//! ```text
//! pending ──► confirmed ──► in-progress ──► completed
//!    │             │              │
//!    │             └──────┬───────┘
//!    ├──► rejected        ▼
//!    └──────────────► cancelled
//! ```
//!
//! `rejected`, `completed` and `cancelled` are terminal. The transition table
//! lives in [`AppointmentStatus::can_transition_to`]; every status mutation in
//! the lifecycle manager is guarded by it under the store lock.

use crate::{BookingError, BookingResult};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use physio_types::BookingUuid;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Rejected,
    Completed,
    Cancelled,
    InProgress,
}

impl AppointmentStatus {
    /// True once no further status change is permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed | Self::Cancelled)
    }

    /// True while the appointment occupies its slot in the ledger.
    pub fn holds_slot(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// The status transition table.
    pub fn can_transition_to(&self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Confirmed | Self::Rejected | Self::Cancelled),
            Self::Confirmed => {
                matches!(next, Self::InProgress | Self::Completed | Self::Cancelled)
            }
            Self::InProgress => matches!(next, Self::Completed | Self::Cancelled),
            Self::Rejected | Self::Completed | Self::Cancelled => false,
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::InProgress => "in-progress",
        };
        write!(f, "{name}")
    }
}

/// A (start, end) window within the appointment date, "HH:MM" wall-clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_time: String,
    pub end_time: String,
}

impl TimeSlot {
    /// Validates and constructs a slot. Start must precede end.
    pub fn new(start_time: &str, end_time: &str) -> BookingResult<Self> {
        let start = parse_wall_clock(start_time)?;
        let end = parse_wall_clock(end_time)?;

        if start >= end {
            return Err(BookingError::InvalidInput(format!(
                "time slot start {start_time} must be before end {end_time}"
            )));
        }

        Ok(Self {
            start_time: start_time.to_owned(),
            end_time: end_time.to_owned(),
        })
    }

    /// "HH:MM - HH:MM", the form used in notification emails.
    pub fn display_range(&self) -> String {
        format!("{} - {}", self.start_time, self.end_time)
    }
}

fn parse_wall_clock(value: &str) -> BookingResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| BookingError::InvalidInput(format!("invalid time {value:?}, expected HH:MM")))
}

/// Amount breakdown for one appointment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub total: f64,
    pub platform_fee: f64,
    pub physiotherapist_amount: f64,
}

impl Amount {
    /// Splits `total` into the platform fee and the provider's share.
    ///
    /// The provider amount is computed as the remainder (`total - fee`) rather
    /// than a second multiplication, so the two parts always sum back to the
    /// total.
    pub fn split(total: f64, commission_rate: f64) -> BookingResult<Self> {
        if !total.is_finite() || total <= 0.0 {
            return Err(BookingError::InvalidInput(
                "appointment amount must be a positive number".into(),
            ));
        }

        let platform_fee = total * commission_rate;
        Ok(Self {
            total,
            platform_fee,
            physiotherapist_amount: total - platform_fee,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    PartiallyRefunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    None,
    Pending,
    Processed,
    Failed,
}

/// Payment sub-record. Capture happens upstream; this tracks the outcome and
/// any refund issued against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<f64>,
    pub refund_status: RefundStatus,
}

impl PaymentInfo {
    /// Payment state for a freshly booked appointment: capture is assumed to
    /// have happened before the request reaches the lifecycle manager.
    pub fn pre_authorised() -> Self {
        Self {
            payment_id: None,
            status: PaymentStatus::Paid,
            refund_id: None,
            refund_amount: None,
            refund_status: RefundStatus::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsultationMode {
    HomeVisit,
    VideoCall,
    Clinic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    pub mode: ConsultationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_call_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_call_scheduled: Option<DateTime<Utc>>,
}

impl Consultation {
    /// Home visits need an address; video calls get their link later.
    pub fn validate(&self) -> BookingResult<()> {
        if self.mode == ConsultationMode::HomeVisit && self.address.is_none() {
            return Err(BookingError::InvalidInput(
                "home-visit consultations require an address".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub medicine: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub prescribed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub description: String,
    pub sets: u32,
    pub repetitions: u32,
    pub duration: String,
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FollowUp {
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One party's rating of the other, settable exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingEntry {
    pub rating: u8,
    pub review: String,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentRatings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_rating: Option<RatingEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physiotherapist_rating: Option<RatingEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentNotes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physiotherapist_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
}

/// An appointment document. Never hard-deleted; cancellation is a status
/// change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: BookingUuid,
    pub patient: BookingUuid,
    pub physiotherapist: BookingUuid,
    pub appointment_date: NaiveDate,
    pub time_slot: TimeSlot,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub amount: Amount,
    pub payment: PaymentInfo,
    pub consultation: Consultation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prescriptions: Vec<Prescription>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub follow_up: FollowUp,
    #[serde(default)]
    pub rating: AppointmentRatings,
    #[serde(default)]
    pub notes: AppointmentNotes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// True if `user_id` is the patient or the physiotherapist.
    pub fn is_party(&self, user_id: &BookingUuid) -> bool {
        &self.patient == user_id || &self.physiotherapist == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table_matches_state_machine() {
        use AppointmentStatus::*;

        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(InProgress));

        assert!(Confirmed.can_transition_to(InProgress));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Rejected));

        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(!InProgress.can_transition_to(Confirmed));

        for terminal in [Rejected, Completed, Cancelled] {
            assert!(terminal.is_terminal());
            for next in [Pending, Confirmed, Rejected, Completed, Cancelled, InProgress] {
                assert!(
                    !terminal.can_transition_to(next),
                    "{terminal} must not transition to {next}"
                );
            }
        }
    }

    #[test]
    fn test_amount_split_sample() {
        let amount = Amount::split(1000.0, 0.20).expect("split should succeed");
        assert_eq!(amount.platform_fee, 200.0);
        assert_eq!(amount.physiotherapist_amount, 800.0);
        assert_eq!(amount.total, 1000.0);
    }

    #[test]
    fn test_amount_split_sums_to_total_across_rates() {
        let total = 937.43;
        for step in 0..=20 {
            let rate = step as f64 / 20.0;
            let amount = Amount::split(total, rate).expect("split should succeed");
            assert!(
                (amount.platform_fee + amount.physiotherapist_amount - amount.total).abs() < 1e-9,
                "fee + provider share must equal total at rate {rate}"
            );
        }
    }

    #[test]
    fn test_amount_split_rejects_non_positive_totals() {
        for bad in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            assert!(
                Amount::split(bad, 0.2).is_err(),
                "should reject total {bad}"
            );
        }
    }

    #[test]
    fn test_time_slot_validation() {
        let slot = TimeSlot::new("10:00", "11:00").expect("valid slot should build");
        assert_eq!(slot.display_range(), "10:00 - 11:00");

        assert!(TimeSlot::new("11:00", "10:00").is_err(), "start after end");
        assert!(TimeSlot::new("10:00", "10:00").is_err(), "zero-length slot");
        assert!(TimeSlot::new("25:00", "26:00").is_err(), "not a wall-clock time");
        assert!(TimeSlot::new("10am", "11am").is_err(), "wrong format");
    }

    #[test]
    fn test_home_visit_requires_address() {
        let consultation = Consultation {
            mode: ConsultationMode::HomeVisit,
            address: None,
            video_call_link: None,
            video_call_scheduled: None,
        };
        assert!(consultation.validate().is_err());

        let video = Consultation {
            mode: ConsultationMode::VideoCall,
            address: None,
            video_call_link: None,
            video_call_scheduled: None,
        };
        assert!(video.validate().is_ok());
    }

    #[test]
    fn test_status_serialises_kebab_case() {
        let json = serde_json::to_string(&AppointmentStatus::InProgress)
            .expect("status should serialise");
        assert_eq!(json, "\"in-progress\"");
    }
}
