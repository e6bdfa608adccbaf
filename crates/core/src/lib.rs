//! # Booking Core
//!
//! Core business logic for the home-physiotherapy booking platform.
//!
//! This crate contains the domain model and pure data operations:
//! - The appointment lifecycle state machine with its payment/notification
//!   side effects ([`lifecycle`])
//! - Account flows: registration, login, email verification, password reset
//!   ([`accounts`])
//! - Sharded JSON document storage with compare-and-swap updates ([`store`])
//! - Per-appointment chat threads ([`chat`])
//!
//! **No API concerns**: HTTP servers, request parsing and response shaping
//! belong in `api-rest` and `api-shared`.

pub mod accounts;
pub mod appointments;
pub mod chat;
pub mod config;
pub mod constants;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod payments;
pub mod policy;
pub mod sessions;
pub mod store;
pub mod tokens;
pub mod users;

pub use config::CoreConfig;
pub use error::{BookingError, BookingResult};
pub use notify::Notifier;
pub use policy::{can_act, AppointmentAction, Caller};

// The validated primitives are part of this crate's public vocabulary.
pub use physio_types::{BookingUuid, EmailAddress, NonEmptyText};
