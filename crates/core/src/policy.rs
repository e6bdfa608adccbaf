//! Centralised appointment capability checks.
//!
//! Every handler and lifecycle operation answers "may this caller do this to
//! this appointment?" through [`can_act`] instead of re-deriving ownership
//! rules per endpoint. Role comes off the caller's session.

use crate::appointments::Appointment;
use crate::users::Role;
use physio_types::BookingUuid;

/// The authenticated caller, as resolved from a session token.
#[derive(Debug, Clone)]
pub struct Caller {
    pub id: BookingUuid,
    pub role: Role,
}

impl Caller {
    pub fn new(id: BookingUuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Everything a caller can attempt against an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentAction {
    View,
    Respond,
    UpdateProgress,
    Cancel,
    Rate,
    WriteNotes,
}

/// The capability table.
///
/// - Responding is reserved for the *assigned* physiotherapist.
/// - Rating is reserved for the two parties; admins observe, they don't rate.
/// - Everything else is parties-or-admin.
pub fn can_act(caller: &Caller, appointment: &Appointment, action: AppointmentAction) -> bool {
    match action {
        AppointmentAction::Respond => {
            caller.role == Role::Physiotherapist && appointment.physiotherapist == caller.id
        }
        AppointmentAction::Rate => appointment.is_party(&caller.id),
        AppointmentAction::View
        | AppointmentAction::UpdateProgress
        | AppointmentAction::Cancel
        | AppointmentAction::WriteNotes => {
            caller.is_admin() || appointment.is_party(&caller.id)
        }
    }
}
