//! The appointment lifecycle manager.
//!
//! Owns every appointment state transition and the side effects hanging off
//! them: notification emails, refunds and chat thread creation. The rules it
//! enforces:
//!
//! - **Fail fast, then mutate.** Every domain check runs before any write.
//! - **Guarded transitions.** Status changes go through the store's
//!   [`Collection::update_where`], which re-reads the document under the
//!   collection lock. Two concurrent responses to the same request admit at
//!   most one winner; the loser sees `InvalidState`.
//! - **Slot uniqueness.** Creating a request claims the (physiotherapist,
//!   date, start-time) slot in the ledger; the claim is released when the
//!   appointment leaves the pending/confirmed set.
//! - **Best-effort side effects.** Emails and refunds never fail a request.
//!   They run decoupled from the transition (see [`crate::notify`]), and a
//!   refund outcome lands in the payment sub-record afterwards.

use crate::appointments::{
    Amount, Appointment, AppointmentStatus, Consultation, PaymentInfo, PaymentStatus,
    RatingEntry, RefundStatus, TimeSlot,
};
use crate::chat::ChatService;
use crate::config::CoreConfig;
use crate::constants::{
    APPOINTMENTS_DIR_NAME, APPOINTMENT_FILE_NAME, MAX_REASON_LEN, MAX_REJECTION_REASON_LEN,
    MAX_SYMPTOMS_LEN, SLOTS_DIR_NAME,
};
use crate::notify::{self, Notifier};
use crate::payments::PaymentGateway;
use crate::policy::{can_act, AppointmentAction, Caller};
use crate::store::{Collection, SlotLedger};
use crate::users::{Role, User, UserDirectory};
use crate::{BookingError, BookingResult};
use chrono::{NaiveDate, Utc};
use physio_email::EmailTemplate;
use physio_types::{BookingUuid, NonEmptyText};
use std::sync::Arc;

/// Input for a new appointment request.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub physiotherapist: BookingUuid,
    pub appointment_date: NaiveDate,
    pub time_slot: TimeSlot,
    pub reason: String,
    pub symptoms: Option<String>,
    pub total_amount: f64,
    pub consultation: Consultation,
}

/// A physiotherapist's answer to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespondDecision {
    Confirmed,
    Rejected,
}

/// Listing filter for the query operations.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<AppointmentStatus>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// Pagination metadata returned alongside a listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

const DEFAULT_PAGE_LIMIT: usize = 10;

/// The lifecycle manager. Cheap to clone pieces are shared via `Arc`.
pub struct AppointmentLifecycle {
    appointments: Arc<Collection<Appointment>>,
    slots: SlotLedger,
    users: Arc<UserDirectory>,
    chat: Arc<ChatService>,
    notifier: Notifier,
    gateway: Arc<dyn PaymentGateway>,
    commission_rate: f64,
}

impl AppointmentLifecycle {
    pub fn new(
        cfg: &CoreConfig,
        users: Arc<UserDirectory>,
        chat: Arc<ChatService>,
        notifier: Notifier,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let appointments_dir = cfg.data_dir().join(APPOINTMENTS_DIR_NAME);
        Self {
            appointments: Arc::new(Collection::new(
                appointments_dir.clone(),
                APPOINTMENT_FILE_NAME,
                "Appointment",
            )),
            slots: SlotLedger::new(appointments_dir.join(SLOTS_DIR_NAME)),
            users,
            chat,
            notifier,
            gateway,
            commission_rate: cfg.commission_rate(),
        }
    }

    // ------------------------------------------------------------------
    // CreateRequest
    // ------------------------------------------------------------------

    /// Books a new appointment request.
    ///
    /// Preconditions: the caller is a patient; the target physiotherapist
    /// exists, holds that role and has passed admin verification; the slot is
    /// unclaimed. Payment is assumed captured upstream, so the new document
    /// carries `payment.status = paid`.
    pub fn create(&self, caller: &Caller, request: CreateRequest) -> BookingResult<Appointment> {
        if caller.role != Role::Patient {
            return Err(BookingError::Forbidden(
                "Only patients can book appointments".into(),
            ));
        }

        let reason = NonEmptyText::bounded(&request.reason, MAX_REASON_LEN)?;
        let symptoms = request
            .symptoms
            .as_deref()
            .map(|s| NonEmptyText::bounded(s, MAX_SYMPTOMS_LEN))
            .transpose()?;
        request.consultation.validate()?;

        let patient = self.users.find(&caller.id)?;

        let physio = match self.users.find(&request.physiotherapist) {
            Ok(user) if user.role == Role::Physiotherapist => user,
            Ok(_) | Err(BookingError::NotFound(_)) => {
                return Err(BookingError::NotFound("Physiotherapist"))
            }
            Err(e) => return Err(e),
        };
        if !physio.is_verified_provider() {
            return Err(BookingError::Unverified);
        }

        let amount = Amount::split(request.total_amount, self.commission_rate)?;

        let id = BookingUuid::new();
        let date_key = request.appointment_date.to_string();
        self.slots.claim(
            &request.physiotherapist,
            &date_key,
            &request.time_slot.start_time,
            &id,
        )?;

        let now = Utc::now();
        let appointment = Appointment {
            id: id.clone(),
            patient: caller.id.clone(),
            physiotherapist: request.physiotherapist.clone(),
            appointment_date: request.appointment_date,
            time_slot: request.time_slot.clone(),
            reason: reason.into_string(),
            symptoms: symptoms.map(NonEmptyText::into_string),
            status: AppointmentStatus::Pending,
            rejection_reason: None,
            amount,
            payment: PaymentInfo::pre_authorised(),
            consultation: request.consultation,
            prescriptions: vec![],
            exercises: vec![],
            follow_up: Default::default(),
            rating: Default::default(),
            notes: Default::default(),
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.appointments.insert(&id, &appointment) {
            if let Err(release_err) = self.slots.release(
                &request.physiotherapist,
                &date_key,
                &request.time_slot.start_time,
            ) {
                tracing::error!(
                    appointment = %id,
                    error = %release_err,
                    "failed to release slot claim after insert failure"
                );
            }
            return Err(e);
        }

        self.notifier.send_best_effort(
            EmailTemplate::AppointmentPending {
                patient_name: patient.name.clone(),
                physiotherapist_name: physio.name.clone(),
                appointment_date: date_key.clone(),
                time_slot: appointment.time_slot.display_range(),
                reason: appointment.reason.clone(),
                amount: amount.total,
            },
            &patient.email,
        );
        self.notifier.send_best_effort(
            EmailTemplate::AppointmentRequest {
                physiotherapist_name: physio.name.clone(),
                patient_name: patient.name.clone(),
                patient_phone: patient.phone.clone(),
                appointment_date: date_key,
                time_slot: appointment.time_slot.display_range(),
                reason: appointment.reason.clone(),
                symptoms: appointment.symptoms.clone().unwrap_or_default(),
                amount: amount.physiotherapist_amount,
            },
            &physio.email,
        );

        Ok(appointment)
    }

    // ------------------------------------------------------------------
    // RespondToRequest
    // ------------------------------------------------------------------

    /// Confirms or rejects a pending request.
    ///
    /// Only the assigned physiotherapist may respond, and only while the
    /// appointment is still pending; a second response attempt fails with
    /// `InvalidState` and leaves the document unchanged.
    pub fn respond(
        &self,
        caller: &Caller,
        appointment_id: &BookingUuid,
        decision: RespondDecision,
        rejection_reason: Option<String>,
    ) -> BookingResult<Appointment> {
        let rejection_reason = match decision {
            RespondDecision::Rejected => {
                let reason = rejection_reason.ok_or_else(|| {
                    BookingError::InvalidInput("Rejection reason is required".into())
                })?;
                Some(NonEmptyText::bounded(&reason, MAX_REJECTION_REASON_LEN)?.into_string())
            }
            RespondDecision::Confirmed => None,
        };

        let appointment = self.appointments.update_where(appointment_id, |appt| {
            if !can_act(caller, appt, AppointmentAction::Respond) {
                return Err(BookingError::Forbidden(
                    "You can only respond to your own appointment requests".into(),
                ));
            }
            if appt.status != AppointmentStatus::Pending {
                return Err(BookingError::InvalidState(
                    "This appointment has already been responded to".into(),
                ));
            }

            appt.status = match decision {
                RespondDecision::Confirmed => AppointmentStatus::Confirmed,
                RespondDecision::Rejected => AppointmentStatus::Rejected,
            };
            if decision == RespondDecision::Rejected {
                appt.rejection_reason = rejection_reason.clone();
                if appt.payment.status == PaymentStatus::Paid {
                    appt.payment.refund_status = RefundStatus::Pending;
                }
            }
            appt.updated_at = Utc::now();
            Ok(appt.clone())
        })?;

        match decision {
            RespondDecision::Confirmed => {
                self.chat.create_thread(
                    appointment_id,
                    [appointment.patient.clone(), appointment.physiotherapist.clone()],
                )?;

                if let Some((patient, physio)) = self.parties_for_notification(&appointment) {
                    self.notifier.send_best_effort(
                        EmailTemplate::AppointmentConfirmed {
                            patient_name: patient.name.clone(),
                            physiotherapist_name: physio.name.clone(),
                            physiotherapist_phone: physio.phone.clone(),
                            appointment_date: appointment.appointment_date.to_string(),
                            time_slot: appointment.time_slot.display_range(),
                            reason: appointment.reason.clone(),
                        },
                        &patient.email,
                    );
                }
            }
            RespondDecision::Rejected => {
                self.release_slot(&appointment);
                if appointment.payment.refund_status == RefundStatus::Pending {
                    self.issue_refund_best_effort(appointment_id.clone());
                }

                // The rejection email goes out regardless of how the refund
                // attempt ends.
                if let Some((patient, physio)) = self.parties_for_notification(&appointment) {
                    self.notifier.send_best_effort(
                        EmailTemplate::AppointmentRejected {
                            patient_name: patient.name.clone(),
                            physiotherapist_name: physio.name.clone(),
                            rejection_reason: appointment
                                .rejection_reason
                                .clone()
                                .unwrap_or_default(),
                            refund_amount: appointment.amount.total,
                        },
                        &patient.email,
                    );
                }
            }
        }

        Ok(appointment)
    }

    // ------------------------------------------------------------------
    // UpdateProgress
    // ------------------------------------------------------------------

    /// Moves a confirmed appointment through its delivery states.
    ///
    /// Accepts only `in-progress`, `completed` or `cancelled`, and the move
    /// must be legal per the status transition table; terminal states reject
    /// with `InvalidState`. Cancelling through this path behaves like
    /// [`AppointmentLifecycle::cancel`].
    pub fn update_progress(
        &self,
        caller: &Caller,
        appointment_id: &BookingUuid,
        new_status: AppointmentStatus,
    ) -> BookingResult<Appointment> {
        if !matches!(
            new_status,
            AppointmentStatus::InProgress
                | AppointmentStatus::Completed
                | AppointmentStatus::Cancelled
        ) {
            return Err(BookingError::InvalidInput("Invalid status".into()));
        }

        let (appointment, held_slot) = self.appointments.update_where(appointment_id, |appt| {
            if !can_act(caller, appt, AppointmentAction::UpdateProgress) {
                return Err(BookingError::Forbidden(
                    "You do not have permission to update this appointment".into(),
                ));
            }
            if !appt.status.can_transition_to(new_status) {
                return Err(BookingError::InvalidState(format!(
                    "cannot move appointment from {} to {}",
                    appt.status, new_status
                )));
            }

            let held_slot = appt.status.holds_slot();
            appt.status = new_status;
            if new_status == AppointmentStatus::Cancelled
                && appt.payment.status == PaymentStatus::Paid
            {
                appt.payment.refund_status = RefundStatus::Pending;
            }
            appt.updated_at = Utc::now();
            Ok((appt.clone(), held_slot))
        })?;

        if held_slot && !appointment.status.holds_slot() {
            self.release_slot(&appointment);
        }

        if appointment.status == AppointmentStatus::Cancelled {
            self.after_cancellation(&appointment);
        }

        Ok(appointment)
    }

    // ------------------------------------------------------------------
    // Cancel
    // ------------------------------------------------------------------

    /// Cancels a pending or confirmed appointment.
    ///
    /// If payment was captured, a best-effort refund is issued; its outcome
    /// never blocks the cancellation itself.
    pub fn cancel(
        &self,
        caller: &Caller,
        appointment_id: &BookingUuid,
    ) -> BookingResult<Appointment> {
        let appointment = self.appointments.update_where(appointment_id, |appt| {
            if !can_act(caller, appt, AppointmentAction::Cancel) {
                return Err(BookingError::Forbidden(
                    "You do not have permission to cancel this appointment".into(),
                ));
            }
            if !appt.status.holds_slot() {
                return Err(BookingError::InvalidState(
                    "This appointment cannot be cancelled".into(),
                ));
            }

            appt.status = AppointmentStatus::Cancelled;
            if appt.payment.status == PaymentStatus::Paid {
                appt.payment.refund_status = RefundStatus::Pending;
            }
            appt.updated_at = Utc::now();
            Ok(appt.clone())
        })?;

        self.release_slot(&appointment);
        self.after_cancellation(&appointment);

        Ok(appointment)
    }

    // ------------------------------------------------------------------
    // RateAppointment
    // ------------------------------------------------------------------

    /// Records a party's rating of the other, exactly once per party.
    ///
    /// A patient rating additionally folds into the physiotherapist's running
    /// average.
    pub fn rate(
        &self,
        caller: &Caller,
        appointment_id: &BookingUuid,
        rating: u8,
        review: Option<String>,
    ) -> BookingResult<Appointment> {
        if !(1..=5).contains(&rating) {
            return Err(BookingError::InvalidInput(
                "Please provide a rating between 1 and 5".into(),
            ));
        }

        let (appointment, rated_by_patient) =
            self.appointments.update_where(appointment_id, |appt| {
                if !can_act(caller, appt, AppointmentAction::Rate) {
                    return Err(BookingError::Forbidden(
                        "You do not have permission to rate this appointment".into(),
                    ));
                }
                if appt.status != AppointmentStatus::Completed {
                    return Err(BookingError::InvalidState(
                        "You can only rate completed appointments".into(),
                    ));
                }

                let entry = RatingEntry {
                    rating,
                    review: review.clone().unwrap_or_default(),
                    rated_at: Utc::now(),
                };

                let rated_by_patient = if caller.id == appt.patient {
                    if appt.rating.patient_rating.is_some() {
                        return Err(BookingError::InvalidState(
                            "You have already rated this appointment".into(),
                        ));
                    }
                    appt.rating.patient_rating = Some(entry);
                    true
                } else {
                    if appt.rating.physiotherapist_rating.is_some() {
                        return Err(BookingError::InvalidState(
                            "You have already rated this appointment".into(),
                        ));
                    }
                    appt.rating.physiotherapist_rating = Some(entry);
                    false
                };

                appt.updated_at = Utc::now();
                Ok((appt.clone(), rated_by_patient))
            })?;

        if rated_by_patient {
            // Same best-effort stance as the other side effects: a failed
            // aggregate update never undoes the stored rating.
            if let Err(e) = self
                .users
                .record_provider_rating(&appointment.physiotherapist, rating)
            {
                tracing::warn!(
                    physiotherapist = %appointment.physiotherapist,
                    error = %e,
                    "failed to update provider rating aggregate"
                );
            }
        }

        Ok(appointment)
    }

    // ------------------------------------------------------------------
    // UpdateNotes
    // ------------------------------------------------------------------

    /// Writes the caller's own notes field, chosen by session role.
    pub fn update_notes(
        &self,
        caller: &Caller,
        appointment_id: &BookingUuid,
        notes: String,
    ) -> BookingResult<Appointment> {
        self.appointments.update_where(appointment_id, |appt| {
            if !can_act(caller, appt, AppointmentAction::WriteNotes) {
                return Err(BookingError::Forbidden(
                    "You do not have permission to update this appointment".into(),
                ));
            }

            match caller.role {
                Role::Patient => appt.notes.patient_notes = Some(notes.clone()),
                Role::Physiotherapist => appt.notes.physiotherapist_notes = Some(notes.clone()),
                Role::Admin => appt.notes.admin_notes = Some(notes.clone()),
            }
            appt.updated_at = Utc::now();
            Ok(appt.clone())
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Fetches one appointment for a party or admin.
    pub fn get(&self, caller: &Caller, appointment_id: &BookingUuid) -> BookingResult<Appointment> {
        let appointment = self.appointments.get(appointment_id)?;
        if !can_act(caller, &appointment, AppointmentAction::View) {
            return Err(BookingError::Forbidden(
                "You do not have access to this appointment".into(),
            ));
        }
        Ok(appointment)
    }

    /// Role-filtered listing with status filter and pagination.
    ///
    /// Patients see their bookings, physiotherapists their assignments,
    /// admins everything. Newest first.
    pub fn list(
        &self,
        caller: &Caller,
        filter: &ListFilter,
    ) -> BookingResult<(Vec<Appointment>, Pagination)> {
        let mut appointments: Vec<_> = self
            .appointments
            .list()
            .into_iter()
            .filter(|appt| match caller.role {
                Role::Patient => appt.patient == caller.id,
                Role::Physiotherapist => appt.physiotherapist == caller.id,
                Role::Admin => true,
            })
            .filter(|appt| filter.status.map_or(true, |status| appt.status == status))
            .collect();
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total_items = appointments.len();
        let limit = filter.limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(1);
        let page = filter.page.unwrap_or(1).max(1);
        let total_pages = total_items.div_ceil(limit);

        let page_items = appointments
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .collect();

        Ok((
            page_items,
            Pagination {
                current_page: page,
                total_pages,
                total_items,
            },
        ))
    }

    /// Every appointment the caller participates in, either side, newest
    /// first.
    pub fn my_appointments(
        &self,
        caller: &Caller,
        status: Option<AppointmentStatus>,
    ) -> Vec<Appointment> {
        let mut appointments: Vec<_> = self
            .appointments
            .list()
            .into_iter()
            .filter(|appt| appt.is_party(&caller.id))
            .filter(|appt| status.map_or(true, |s| appt.status == s))
            .collect();
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        appointments
    }

    /// Pending requests assigned to a physiotherapist, newest first.
    pub fn pending_requests(&self, caller: &Caller) -> BookingResult<Vec<Appointment>> {
        if caller.role != Role::Physiotherapist {
            return Err(BookingError::Forbidden(
                "Only physiotherapists can list appointment requests".into(),
            ));
        }

        let mut appointments: Vec<_> = self
            .appointments
            .list()
            .into_iter()
            .filter(|appt| {
                appt.physiotherapist == caller.id && appt.status == AppointmentStatus::Pending
            })
            .collect();
        appointments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(appointments)
    }

    // ------------------------------------------------------------------
    // Side-effect plumbing
    // ------------------------------------------------------------------

    fn release_slot(&self, appointment: &Appointment) {
        if let Err(e) = self.slots.release(
            &appointment.physiotherapist,
            &appointment.appointment_date.to_string(),
            &appointment.time_slot.start_time,
        ) {
            tracing::error!(
                appointment = %appointment.id,
                error = %e,
                "failed to release slot claim"
            );
        }
    }

    /// Refund + cancellation notices, after the cancelled transition landed.
    fn after_cancellation(&self, appointment: &Appointment) {
        if appointment.payment.refund_status == RefundStatus::Pending {
            self.issue_refund_best_effort(appointment.id.clone());
        }

        if let Some((patient, physio)) = self.parties_for_notification(appointment) {
            let date = appointment.appointment_date.to_string();
            let slot = appointment.time_slot.display_range();

            self.notifier.send_best_effort(
                EmailTemplate::AppointmentCancelled {
                    recipient_name: patient.name.clone(),
                    counterpart_name: physio.name.clone(),
                    appointment_date: date.clone(),
                    time_slot: slot.clone(),
                },
                &patient.email,
            );
            self.notifier.send_best_effort(
                EmailTemplate::AppointmentCancelled {
                    recipient_name: physio.name,
                    counterpart_name: patient.name,
                    appointment_date: date,
                    time_slot: slot,
                },
                &physio.email,
            );
        }
    }

    /// Issues a refund decoupled from the request cycle.
    ///
    /// The task re-reads the appointment, calls the gateway and records the
    /// outcome in the payment sub-record: `refunded`/`processed` on success,
    /// `failed` on a gateway error.
    fn issue_refund_best_effort(&self, appointment_id: BookingUuid) {
        let appointments = self.appointments.clone();
        let gateway = self.gateway.clone();

        notify::run_best_effort("refund", move || {
            let appointment = appointments.get(&appointment_id)?;

            match gateway.process_refund(&appointment) {
                Ok(receipt) => appointments.update_where(&appointment_id, |appt| {
                    appt.payment.status = PaymentStatus::Refunded;
                    appt.payment.refund_id = Some(receipt.refund_id.clone());
                    appt.payment.refund_amount = Some(receipt.amount);
                    appt.payment.refund_status = RefundStatus::Processed;
                    appt.updated_at = Utc::now();
                    Ok(())
                }),
                Err(e) => {
                    appointments.update_where(&appointment_id, |appt| {
                        appt.payment.refund_status = RefundStatus::Failed;
                        appt.updated_at = Utc::now();
                        Ok(())
                    })?;
                    Err(e.into())
                }
            }
        });
    }

    /// Both parties' user documents, or `None` (with a log line) if either
    /// lookup fails; notifications are skipped rather than failing the
    /// operation.
    fn parties_for_notification(&self, appointment: &Appointment) -> Option<(User, User)> {
        match (
            self.users.find(&appointment.patient),
            self.users.find(&appointment.physiotherapist),
        ) {
            (Ok(patient), Ok(physio)) => Some((patient, physio)),
            (patient, physio) => {
                tracing::warn!(
                    appointment = %appointment.id,
                    patient_found = patient.is_ok(),
                    physio_found = physio.is_ok(),
                    "skipping notification, party lookup failed"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointments::ConsultationMode;
    use crate::payments::{FailingGateway, StubGateway};
    use crate::users::testing::sample_user;
    use crate::users::VerificationStatus;
    use physio_email::MemoryMailer;
    use tempfile::TempDir;

    struct Harness {
        _temp: TempDir,
        users: Arc<UserDirectory>,
        chat: Arc<ChatService>,
        mailer: Arc<MemoryMailer>,
        lifecycle: AppointmentLifecycle,
        patient: User,
        physio: User,
    }

    fn harness_with_gateway(gateway: Arc<dyn PaymentGateway>) -> Harness {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let cfg = CoreConfig::new(
            temp.path().to_path_buf(),
            None,
            "https://physio.example".into(),
        )
        .expect("config should build");

        let users = Arc::new(UserDirectory::new(&cfg));
        let chat = Arc::new(ChatService::new(&cfg));
        let mailer = Arc::new(MemoryMailer::new());
        let notifier = Notifier::new(mailer.clone());
        let lifecycle =
            AppointmentLifecycle::new(&cfg, users.clone(), chat.clone(), notifier, gateway);

        let patient = sample_user(Role::Patient);
        users.create(&patient).expect("patient should persist");
        let physio = sample_user(Role::Physiotherapist);
        users.create(&physio).expect("physio should persist");

        Harness {
            _temp: temp,
            users,
            chat,
            mailer,
            lifecycle,
            patient,
            physio,
        }
    }

    fn harness() -> Harness {
        harness_with_gateway(Arc::new(StubGateway::new()))
    }

    fn caller(user: &User) -> Caller {
        Caller::new(user.id.clone(), user.role)
    }

    fn request(physio: &User) -> CreateRequest {
        CreateRequest {
            physiotherapist: physio.id.clone(),
            appointment_date: NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date"),
            time_slot: TimeSlot::new("10:00", "11:00").expect("valid slot"),
            reason: "Post-surgery knee rehabilitation".into(),
            symptoms: Some("Stiffness and swelling".into()),
            total_amount: 1000.0,
            consultation: Consultation {
                mode: ConsultationMode::Clinic,
                address: None,
                video_call_link: None,
                video_call_scheduled: None,
            },
        }
    }

    fn book(h: &Harness) -> Appointment {
        h.lifecycle
            .create(&caller(&h.patient), request(&h.physio))
            .expect("booking should succeed")
    }

    fn confirm(h: &Harness, appointment: &Appointment) -> Appointment {
        h.lifecycle
            .respond(
                &caller(&h.physio),
                &appointment.id,
                RespondDecision::Confirmed,
                None,
            )
            .expect("confirmation should succeed")
    }

    fn complete(h: &Harness, appointment: &Appointment) -> Appointment {
        confirm(h, appointment);
        h.lifecycle
            .update_progress(
                &caller(&h.physio),
                &appointment.id,
                AppointmentStatus::Completed,
            )
            .expect("completion should succeed")
    }

    // ------------------------------------------------------------------
    // CreateRequest
    // ------------------------------------------------------------------

    #[test]
    fn test_create_splits_amount_and_notifies_both_parties() {
        let h = harness();
        let appointment = book(&h);

        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(appointment.amount.total, 1000.0);
        assert_eq!(appointment.amount.platform_fee, 200.0);
        assert_eq!(appointment.amount.physiotherapist_amount, 800.0);
        assert_eq!(appointment.payment.status, PaymentStatus::Paid);

        let patient_mail = h.mailer.sent_to(h.patient.email.as_str());
        assert_eq!(patient_mail.len(), 1);
        assert_eq!(patient_mail[0].template, "appointment_pending");

        let physio_mail = h.mailer.sent_to(h.physio.email.as_str());
        assert_eq!(physio_mail.len(), 1);
        assert_eq!(physio_mail[0].template, "appointment_request");
    }

    #[test]
    fn test_create_rejects_unverified_physio_and_persists_nothing() {
        let h = harness();

        let mut pending_physio = sample_user(Role::Physiotherapist);
        pending_physio
            .provider
            .as_mut()
            .expect("provider profile")
            .verification_status = VerificationStatus::Pending;
        h.users
            .create(&pending_physio)
            .expect("physio should persist");

        let err = h
            .lifecycle
            .create(&caller(&h.patient), request(&pending_physio))
            .expect_err("unverified physio should fail");
        assert!(matches!(err, BookingError::Unverified));

        assert!(
            h.lifecycle
                .my_appointments(&caller(&h.patient), None)
                .is_empty(),
            "no appointment should be persisted"
        );
        assert!(h.mailer.sent().is_empty(), "no email should go out");
    }

    #[test]
    fn test_create_rejects_missing_or_wrong_role_target() {
        let h = harness();

        let mut req = request(&h.physio);
        req.physiotherapist = BookingUuid::new();
        let err = h
            .lifecycle
            .create(&caller(&h.patient), req)
            .expect_err("unknown target should fail");
        assert!(matches!(err, BookingError::NotFound("Physiotherapist")));

        let other_patient = sample_user(Role::Patient);
        h.users
            .create(&other_patient)
            .expect("patient should persist");
        let mut req = request(&h.physio);
        req.physiotherapist = other_patient.id.clone();
        let err = h
            .lifecycle
            .create(&caller(&h.patient), req)
            .expect_err("non-physio target should fail");
        assert!(matches!(err, BookingError::NotFound("Physiotherapist")));
    }

    #[test]
    fn test_create_is_patient_only() {
        let h = harness();
        let err = h
            .lifecycle
            .create(&caller(&h.physio), request(&h.physio))
            .expect_err("physios do not book appointments");
        assert!(matches!(err, BookingError::Forbidden(_)));
    }

    #[test]
    fn test_create_conflicting_slot_admits_one_winner() {
        let h = harness();
        book(&h);

        let other_patient = sample_user(Role::Patient);
        h.users
            .create(&other_patient)
            .expect("patient should persist");

        let err = h
            .lifecycle
            .create(&caller(&other_patient), request(&h.physio))
            .expect_err("same slot should conflict");
        assert!(matches!(err, BookingError::SlotConflict));

        // A different start time books fine.
        let mut req = request(&h.physio);
        req.time_slot = TimeSlot::new("12:00", "13:00").expect("valid slot");
        h.lifecycle
            .create(&caller(&other_patient), req)
            .expect("different slot should book");
    }

    // ------------------------------------------------------------------
    // RespondToRequest
    // ------------------------------------------------------------------

    #[test]
    fn test_confirm_creates_chat_thread_and_notifies_patient() {
        let h = harness();
        let appointment = book(&h);

        let confirmed = confirm(&h, &appointment);
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

        let thread = h
            .chat
            .thread_for(&caller(&h.patient), &appointment.id)
            .expect("thread should exist after confirmation");
        assert!(thread.is_participant(&h.patient.id));
        assert!(thread.is_participant(&h.physio.id));

        let patient_mail = h.mailer.sent_to(h.patient.email.as_str());
        assert_eq!(
            patient_mail.last().expect("confirmation email").template,
            "appointment_confirmed"
        );
    }

    #[test]
    fn test_second_response_fails_and_leaves_state_unchanged() {
        let h = harness();
        let appointment = book(&h);
        confirm(&h, &appointment);

        let err = h
            .lifecycle
            .respond(
                &caller(&h.physio),
                &appointment.id,
                RespondDecision::Rejected,
                Some("double booked".into()),
            )
            .expect_err("second response should fail");
        assert!(matches!(err, BookingError::InvalidState(_)));

        let stored = h
            .lifecycle
            .get(&caller(&h.physio), &appointment.id)
            .expect("fetch should succeed");
        assert_eq!(stored.status, AppointmentStatus::Confirmed);
        assert!(stored.rejection_reason.is_none());
    }

    #[test]
    fn test_respond_requires_assigned_physio() {
        let h = harness();
        let appointment = book(&h);

        let other_physio = sample_user(Role::Physiotherapist);
        h.users
            .create(&other_physio)
            .expect("physio should persist");

        let err = h
            .lifecycle
            .respond(
                &caller(&other_physio),
                &appointment.id,
                RespondDecision::Confirmed,
                None,
            )
            .expect_err("unassigned physio should be rejected");
        assert!(matches!(err, BookingError::Forbidden(_)));
    }

    #[test]
    fn test_reject_requires_reason() {
        let h = harness();
        let appointment = book(&h);

        let err = h
            .lifecycle
            .respond(
                &caller(&h.physio),
                &appointment.id,
                RespondDecision::Rejected,
                None,
            )
            .expect_err("rejection without reason should fail");
        assert!(matches!(err, BookingError::InvalidInput(_)));
    }

    #[test]
    fn test_reject_refunds_frees_slot_and_emails_patient() {
        let h = harness();
        let appointment = book(&h);

        let rejected = h
            .lifecycle
            .respond(
                &caller(&h.physio),
                &appointment.id,
                RespondDecision::Rejected,
                Some("unavailable".into()),
            )
            .expect("rejection should succeed");
        assert_eq!(rejected.status, AppointmentStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("unavailable"));

        let stored = h
            .lifecycle
            .get(&caller(&h.physio), &appointment.id)
            .expect("fetch should succeed");
        assert_eq!(stored.payment.status, PaymentStatus::Refunded);
        assert_eq!(stored.payment.refund_status, RefundStatus::Processed);
        assert!(stored.payment.refund_id.is_some());
        assert_eq!(stored.payment.refund_amount, Some(1000.0));

        let patient_mail = h.mailer.sent_to(h.patient.email.as_str());
        assert_eq!(
            patient_mail.last().expect("rejection email").template,
            "appointment_rejected"
        );

        // The slot is free again.
        let other_patient = sample_user(Role::Patient);
        h.users
            .create(&other_patient)
            .expect("patient should persist");
        h.lifecycle
            .create(&caller(&other_patient), request(&h.physio))
            .expect("released slot should book again");
    }

    #[test]
    fn test_reject_with_failing_gateway_still_emails_patient() {
        let h = harness_with_gateway(Arc::new(FailingGateway));
        let appointment = book(&h);

        h.lifecycle
            .respond(
                &caller(&h.physio),
                &appointment.id,
                RespondDecision::Rejected,
                Some("unavailable".into()),
            )
            .expect("rejection should succeed despite refund failure");

        let stored = h
            .lifecycle
            .get(&caller(&h.physio), &appointment.id)
            .expect("fetch should succeed");
        assert_eq!(stored.status, AppointmentStatus::Rejected);
        assert_eq!(stored.payment.refund_status, RefundStatus::Failed);
        assert_eq!(
            stored.payment.status,
            PaymentStatus::Paid,
            "payment stays captured when the gateway fails"
        );

        let patient_mail = h.mailer.sent_to(h.patient.email.as_str());
        assert_eq!(
            patient_mail.last().expect("rejection email").template,
            "appointment_rejected",
            "the rejection email goes out regardless of refund outcome"
        );
    }

    // ------------------------------------------------------------------
    // UpdateProgress
    // ------------------------------------------------------------------

    #[test]
    fn test_progress_walks_the_status_graph() {
        let h = harness();
        let appointment = book(&h);
        confirm(&h, &appointment);

        let in_progress = h
            .lifecycle
            .update_progress(
                &caller(&h.physio),
                &appointment.id,
                AppointmentStatus::InProgress,
            )
            .expect("in-progress should succeed");
        assert_eq!(in_progress.status, AppointmentStatus::InProgress);

        let completed = h
            .lifecycle
            .update_progress(
                &caller(&h.physio),
                &appointment.id,
                AppointmentStatus::Completed,
            )
            .expect("completion should succeed");
        assert_eq!(completed.status, AppointmentStatus::Completed);

        // Terminal: no further moves.
        let err = h
            .lifecycle
            .update_progress(
                &caller(&h.physio),
                &appointment.id,
                AppointmentStatus::Cancelled,
            )
            .expect_err("completed is terminal");
        assert!(matches!(err, BookingError::InvalidState(_)));
    }

    #[test]
    fn test_progress_rejects_illegal_transition_and_statuses() {
        let h = harness();
        let appointment = book(&h);

        // pending -> in-progress skips confirmation.
        let err = h
            .lifecycle
            .update_progress(
                &caller(&h.physio),
                &appointment.id,
                AppointmentStatus::InProgress,
            )
            .expect_err("pending cannot start");
        assert!(matches!(err, BookingError::InvalidState(_)));

        // Statuses outside the progress set are rejected outright.
        let err = h
            .lifecycle
            .update_progress(
                &caller(&h.physio),
                &appointment.id,
                AppointmentStatus::Confirmed,
            )
            .expect_err("confirmed is not a progress status");
        assert!(matches!(err, BookingError::InvalidInput(_)));
    }

    #[test]
    fn test_progress_requires_party_or_admin() {
        let h = harness();
        let appointment = book(&h);
        confirm(&h, &appointment);

        let stranger = sample_user(Role::Patient);
        h.users.create(&stranger).expect("user should persist");

        let err = h
            .lifecycle
            .update_progress(
                &caller(&stranger),
                &appointment.id,
                AppointmentStatus::Completed,
            )
            .expect_err("strangers cannot update progress");
        assert!(matches!(err, BookingError::Forbidden(_)));

        let admin = sample_user(Role::Admin);
        h.users.create(&admin).expect("admin should persist");
        h.lifecycle
            .update_progress(
                &caller(&admin),
                &appointment.id,
                AppointmentStatus::Completed,
            )
            .expect("admins can update progress");
    }

    // ------------------------------------------------------------------
    // Cancel
    // ------------------------------------------------------------------

    #[test]
    fn test_cancel_refunds_paid_appointment() {
        let h = harness();
        let appointment = book(&h);

        let cancelled = h
            .lifecycle
            .cancel(&caller(&h.patient), &appointment.id)
            .expect("cancel should succeed");
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        let stored = h
            .lifecycle
            .get(&caller(&h.patient), &appointment.id)
            .expect("fetch should succeed");
        assert_eq!(stored.payment.status, PaymentStatus::Refunded);
        assert_eq!(stored.payment.refund_status, RefundStatus::Processed);
    }

    #[test]
    fn test_cancel_completed_appointment_fails() {
        let h = harness();
        let appointment = book(&h);
        complete(&h, &appointment);

        let err = h
            .lifecycle
            .cancel(&caller(&h.patient), &appointment.id)
            .expect_err("completed appointments cannot be cancelled");
        assert!(matches!(err, BookingError::InvalidState(_)));

        let stored = h
            .lifecycle
            .get(&caller(&h.patient), &appointment.id)
            .expect("fetch should succeed");
        assert_eq!(stored.status, AppointmentStatus::Completed);
    }

    // ------------------------------------------------------------------
    // RateAppointment
    // ------------------------------------------------------------------

    #[test]
    fn test_patient_rating_updates_provider_average() {
        let h = harness();

        // Seed the provider with an existing average of 4.0 over 3 ratings.
        h.users
            .update_where(&h.physio.id, |user| {
                user.provider.as_mut().expect("provider profile").rating =
                    crate::users::ProviderRating {
                        average: 4.0,
                        count: 3,
                    };
                Ok(())
            })
            .expect("seeding should succeed");

        let appointment = book(&h);
        complete(&h, &appointment);

        let rated = h
            .lifecycle
            .rate(
                &caller(&h.patient),
                &appointment.id,
                5,
                Some("Excellent care".into()),
            )
            .expect("rating should succeed");
        let entry = rated.rating.patient_rating.expect("rating entry");
        assert_eq!(entry.rating, 5);
        assert_eq!(entry.review, "Excellent care");

        let provider = h.users.find(&h.physio.id).expect("physio should exist");
        let rating = provider.provider.expect("provider profile").rating;
        assert_eq!(rating.average, 4.25, "(4.0*3 + 5) / 4 = 4.25");
        assert_eq!(rating.count, 4);
    }

    #[test]
    fn test_rating_twice_fails_and_preserves_first_value() {
        let h = harness();
        let appointment = book(&h);
        complete(&h, &appointment);

        h.lifecycle
            .rate(&caller(&h.patient), &appointment.id, 5, None)
            .expect("first rating should succeed");

        let err = h
            .lifecycle
            .rate(&caller(&h.patient), &appointment.id, 1, None)
            .expect_err("second rating should fail");
        assert!(matches!(err, BookingError::InvalidState(_)));

        let stored = h
            .lifecycle
            .get(&caller(&h.patient), &appointment.id)
            .expect("fetch should succeed");
        assert_eq!(
            stored.rating.patient_rating.expect("rating entry").rating,
            5,
            "first rating value is preserved"
        );
    }

    #[test]
    fn test_both_parties_rate_independently() {
        let h = harness();
        let appointment = book(&h);
        complete(&h, &appointment);

        h.lifecycle
            .rate(&caller(&h.patient), &appointment.id, 5, None)
            .expect("patient rating should succeed");
        h.lifecycle
            .rate(&caller(&h.physio), &appointment.id, 4, None)
            .expect("physio rating should succeed");

        let stored = h
            .lifecycle
            .get(&caller(&h.patient), &appointment.id)
            .expect("fetch should succeed");
        assert_eq!(stored.rating.patient_rating.expect("entry").rating, 5);
        assert_eq!(
            stored.rating.physiotherapist_rating.expect("entry").rating,
            4
        );
    }

    #[test]
    fn test_rating_requires_completed_status_and_valid_value() {
        let h = harness();
        let appointment = book(&h);

        let err = h
            .lifecycle
            .rate(&caller(&h.patient), &appointment.id, 5, None)
            .expect_err("pending appointments cannot be rated");
        assert!(matches!(err, BookingError::InvalidState(_)));

        for bad in [0, 6] {
            let err = h
                .lifecycle
                .rate(&caller(&h.patient), &appointment.id, bad, None)
                .expect_err("out-of-range ratings should fail");
            assert!(matches!(err, BookingError::InvalidInput(_)));
        }
    }

    // ------------------------------------------------------------------
    // UpdateNotes
    // ------------------------------------------------------------------

    #[test]
    fn test_each_party_writes_its_own_notes_field() {
        let h = harness();
        let appointment = book(&h);

        h.lifecycle
            .update_notes(
                &caller(&h.patient),
                &appointment.id,
                "Bring previous scan reports".into(),
            )
            .expect("patient notes should write");
        h.lifecycle
            .update_notes(
                &caller(&h.physio),
                &appointment.id,
                "Check knee mobility first".into(),
            )
            .expect("physio notes should write");

        let stored = h
            .lifecycle
            .get(&caller(&h.patient), &appointment.id)
            .expect("fetch should succeed");
        assert_eq!(
            stored.notes.patient_notes.as_deref(),
            Some("Bring previous scan reports")
        );
        assert_eq!(
            stored.notes.physiotherapist_notes.as_deref(),
            Some("Check knee mobility first")
        );

        let stranger = sample_user(Role::Patient);
        h.users.create(&stranger).expect("user should persist");
        let err = h
            .lifecycle
            .update_notes(&caller(&stranger), &appointment.id, "hi".into())
            .expect_err("strangers cannot write notes");
        assert!(matches!(err, BookingError::Forbidden(_)));
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    #[test]
    fn test_get_enforces_view_policy() {
        let h = harness();
        let appointment = book(&h);

        let stranger = sample_user(Role::Patient);
        h.users.create(&stranger).expect("user should persist");

        let err = h
            .lifecycle
            .get(&caller(&stranger), &appointment.id)
            .expect_err("strangers cannot view");
        assert!(matches!(err, BookingError::Forbidden(_)));

        let err = h
            .lifecycle
            .get(&caller(&h.patient), &BookingUuid::new())
            .expect_err("unknown id should be NotFound");
        assert!(matches!(err, BookingError::NotFound("Appointment")));
    }

    #[test]
    fn test_list_filters_by_role_status_and_paginates() {
        let h = harness();
        let first = book(&h);

        let mut req = request(&h.physio);
        req.time_slot = TimeSlot::new("12:00", "13:00").expect("valid slot");
        h.lifecycle
            .create(&caller(&h.patient), req)
            .expect("second booking should succeed");

        confirm(&h, &first);

        let (all, pagination) = h
            .lifecycle
            .list(&caller(&h.patient), &ListFilter::default())
            .expect("listing should succeed");
        assert_eq!(all.len(), 2);
        assert_eq!(pagination.total_items, 2);
        assert_eq!(pagination.total_pages, 1);

        let (confirmed_only, _) = h
            .lifecycle
            .list(
                &caller(&h.patient),
                &ListFilter {
                    status: Some(AppointmentStatus::Confirmed),
                    ..Default::default()
                },
            )
            .expect("listing should succeed");
        assert_eq!(confirmed_only.len(), 1);
        assert_eq!(confirmed_only[0].id, first.id);

        let (page, pagination) = h
            .lifecycle
            .list(
                &caller(&h.patient),
                &ListFilter {
                    status: None,
                    page: Some(2),
                    limit: Some(1),
                },
            )
            .expect("listing should succeed");
        assert_eq!(page.len(), 1);
        assert_eq!(pagination.current_page, 2);
        assert_eq!(pagination.total_pages, 2);

        let other_patient = sample_user(Role::Patient);
        h.users
            .create(&other_patient)
            .expect("user should persist");
        let (none, _) = h
            .lifecycle
            .list(&caller(&other_patient), &ListFilter::default())
            .expect("listing should succeed");
        assert!(none.is_empty(), "listings are scoped to the caller");
    }

    #[test]
    fn test_pending_requests_lists_only_pending_for_assigned_physio() {
        let h = harness();
        let first = book(&h);

        let mut req = request(&h.physio);
        req.time_slot = TimeSlot::new("12:00", "13:00").expect("valid slot");
        let second = h
            .lifecycle
            .create(&caller(&h.patient), req)
            .expect("second booking should succeed");

        confirm(&h, &first);

        let pending = h
            .lifecycle
            .pending_requests(&caller(&h.physio))
            .expect("physio can list requests");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);

        let err = h
            .lifecycle
            .pending_requests(&caller(&h.patient))
            .expect_err("patients cannot list physio requests");
        assert!(matches!(err, BookingError::Forbidden(_)));
    }
}
