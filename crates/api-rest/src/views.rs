//! Conversions from core documents to wire views.

use api_shared::appointments::{
    AddressDto, AmountDto, AppointmentRatingsDto, AppointmentView, ConsultationDto, NotesDto,
    PaginationDto, PaymentDto, RatingEntryDto, TimeSlotDto,
};
use api_shared::auth::UserView;
use api_shared::chat::{ChatMessageDto, ChatThreadView, LastMessageDto};
use physio_core::appointments::{
    Appointment, ConsultationMode, PaymentStatus, RatingEntry, RefundStatus,
};
use physio_core::chat::{ChatMessage, ChatThread, MessageType};
use physio_core::lifecycle::Pagination;
use physio_core::users::{Role, User, VerificationStatus};

pub fn role_str(role: Role) -> &'static str {
    match role {
        Role::Patient => "patient",
        Role::Physiotherapist => "physiotherapist",
        Role::Admin => "admin",
    }
}

pub fn verification_str(status: VerificationStatus) -> &'static str {
    match status {
        VerificationStatus::Pending => "pending",
        VerificationStatus::Verified => "verified",
        VerificationStatus::Rejected => "rejected",
    }
}

fn payment_status_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Paid => "paid",
        PaymentStatus::Failed => "failed",
        PaymentStatus::Refunded => "refunded",
        PaymentStatus::PartiallyRefunded => "partially_refunded",
    }
}

fn refund_status_str(status: RefundStatus) -> &'static str {
    match status {
        RefundStatus::None => "none",
        RefundStatus::Pending => "pending",
        RefundStatus::Processed => "processed",
        RefundStatus::Failed => "failed",
    }
}

pub fn consultation_mode_str(mode: ConsultationMode) -> &'static str {
    match mode {
        ConsultationMode::HomeVisit => "home-visit",
        ConsultationMode::VideoCall => "video-call",
        ConsultationMode::Clinic => "clinic",
    }
}

fn message_type_str(message_type: MessageType) -> &'static str {
    match message_type {
        MessageType::Text => "text",
        MessageType::Image => "image",
        MessageType::File => "file",
        MessageType::VideoCallLink => "video-call-link",
    }
}

pub fn user_view(user: &User) -> UserView {
    let provider = user.provider.as_ref();
    UserView {
        id: user.id.to_string(),
        name: user.name.clone(),
        email: user.email.to_string(),
        phone: user.phone.clone(),
        role: role_str(user.role).into(),
        is_email_verified: user.is_email_verified,
        verification_status: provider.map(|p| verification_str(p.verification_status).into()),
        specialization: provider.map(|p| p.specialization.clone()),
        experience_years: provider.map(|p| p.experience_years),
        rating_average: provider.map(|p| p.rating.average),
        rating_count: provider.map(|p| p.rating.count),
    }
}

fn rating_entry_dto(entry: &RatingEntry) -> RatingEntryDto {
    RatingEntryDto {
        rating: entry.rating,
        review: entry.review.clone(),
        rated_at: entry.rated_at.to_rfc3339(),
    }
}

pub fn appointment_view(appointment: &Appointment) -> AppointmentView {
    AppointmentView {
        id: appointment.id.to_string(),
        patient: appointment.patient.to_string(),
        physiotherapist: appointment.physiotherapist.to_string(),
        appointment_date: appointment.appointment_date.to_string(),
        time_slot: TimeSlotDto {
            start_time: appointment.time_slot.start_time.clone(),
            end_time: appointment.time_slot.end_time.clone(),
        },
        reason: appointment.reason.clone(),
        symptoms: appointment.symptoms.clone(),
        status: appointment.status.to_string(),
        rejection_reason: appointment.rejection_reason.clone(),
        amount: AmountDto {
            total: appointment.amount.total,
            platform_fee: appointment.amount.platform_fee,
            physiotherapist_amount: appointment.amount.physiotherapist_amount,
        },
        payment: PaymentDto {
            status: payment_status_str(appointment.payment.status).into(),
            refund_id: appointment.payment.refund_id.clone(),
            refund_amount: appointment.payment.refund_amount,
            refund_status: refund_status_str(appointment.payment.refund_status).into(),
        },
        consultation: ConsultationDto {
            mode: consultation_mode_str(appointment.consultation.mode).into(),
            address: appointment.consultation.address.as_ref().map(|a| AddressDto {
                street: a.street.clone(),
                city: a.city.clone(),
                state: a.state.clone(),
                zip_code: a.zip_code.clone(),
                landmark: a.landmark.clone(),
            }),
            video_call_link: appointment.consultation.video_call_link.clone(),
        },
        rating: AppointmentRatingsDto {
            patient_rating: appointment.rating.patient_rating.as_ref().map(rating_entry_dto),
            physiotherapist_rating: appointment
                .rating
                .physiotherapist_rating
                .as_ref()
                .map(rating_entry_dto),
        },
        notes: NotesDto {
            patient_notes: appointment.notes.patient_notes.clone(),
            physiotherapist_notes: appointment.notes.physiotherapist_notes.clone(),
            admin_notes: appointment.notes.admin_notes.clone(),
        },
        created_at: appointment.created_at.to_rfc3339(),
        updated_at: appointment.updated_at.to_rfc3339(),
    }
}

pub fn pagination_dto(pagination: Pagination) -> PaginationDto {
    PaginationDto {
        current_page: pagination.current_page,
        total_pages: pagination.total_pages,
        total_items: pagination.total_items,
    }
}

pub fn message_dto(message: &ChatMessage) -> ChatMessageDto {
    ChatMessageDto {
        sender: message.sender.to_string(),
        content: message.content.clone(),
        message_type: message_type_str(message.message_type).into(),
        sent_at: message.sent_at.to_rfc3339(),
    }
}

pub fn thread_view(thread: &ChatThread) -> ChatThreadView {
    ChatThreadView {
        id: thread.id.to_string(),
        appointment: thread.appointment.to_string(),
        participants: thread.participants.iter().map(|p| p.to_string()).collect(),
        messages: thread.messages.iter().map(message_dto).collect(),
        is_active: thread.is_active,
        last_message: thread.last_message.as_ref().map(|m| LastMessageDto {
            content: m.content.clone(),
            sender: m.sender.to_string(),
            timestamp: m.timestamp.to_rfc3339(),
        }),
    }
}
