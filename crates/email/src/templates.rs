//! The platform's email template registry.
//!
//! One enum variant per message the platform can send. Rendering is a pure
//! function of the variant's data: the same input always produces the same
//! subject and body, and nothing here is mutable at runtime.

/// A fully rendered email, ready for a [`crate::Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text: String,
    /// HTML body.
    pub html: String,
    /// Stable template name, for logging and test assertions.
    pub template: &'static str,
}

/// Every transactional message the platform sends.
///
/// Variants carry the data their body needs; nothing is looked up at render
/// time.
#[derive(Debug, Clone)]
pub enum EmailTemplate {
    EmailVerification {
        name: String,
        verify_url: String,
    },
    Welcome {
        name: String,
        /// Physiotherapist accounts remain under admin review after email
        /// verification; the welcome copy differs.
        provider_under_review: bool,
    },
    PasswordReset {
        name: String,
        reset_url: String,
    },
    PasswordChanged {
        name: String,
    },
    AppointmentPending {
        patient_name: String,
        physiotherapist_name: String,
        appointment_date: String,
        time_slot: String,
        reason: String,
        amount: f64,
    },
    AppointmentRequest {
        physiotherapist_name: String,
        patient_name: String,
        patient_phone: String,
        appointment_date: String,
        time_slot: String,
        reason: String,
        symptoms: String,
        amount: f64,
    },
    AppointmentConfirmed {
        patient_name: String,
        physiotherapist_name: String,
        physiotherapist_phone: String,
        appointment_date: String,
        time_slot: String,
        reason: String,
    },
    AppointmentRejected {
        patient_name: String,
        physiotherapist_name: String,
        rejection_reason: String,
        refund_amount: f64,
    },
    AppointmentCancelled {
        recipient_name: String,
        counterpart_name: String,
        appointment_date: String,
        time_slot: String,
    },
}

impl EmailTemplate {
    /// Stable template name, used in logs and tests.
    pub fn name(&self) -> &'static str {
        match self {
            Self::EmailVerification { .. } => "email_verification",
            Self::Welcome { .. } => "welcome",
            Self::PasswordReset { .. } => "password_reset",
            Self::PasswordChanged { .. } => "password_changed",
            Self::AppointmentPending { .. } => "appointment_pending",
            Self::AppointmentRequest { .. } => "appointment_request",
            Self::AppointmentConfirmed { .. } => "appointment_confirmed",
            Self::AppointmentRejected { .. } => "appointment_rejected",
            Self::AppointmentCancelled { .. } => "appointment_cancelled",
        }
    }

    /// Subject line for this message.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::EmailVerification { .. } => "PhysioAtYourDoor - Email Verification",
            Self::Welcome { .. } => "Welcome to PhysioAtYourDoor!",
            Self::PasswordReset { .. } => "PhysioAtYourDoor - Password Reset",
            Self::PasswordChanged { .. } => "PhysioAtYourDoor - Password Changed",
            Self::AppointmentPending { .. } => {
                "Appointment Request Submitted - PhysioAtYourDoor"
            }
            Self::AppointmentRequest { .. } => "New Appointment Request - PhysioAtYourDoor",
            Self::AppointmentConfirmed { .. } => "Appointment Confirmed - PhysioAtYourDoor",
            Self::AppointmentRejected { .. } => "Appointment Update - PhysioAtYourDoor",
            Self::AppointmentCancelled { .. } => "Appointment Cancelled - PhysioAtYourDoor",
        }
    }

    /// Renders the plain-text body.
    pub fn render_text(&self) -> String {
        match self {
            Self::EmailVerification { name, verify_url } => format!(
                "Hi {name},\n\n\
                 Thank you for registering with PhysioAtYourDoor. To complete your \
                 registration, please verify your email address:\n\n{verify_url}\n\n\
                 If you didn't create an account, please ignore this email.\n\
                 This verification link will expire in 24 hours.\n"
            ),
            Self::Welcome {
                name,
                provider_under_review,
            } => {
                let follow_up = if *provider_under_review {
                    "As a physiotherapist, your account is currently under review. \
                     You'll receive an email once your documents are verified and \
                     your account is approved."
                } else {
                    "You can now book appointments with verified physiotherapists \
                     in your area."
                };
                format!(
                    "Hi {name},\n\n\
                     Your email has been successfully verified! You can now access \
                     all features of PhysioAtYourDoor.\n\n{follow_up}\n"
                )
            }
            Self::PasswordReset { name, reset_url } => format!(
                "Hi {name},\n\n\
                 We received a request to reset your password. Use the link below \
                 to choose a new one:\n\n{reset_url}\n\n\
                 If you didn't request a reset, you can safely ignore this email. \
                 The link expires in 1 hour.\n"
            ),
            Self::PasswordChanged { name } => format!(
                "Hi {name},\n\n\
                 Your PhysioAtYourDoor password was just changed. If this wasn't \
                 you, please contact support immediately.\n"
            ),
            Self::AppointmentPending {
                patient_name,
                physiotherapist_name,
                appointment_date,
                time_slot,
                reason,
                amount,
            } => format!(
                "Hi {patient_name},\n\n\
                 Your appointment request has been submitted and is pending \
                 confirmation from the physiotherapist.\n\n\
                 Appointment details:\n\
                 Physiotherapist: {physiotherapist_name}\n\
                 Date: {appointment_date}\n\
                 Time: {time_slot}\n\
                 Service: {reason}\n\
                 Amount: {amount:.2}\n\n\
                 You'll receive another email once the physiotherapist confirms \
                 or declines your request.\n"
            ),
            Self::AppointmentRequest {
                physiotherapist_name,
                patient_name,
                patient_phone,
                appointment_date,
                time_slot,
                reason,
                symptoms,
                amount,
            } => format!(
                "Hi {physiotherapist_name},\n\n\
                 You have a new appointment request.\n\n\
                 Patient: {patient_name}\n\
                 Phone: {patient_phone}\n\
                 Date: {appointment_date}\n\
                 Time: {time_slot}\n\
                 Reason: {reason}\n\
                 Symptoms: {symptoms}\n\
                 Your earnings: {amount:.2}\n\n\
                 Please respond from your dashboard to confirm or decline.\n"
            ),
            Self::AppointmentConfirmed {
                patient_name,
                physiotherapist_name,
                physiotherapist_phone,
                appointment_date,
                time_slot,
                reason,
            } => format!(
                "Hi {patient_name},\n\n\
                 Great news! Your appointment has been confirmed by \
                 {physiotherapist_name}.\n\n\
                 Date: {appointment_date}\n\
                 Time: {time_slot}\n\
                 Service: {reason}\n\
                 Contact: {physiotherapist_phone}\n"
            ),
            Self::AppointmentRejected {
                patient_name,
                physiotherapist_name,
                rejection_reason,
                refund_amount,
            } => format!(
                "Hi {patient_name},\n\n\
                 Unfortunately {physiotherapist_name} is unable to take your \
                 appointment.\n\n\
                 Reason: {rejection_reason}\n\n\
                 A refund of {refund_amount:.2} has been initiated and should \
                 reach you within 5-7 business days.\n"
            ),
            Self::AppointmentCancelled {
                recipient_name,
                counterpart_name,
                appointment_date,
                time_slot,
            } => format!(
                "Hi {recipient_name},\n\n\
                 Your appointment with {counterpart_name} on {appointment_date} \
                 ({time_slot}) has been cancelled.\n"
            ),
        }
    }

    /// Renders the HTML body.
    ///
    /// The layout mirrors the plain-text content; rich styling lives with the
    /// frontend brand assets, not here.
    pub fn render_html(&self) -> String {
        let heading = match self {
            Self::EmailVerification { .. } => "Welcome to PhysioAtYourDoor!",
            Self::Welcome { .. } => "Welcome to PhysioAtYourDoor!",
            Self::PasswordReset { .. } => "Password Reset",
            Self::PasswordChanged { .. } => "Password Changed",
            Self::AppointmentPending { .. } => "Appointment Pending Confirmation",
            Self::AppointmentRequest { .. } => "New Appointment Request",
            Self::AppointmentConfirmed { .. } => "Appointment Confirmed!",
            Self::AppointmentRejected { .. } => "Appointment Update",
            Self::AppointmentCancelled { .. } => "Appointment Cancelled",
        };

        let body = self
            .render_text()
            .split("\n\n")
            .map(|para| format!("<p>{}</p>", para.replace('\n', "<br/>")))
            .collect::<String>();

        format!(
            "<div style=\"font-family: Arial, sans-serif; max-width: 600px; \
             margin: 0 auto; padding: 20px;\">\
             <h2>{heading}</h2>{body}</div>"
        )
    }

    /// Renders this template into a complete [`OutgoingEmail`].
    pub fn into_message(self, to: impl Into<String>) -> OutgoingEmail {
        OutgoingEmail {
            to: to.into(),
            subject: self.subject().to_owned(),
            text: self.render_text(),
            html: self.render_html(),
            template: self.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendering_is_pure() {
        let template = EmailTemplate::AppointmentPending {
            patient_name: "Asha".into(),
            physiotherapist_name: "Dr. Rao".into(),
            appointment_date: "2025-03-10".into(),
            time_slot: "10:00 - 11:00".into(),
            reason: "Back pain".into(),
            amount: 1000.0,
        };

        assert_eq!(template.render_text(), template.render_text());
        assert_eq!(template.render_html(), template.render_html());
    }

    #[test]
    fn test_rejected_body_carries_refund_amount() {
        let template = EmailTemplate::AppointmentRejected {
            patient_name: "Asha".into(),
            physiotherapist_name: "Dr. Rao".into(),
            rejection_reason: "unavailable".into(),
            refund_amount: 1000.0,
        };

        let text = template.render_text();
        assert!(text.contains("unavailable"), "body should carry the reason");
        assert!(text.contains("1000.00"), "body should carry the refund amount");
    }

    #[test]
    fn test_welcome_copy_differs_for_providers() {
        let provider = EmailTemplate::Welcome {
            name: "Dr. Rao".into(),
            provider_under_review: true,
        };
        let patient = EmailTemplate::Welcome {
            name: "Asha".into(),
            provider_under_review: false,
        };

        assert!(provider.render_text().contains("under review"));
        assert!(patient.render_text().contains("book appointments"));
    }

    #[test]
    fn test_into_message_fills_envelope() {
        let message = EmailTemplate::PasswordChanged { name: "Asha".into() }
            .into_message("asha@example.com");

        assert_eq!(message.to, "asha@example.com");
        assert_eq!(message.template, "password_changed");
        assert_eq!(message.subject, "PhysioAtYourDoor - Password Changed");
        assert!(message.html.starts_with("<div"));
    }
}
