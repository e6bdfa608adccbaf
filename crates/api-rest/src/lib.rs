//! # API REST
//!
//! REST surface for the booking platform.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - Bearer-session authentication (see [`extract::AuthUser`])
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON shaping, CORS, error mapping)
//!
//! Uses `api-shared` for wire types and `physio-core` for all domain logic.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod extract;
pub mod handlers;
pub mod views;

pub use error::{ApiError, ApiResult};

use axum::routing::{delete, get, patch, post};
use axum::Router;
use physio_core::accounts::AccountService;
use physio_core::chat::ChatService;
use physio_core::lifecycle::AppointmentLifecycle;
use physio_core::payments::PaymentGateway;
use physio_core::sessions::SessionStore;
use physio_core::users::UserDirectory;
use physio_core::{CoreConfig, Notifier};
use physio_email::Mailer;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub users: Arc<UserDirectory>,
    pub sessions: Arc<SessionStore>,
    pub accounts: Arc<AccountService>,
    pub lifecycle: Arc<AppointmentLifecycle>,
    pub chat: Arc<ChatService>,
}

impl AppState {
    /// Wires the full service graph over one configuration.
    pub fn new(
        cfg: CoreConfig,
        mailer: Arc<dyn Mailer>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let cfg = Arc::new(cfg);
        let users = Arc::new(UserDirectory::new(&cfg));
        let sessions = Arc::new(SessionStore::new(&cfg));
        let chat = Arc::new(ChatService::new(&cfg));
        let notifier = Notifier::new(mailer);

        let accounts = Arc::new(AccountService::new(
            cfg.clone(),
            users.clone(),
            sessions.clone(),
            notifier.clone(),
        ));
        let lifecycle = Arc::new(AppointmentLifecycle::new(
            &cfg,
            users.clone(),
            chat.clone(),
            notifier,
            gateway,
        ));

        Self {
            cfg,
            users,
            sessions,
            accounts,
            lifecycle,
            chat,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::verify_email,
        handlers::auth::resend_verification,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::auth::me,
        handlers::auth::update_password,
        handlers::appointments::create,
        handlers::appointments::list,
        handlers::appointments::my_appointments,
        handlers::appointments::physio_requests,
        handlers::appointments::get_one,
        handlers::appointments::respond,
        handlers::appointments::update_status,
        handlers::appointments::update_notes,
        handlers::appointments::rate,
        handlers::appointments::cancel,
        handlers::chat::get_thread,
        handlers::chat::send_message,
        handlers::admin::set_verification,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::MessageRes,
        api_shared::ErrorRes,
        api_shared::auth::RegisterReq,
        api_shared::auth::RegisterRes,
        api_shared::auth::UserView,
        api_shared::auth::LoginReq,
        api_shared::auth::LoginRes,
        api_shared::auth::MeRes,
        api_shared::auth::ResendVerificationReq,
        api_shared::auth::ForgotPasswordReq,
        api_shared::auth::ResetPasswordReq,
        api_shared::auth::UpdatePasswordReq,
        api_shared::auth::VerificationReq,
        api_shared::appointments::TimeSlotDto,
        api_shared::appointments::AddressDto,
        api_shared::appointments::ConsultationDto,
        api_shared::appointments::CreateAppointmentReq,
        api_shared::appointments::AmountDto,
        api_shared::appointments::PaymentDto,
        api_shared::appointments::RatingEntryDto,
        api_shared::appointments::AppointmentRatingsDto,
        api_shared::appointments::NotesDto,
        api_shared::appointments::AppointmentView,
        api_shared::appointments::AppointmentRes,
        api_shared::appointments::AppointmentListRes,
        api_shared::appointments::PaginationDto,
        api_shared::appointments::ListQuery,
        api_shared::appointments::RespondReq,
        api_shared::appointments::StatusUpdateReq,
        api_shared::appointments::NotesReq,
        api_shared::appointments::RatingReq,
        api_shared::chat::ChatMessageDto,
        api_shared::chat::LastMessageDto,
        api_shared::chat::ChatThreadView,
        api_shared::chat::ChatThreadRes,
        api_shared::chat::SendMessageReq,
        api_shared::chat::SendMessageRes,
    ))
)]
struct ApiDoc;

/// Builds the full application router, including Swagger UI and CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route(
            "/auth/verify-email/:token",
            get(handlers::auth::verify_email),
        )
        .route(
            "/auth/resend-verification",
            post(handlers::auth::resend_verification),
        )
        .route(
            "/auth/forgot-password",
            post(handlers::auth::forgot_password),
        )
        .route(
            "/auth/reset-password/:token",
            patch(handlers::auth::reset_password),
        )
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/auth/update-password",
            patch(handlers::auth::update_password),
        )
        .route("/appointments", post(handlers::appointments::create))
        .route("/appointments", get(handlers::appointments::list))
        .route(
            "/appointments/my-appointments",
            get(handlers::appointments::my_appointments),
        )
        .route(
            "/appointments/physio/requests",
            get(handlers::appointments::physio_requests),
        )
        .route("/appointments/:id", get(handlers::appointments::get_one))
        .route(
            "/appointments/:id/respond",
            patch(handlers::appointments::respond),
        )
        .route(
            "/appointments/:id/status",
            patch(handlers::appointments::update_status),
        )
        .route(
            "/appointments/:id/notes",
            patch(handlers::appointments::update_notes),
        )
        .route(
            "/appointments/:id/rating",
            patch(handlers::appointments::rate),
        )
        .route("/appointments/:id", delete(handlers::appointments::cancel))
        .route("/chats/:appointment_id", get(handlers::chat::get_thread))
        .route(
            "/chats/:appointment_id/messages",
            post(handlers::chat::send_message),
        )
        .route(
            "/admin/users/:id/verification",
            patch(handlers::admin::set_verification),
        )
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
