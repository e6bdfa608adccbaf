//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own, with the logging mail transport and
//! the stub payment gateway. The workspace's main `physio-run` binary is the
//! deployment entrypoint; this one is handy for development and debugging.
//!
//! # Environment Variables
//! - `BOOKING_REST_ADDR`: Server address (default: "0.0.0.0:3000")
//! - `BOOKING_DATA_DIR`: Document storage directory (default: "/booking_data")
//! - `PLATFORM_COMMISSION`: Commission rate in [0, 1] (default: 0.20)
//! - `PUBLIC_BASE_URL`: Base URL used in emailed links

use api_rest::AppState;
use physio_core::config::commission_rate_from_env_value;
use physio_core::constants::DEFAULT_DATA_DIR;
use physio_core::payments::StubGateway;
use physio_core::CoreConfig;
use physio_email::TracingMailer;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("BOOKING_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting booking REST API on {}", addr);

    let data_dir =
        std::env::var("BOOKING_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let data_path = Path::new(&data_dir);
    if !data_path.exists() {
        anyhow::bail!("Data directory does not exist: {}", data_path.display());
    }

    let commission_rate =
        commission_rate_from_env_value(std::env::var("PLATFORM_COMMISSION").ok())?;
    let public_base_url = std::env::var("PUBLIC_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:3000".into());

    let cfg = CoreConfig::new(data_path.to_path_buf(), commission_rate, public_base_url)?;
    let state = AppState::new(cfg, Arc::new(TracingMailer::new()), Arc::new(StubGateway::new()));

    let app = api_rest::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
