//! Lambda entry point - serves the lead router behind an HTTP gateway.

use std::sync::Arc;

use lambda_http::{run, Error};
use rust_lead_api::config::Config;
use rust_lead_api::handlers::{self, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_lead_api=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .without_time(),
        )
        .init();

    let config = Config::from_env()?;
    let app_state = Arc::new(AppState::new(config.lead)?);

    run(handlers::router(app_state)).await
}
