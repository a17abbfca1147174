use crate::airtable_client::AirtableClient;
use crate::config::LeadConfig;
use crate::cors::cors_headers;
use crate::errors::AppError;
use crate::lead_handler::{method_not_allowed, preflight, submit_lead};
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest accepted form body. Real submissions are a few hundred bytes.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Lead handler configuration.
    pub config: LeadConfig,
    /// Client for the Airtable REST API.
    pub airtable: AirtableClient,
}

impl AppState {
    pub fn new(config: LeadConfig) -> Result<Self, AppError> {
        Ok(Self {
            config,
            airtable: AirtableClient::new()?,
        })
    }
}

/// Health check endpoint.
///
/// Returns the service status and version.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-lead-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Turn a handler panic into the generic `SERVER_ERROR` reply.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else {
        "unknown panic".to_string()
    };

    AppError::Internal(format!("Handler panicked: {}", detail)).into_response()
}

fn lead_routes() -> MethodRouter<Arc<AppState>> {
    post(submit_lead)
        .options(preflight)
        .fallback(method_not_allowed)
}

/// Build the full application router.
///
/// Shared by the standalone server and the Lambda binary.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", lead_routes())
        .route("/api/lead", lead_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(cors_headers))
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(panic_response))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
}
