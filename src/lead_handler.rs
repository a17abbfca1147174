use crate::airtable_client::{error_message, is_invalid_option_error};
use crate::config::{AirtableTarget, LeadConfig};
use crate::errors::AppError;
use crate::handlers::AppState;
use crate::lead_models::{LeadPayload, LeadResponse, NormalizedRecord};
use crate::normalize::normalize_submission;
use crate::select_fields::SelectField;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

/// Lead form submission handler (`POST`).
///
/// Flow:
/// 1. Decode the body as JSON or form data (never fails, garbage becomes an
///    empty submission).
/// 2. Honeypot check - bots get a success reply and no Airtable call.
/// 3. Normalize fields into the outbound record.
/// 4. Check the Airtable configuration.
/// 5. Create the record, retrying once without rejected select options.
pub async fn submit_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<LeadResponse>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    process_submission(&state, content_type, &body)
        .await
        .map(Json)
}

/// CORS preflight. Headers are added by the CORS middleware.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Fallback for every method other than POST and OPTIONS.
pub async fn method_not_allowed(method: Method) -> AppError {
    tracing::warn!("Rejecting {} request to lead endpoint", method);
    AppError::MethodNotAllowed
}

/// Process one raw submission body.
pub async fn process_submission(
    state: &AppState,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<LeadResponse, AppError> {
    let submission = LeadPayload::decode_as(content_type, body);

    if submission.is_bot() {
        tracing::info!("Honeypot field filled, skipping submission");
        return Ok(LeadResponse::skipped());
    }

    let record = normalize_submission(&submission, &state.config, Utc::now());
    tracing::info!(
        "📨 Received lead submission with columns: {:?}",
        record.columns().collect::<Vec<_>>()
    );

    let target = state
        .config
        .target
        .as_ref()
        .map_err(|missing| AppError::EnvMissing(*missing))?;

    let id = create_with_retry(state, target, record).await?;
    Ok(LeadResponse::created(id))
}

/// Create the record, retrying exactly once when Airtable rejects a select
/// option. Every other failure is returned as-is.
async fn create_with_retry(
    state: &AppState,
    target: &AirtableTarget,
    record: NormalizedRecord,
) -> Result<Option<String>, AppError> {
    match state.airtable.create_record(target, &record).await {
        Err(AppError::Airtable { status, details })
            if state.config.retry_invalid_options && is_invalid_option_error(status, &details) =>
        {
            let message = error_message(&details);
            let Some(reduced) = strip_rejected_options(&state.config, &record, message) else {
                return Err(AppError::Airtable { status, details });
            };

            tracing::warn!(
                "Airtable rejected a select option, retrying with columns: {:?}",
                reduced.columns().collect::<Vec<_>>()
            );
            state.airtable.create_record(target, &reduced).await
        }
        other => other,
    }
}

/// Copy of `record` without the select values Airtable refused.
///
/// Columns whose sent value appears quoted in the error message are removed; when
/// none can be identified every select column present is removed. Returns
/// `None` when the record has no select column to remove.
pub fn strip_rejected_options(
    config: &LeadConfig,
    record: &NormalizedRecord,
    message: Option<&str>,
) -> Option<NormalizedRecord> {
    let present: Vec<&SelectField> = config
        .select_fields()
        .into_iter()
        .filter(|field| record.contains(&field.column))
        .collect();

    if present.is_empty() {
        return None;
    }

    let named: Vec<&SelectField> = match message {
        Some(message) => present
            .iter()
            .copied()
            .filter(|field| {
                record
                    .get_text(&field.column)
                    .is_some_and(|value| message.contains(&format!("\"{}\"", value)))
            })
            .collect(),
        None => Vec::new(),
    };
    let offending = if named.is_empty() { present } else { named };

    let mut reduced = record.clone();
    for field in offending {
        field.degrade(&mut reduced);
    }
    Some(reduced)
}
