use crate::config::AirtableTarget;
use crate::errors::AppError;
use crate::lead_models::NormalizedRecord;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Airtable error type returned when a select column receives a value that is
/// not in its option set.
pub const INVALID_SELECT_OPTION: &str = "INVALID_MULTIPLE_CHOICE_OPTIONS";

/// Client for creating records through the Airtable REST API.
#[derive(Clone)]
pub struct AirtableClient {
    client: reqwest::Client,
}

impl AirtableClient {
    /// Creates a new `AirtableClient` with a 30 second request timeout.
    pub fn new() -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create Airtable client: {}", e)))?;

        Ok(Self { client })
    }

    /// Record-creation endpoint: `{api_url}/{base_id}/{table}` with the table
    /// name percent-encoded as a single path segment.
    pub fn records_url(target: &AirtableTarget) -> Result<Url, AppError> {
        let mut url = Url::parse(&target.api_url).map_err(|e| {
            AppError::Internal(format!("Invalid Airtable API URL '{}': {}", target.api_url, e))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                AppError::Internal(format!(
                    "Airtable API URL cannot carry a path: {}",
                    target.api_url
                ))
            })?
            .pop_if_empty()
            .push(&target.base_id)
            .push(&target.table);

        Ok(url)
    }

    /// Creates one record.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(id))` - created, with Airtable's record id.
    /// * `Ok(None)` - created, but the response carried no id.
    /// * `Err(AppError::Airtable { .. })` - Airtable rejected the request.
    /// * `Err(AppError::Internal(_))` - transport or decoding failure.
    pub async fn create_record(
        &self,
        target: &AirtableTarget,
        record: &NormalizedRecord,
    ) -> Result<Option<String>, AppError> {
        let url = Self::records_url(target)?;
        let body = json!({ "records": [{ "fields": record }] });

        tracing::info!(
            "Creating Airtable record in {}/{} ({} fields)",
            target.base_id,
            target.table,
            record.len()
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(&target.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let data: Value = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text }));

        if !status.is_success() {
            return Err(AppError::Airtable {
                status: status.as_u16(),
                details: data,
            });
        }

        let record_id = data
            .get("records")
            .and_then(|records| records.get(0))
            .and_then(|record| record.get("id"))
            .or_else(|| data.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);

        match &record_id {
            Some(id) => tracing::info!("✓ Airtable record created: {}", id),
            None => tracing::warn!("Airtable accepted the record without returning an id"),
        }

        Ok(record_id)
    }
}

/// Airtable's error type, from either `{"error": {"type": ..}}` or `{"error": ".."}`.
pub fn error_type(details: &Value) -> Option<&str> {
    let error = details.get("error")?;
    error
        .get("type")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
}

/// Airtable's human-readable error message, if any.
pub fn error_message(details: &Value) -> Option<&str> {
    details
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
}

/// Whether a rejection is the recoverable "unknown select option" kind.
pub fn is_invalid_option_error(status: u16, details: &Value) -> bool {
    status == 422 && error_type(details) == Some(INVALID_SELECT_OPTION)
}
