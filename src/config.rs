use serde::Serialize;

use crate::select_fields::{SelectField, UnknownChoicePolicy};

pub const DEFAULT_AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";

/// Process configuration for the HTTP server and the lead handler.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub lead: LeadConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            lead: LeadConfig::from_lookup(|key| std::env::var(key).ok()),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        match &config.lead.target {
            Ok(target) => tracing::debug!(
                "Airtable target: {} base={} table={}",
                target.api_url,
                target.base_id,
                target.table
            ),
            Err(missing) => tracing::warn!(
                "Airtable configuration incomplete, leads will be rejected with ENV_MISSING: {:?}",
                missing
            ),
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// Which required Airtable variables are absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MissingEnv {
    #[serde(rename = "AIRTABLE_BASE_ID")]
    pub base_id: bool,
    #[serde(rename = "AIRTABLE_TABLE_NAME")]
    pub table_name: bool,
    #[serde(rename = "AIRTABLE_API_KEY")]
    pub api_key: bool,
}

/// Where records are created.
#[derive(Clone)]
pub struct AirtableTarget {
    pub api_url: String,
    pub base_id: String,
    pub table: String,
    pub api_key: String,
}

impl std::fmt::Debug for AirtableTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableTarget")
            .field("api_url", &self.api_url)
            .field("base_id", &self.base_id)
            .field("table", &self.table)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Destination column names for the plain (non-select) fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub date: String,
    pub start: String,
    pub end: String,
    pub venue: String,
    pub attendees: String,
    pub note: String,
    pub user_agent: String,
    pub referer: String,
    /// Only written when the table's creation column is not auto-computed.
    pub created_at: Option<String>,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            name: "Name".to_string(),
            email: "Email".to_string(),
            phone: "Phone".to_string(),
            date: "Date".to_string(),
            start: "Start".to_string(),
            end: "End".to_string(),
            venue: "Venue".to_string(),
            attendees: "Attendees".to_string(),
            note: "Note".to_string(),
            user_agent: "UA".to_string(),
            referer: "Referer".to_string(),
            created_at: None,
        }
    }
}

/// Everything the lead handler needs, resolved once per process.
#[derive(Debug, Clone)]
pub struct LeadConfig {
    /// Absent required values are kept as a typed error so every request can
    /// report them before any network call.
    pub target: Result<AirtableTarget, MissingEnv>,
    pub columns: ColumnNames,
    pub start_date_only: bool,
    pub end_date_only: bool,
    pub event_type: SelectField,
    pub lead_source: SelectField,
    pub retry_invalid_options: bool,
}

impl LeadConfig {
    /// Build from any key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let column = |suffix: &str, default: &str| {
            get(&format!("AIRTABLE_FIELD_{}", suffix)).unwrap_or_else(|| default.to_string())
        };

        let defaults = ColumnNames::default();
        let columns = ColumnNames {
            name: column("NAME", &defaults.name),
            email: column("EMAIL", &defaults.email),
            phone: column("PHONE", &defaults.phone),
            date: column("DATE", &defaults.date),
            start: column("START", &defaults.start),
            end: column("END", &defaults.end),
            venue: column("VENUE", &defaults.venue),
            attendees: column("ATTENDEES", &defaults.attendees),
            note: column("NOTE", &defaults.note),
            user_agent: column("UA", &defaults.user_agent),
            referer: column("REFERER", &defaults.referer),
            created_at: get("AIRTABLE_FIELD_CREATED_AT"),
        };

        let type_policy = parse_policy(
            get("AIRTABLE_TYPE_POLICY").as_deref(),
            get("AIRTABLE_TYPE_FALLBACK_FIELD").unwrap_or_else(|| "Type (text)".to_string()),
        );
        let mut event_type = SelectField::event_type(column("TYPE", "Type"), type_policy);
        if let Some(options) = get("AIRTABLE_TYPE_OPTIONS") {
            event_type = SelectField::new(
                event_type.column.clone(),
                split_list(&options),
                event_type.policy.clone(),
            );
        }
        let event_type = with_aliases(event_type, get("AIRTABLE_TYPE_ALIASES").as_deref());

        let source_policy = parse_policy(
            get("AIRTABLE_SOURCE_POLICY").as_deref(),
            get("AIRTABLE_SOURCE_FALLBACK_FIELD").unwrap_or_else(|| "Source (text)".to_string()),
        );
        let mut lead_source = SelectField::lead_source(column("SOURCE", "Source"), source_policy);
        if let Some(options) = get("AIRTABLE_SOURCE_OPTIONS") {
            lead_source = SelectField::new(
                lead_source.column.clone(),
                split_list(&options),
                lead_source.policy.clone(),
            );
        }
        let lead_source = with_aliases(lead_source, get("AIRTABLE_SOURCE_ALIASES").as_deref());

        let base_id = get("AIRTABLE_BASE_ID").and_then(|raw| first_segment(&raw));
        let table = get("AIRTABLE_TABLE_NAME")
            .or_else(|| get("AIRTABLE_TABLE_ID"))
            .and_then(|raw| last_segment(&raw));
        let api_key = get("AIRTABLE_API_KEY").or_else(|| get("AIRTABLE_TOKEN"));

        let target = match (base_id, table, api_key) {
            (Some(base_id), Some(table), Some(api_key)) => Ok(AirtableTarget {
                api_url: get("AIRTABLE_API_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_AIRTABLE_API_URL.to_string()),
                base_id,
                table,
                api_key,
            }),
            (base_id, table, api_key) => Err(MissingEnv {
                base_id: base_id.is_none(),
                table_name: table.is_none(),
                api_key: api_key.is_none(),
            }),
        };

        Self {
            target,
            columns,
            start_date_only: get("AIRTABLE_START_DATE_ONLY").is_some_and(|v| parse_flag(&v)),
            end_date_only: get("AIRTABLE_END_DATE_ONLY").is_some_and(|v| parse_flag(&v)),
            event_type,
            lead_source,
            retry_invalid_options: get("AIRTABLE_RETRY_INVALID_OPTIONS")
                .map_or(true, |v| parse_flag(&v)),
        }
    }

    /// Select columns, in the order they are written.
    pub fn select_fields(&self) -> [&SelectField; 2] {
        [&self.event_type, &self.lead_source]
    }
}

/// First non-empty path segment: `appXXX/tblYYY` -> `appXXX`.
pub fn first_segment(raw: &str) -> Option<String> {
    raw.split('/')
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Last non-empty path segment: `appXXX/tblYYY` -> `tblYYY`.
pub fn last_segment(raw: &str) -> Option<String> {
    raw.split('/')
        .map(str::trim)
        .rev()
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_policy(value: Option<&str>, fallback_column: String) -> UnknownChoicePolicy {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("drop") | Some("whitelist") | Some("strict") => UnknownChoicePolicy::Drop,
        Some("passthrough") | Some("raw") => UnknownChoicePolicy::PassThrough,
        Some("fallback") => UnknownChoicePolicy::Fallback {
            column: fallback_column,
        },
        Some(other) => {
            tracing::warn!("Unknown select policy '{}', using drop", other);
            UnknownChoicePolicy::Drop
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// `slug=Label,other=Label` pairs appended to a field's alias table.
fn with_aliases(field: SelectField, value: Option<&str>) -> SelectField {
    let Some(value) = value else {
        return field;
    };
    split_list(value)
        .iter()
        .filter_map(|pair| pair.split_once('='))
        .fold(field, |field, (alias, label)| field.with_alias(alias, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> LeadConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LeadConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_segments() {
        assert_eq!(first_segment("appABC/tblXYZ"), Some("appABC".to_string()));
        assert_eq!(first_segment("/appABC/"), Some("appABC".to_string()));
        assert_eq!(last_segment("appABC/tblXYZ"), Some("tblXYZ".to_string()));
        assert_eq!(last_segment("Leads"), Some("Leads".to_string()));
        assert_eq!(last_segment(" / "), None);
    }

    #[test]
    fn test_complete_target() {
        let config = config_from(&[
            ("AIRTABLE_BASE_ID", "appABC/tblXYZ"),
            ("AIRTABLE_TABLE_NAME", "appABC/Leads"),
            ("AIRTABLE_API_KEY", "pat123"),
            ("AIRTABLE_API_URL", "http://localhost:9999/v0/"),
        ]);
        let target = config.target.unwrap();
        assert_eq!(target.base_id, "appABC");
        assert_eq!(target.table, "Leads");
        assert_eq!(target.api_key, "pat123");
        assert_eq!(target.api_url, "http://localhost:9999/v0");
    }

    #[test]
    fn test_missing_flags() {
        let config = config_from(&[("AIRTABLE_TABLE_NAME", "Leads"), ("AIRTABLE_API_KEY", "  ")]);
        assert_eq!(
            config.target.unwrap_err(),
            MissingEnv {
                base_id: true,
                table_name: false,
                api_key: true,
            }
        );
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.columns, ColumnNames::default());
        assert!(!config.start_date_only);
        assert!(!config.end_date_only);
        assert!(config.retry_invalid_options);
        assert_eq!(config.event_type.column, "Type");
        assert_eq!(config.event_type.policy, UnknownChoicePolicy::Drop);
        assert_eq!(config.lead_source.column, "Source");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("AIRTABLE_FIELD_START", "Začátek"),
            ("AIRTABLE_FIELD_TYPE", "Typ akce"),
            ("AIRTABLE_FIELD_CREATED_AT", "Created"),
            ("AIRTABLE_START_DATE_ONLY", "TRUE"),
            ("AIRTABLE_END_DATE_ONLY", "0"),
            ("AIRTABLE_TYPE_POLICY", "fallback"),
            ("AIRTABLE_TYPE_OPTIONS", "Svatba, Firemní akce"),
            ("AIRTABLE_TYPE_ALIASES", "wedding=Svatba"),
            ("AIRTABLE_SOURCE_POLICY", "passthrough"),
            ("AIRTABLE_RETRY_INVALID_OPTIONS", "off"),
        ]);

        assert_eq!(config.columns.start, "Začátek");
        assert_eq!(config.columns.created_at.as_deref(), Some("Created"));
        assert!(config.start_date_only);
        assert!(!config.end_date_only);
        assert!(!config.retry_invalid_options);
        assert_eq!(config.event_type.column, "Typ akce");
        assert_eq!(config.event_type.labels(), ["Svatba", "Firemní akce"]);
        assert_eq!(
            config.event_type.policy,
            UnknownChoicePolicy::Fallback {
                column: "Type (text)".to_string()
            }
        );
        assert_eq!(
            config.event_type.resolve("Wedding"),
            Some(crate::select_fields::Choice::Known("Svatba".to_string()))
        );
        assert_eq!(config.lead_source.policy, UnknownChoicePolicy::PassThrough);
    }
}
