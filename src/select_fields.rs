//! Fixed-choice ("single select") column handling.
//!
//! Airtable rejects a create call with HTTP 422 when a select column receives
//! a value outside its option set and the token may not add options. Values are
//! therefore resolved against a known label set before sending, and the
//! column's [`UnknownChoicePolicy`] decides what happens to anything left over.

use std::collections::HashMap;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::lead_models::NormalizedRecord;

/// What to do with a value that matches no known option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnknownChoicePolicy {
    /// Omit the column (whitelist enforcement).
    Drop,
    /// Send the trimmed raw text and let the destination decide.
    PassThrough,
    /// Omit the select column and keep the raw text in a free-text column.
    Fallback { column: String },
}

/// Outcome of resolving a submitted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Known(String),
    Unknown(String),
}

/// A select column together with its option set and alias table.
#[derive(Debug, Clone)]
pub struct SelectField {
    pub column: String,
    pub policy: UnknownChoicePolicy,
    labels: Vec<String>,
    /// slug -> canonical label
    aliases: HashMap<String, String>,
}

impl SelectField {
    pub fn new<I, S>(column: impl Into<String>, labels: I, policy: UnknownChoicePolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels
            .into_iter()
            .map(Into::into)
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
        let aliases = labels
            .iter()
            .map(|label| (slugify(label), label.clone()))
            .filter(|(slug, _)| !slug.is_empty())
            .collect();

        Self {
            column: column.into(),
            policy,
            labels,
            aliases,
        }
    }

    /// Map an alternative spelling onto a known label.
    ///
    /// Ignored when `label` is not part of the option set, so a stale alias can
    /// never produce an option the destination does not have.
    pub fn with_alias(mut self, alias: &str, label: &str) -> Self {
        let slug = slugify(alias);
        if slug.is_empty() {
            return self;
        }
        if let Some(known) = self.labels.iter().find(|known| known.as_str() == label.trim()) {
            self.aliases.insert(slug, known.clone());
        } else {
            tracing::debug!(
                "Ignoring alias '{}' for column {}: '{}' is not a known option",
                alias,
                self.column,
                label
            );
        }
        self
    }

    /// Default option set for the event type column.
    pub fn event_type(column: impl Into<String>, policy: UnknownChoicePolicy) -> Self {
        Self::new(
            column,
            ["Wedding", "Corporate event", "Birthday", "Private party", "Other"],
            policy,
        )
        .with_default_aliases(EVENT_TYPE_ALIASES)
    }

    /// Default option set for the lead source column.
    pub fn lead_source(column: impl Into<String>, policy: UnknownChoicePolicy) -> Self {
        Self::new(
            column,
            [
                "Website",
                "Instagram",
                "Facebook",
                "Google",
                "Recommendation",
                "Other",
            ],
            policy,
        )
        .with_default_aliases(LEAD_SOURCE_ALIASES)
    }

    /// Apply a static alias table, skipping entries whose label is not configured.
    pub fn with_default_aliases(self, table: &[(&str, &str)]) -> Self {
        table
            .iter()
            .fold(self, |field, (alias, label)| field.with_alias(alias, label))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Resolve a submitted value. Blank input resolves to `None`.
    pub fn resolve(&self, raw: &str) -> Option<Choice> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }

        if let Some(label) = self.labels.iter().find(|label| label.as_str() == value) {
            return Some(Choice::Known(label.clone()));
        }

        match self.aliases.get(&slugify(value)) {
            Some(label) => Some(Choice::Known(label.clone())),
            None => Some(Choice::Unknown(value.to_string())),
        }
    }

    /// Resolve `raw` and write the result into `record` per the column policy.
    pub fn apply(&self, raw: Option<&str>, record: &mut NormalizedRecord) {
        let Some(choice) = raw.and_then(|raw| self.resolve(raw)) else {
            return;
        };

        match choice {
            Choice::Known(label) => record.insert_text(&self.column, label),
            Choice::Unknown(text) => match &self.policy {
                UnknownChoicePolicy::Drop => {
                    tracing::info!(
                        "Dropping unknown option for select column {}",
                        self.column
                    );
                }
                UnknownChoicePolicy::PassThrough => record.insert_text(&self.column, text),
                UnknownChoicePolicy::Fallback { column } => record.insert_text(column, text),
            },
        }
    }

    /// Remove this column from a record after the destination rejected its
    /// value, keeping the text in the fallback column when one is configured.
    ///
    /// Returns whether the record changed.
    pub fn degrade(&self, record: &mut NormalizedRecord) -> bool {
        let Some(removed) = record.remove(&self.column) else {
            return false;
        };

        if let UnknownChoicePolicy::Fallback { column } = &self.policy {
            if !record.contains(column) {
                if let Some(text) = removed.as_str() {
                    record.insert_text(column, text);
                }
            }
        }
        true
    }
}

const EVENT_TYPE_ALIASES: &[(&str, &str)] = &[
    ("svatba", "Wedding"),
    ("wedding-ceremony", "Wedding"),
    ("firemni-akce", "Corporate event"),
    ("firemni-vecirek", "Corporate event"),
    ("corporate", "Corporate event"),
    ("company-party", "Corporate event"),
    ("narozeniny", "Birthday"),
    ("oslava-narozenin", "Birthday"),
    ("oslava", "Private party"),
    ("soukroma-akce", "Private party"),
    ("party", "Private party"),
    ("jine", "Other"),
    ("ostatni", "Other"),
];

const LEAD_SOURCE_ALIASES: &[(&str, &str)] = &[
    ("web", "Website"),
    ("webove-stranky", "Website"),
    ("form", "Website"),
    ("ig", "Instagram"),
    ("fb", "Facebook"),
    ("google-ads", "Google"),
    ("vyhledavani", "Google"),
    ("doporuceni", "Recommendation"),
    ("referral", "Recommendation"),
    ("word-of-mouth", "Recommendation"),
    ("jine", "Other"),
];

/// Lowercase, strip diacritics and collapse every run of non-alphanumeric
/// characters to a single `-`, without leading or trailing dashes.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for c in value.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
