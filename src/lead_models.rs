use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Name of the decoy form field that only automated form-fillers populate.
pub const HONEYPOT_FIELD: &str = "bot-field";

/// Content type of a plain HTML form post.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Inbound request body - either the form object itself or the same object
/// JSON-encoded once more as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LeadPayload {
    Fields(Map<String, Value>),
    Encoded(String),
}

impl LeadPayload {
    /// Decode a raw request body.
    ///
    /// Never fails: invalid JSON, arrays, scalars and empty bodies all decode
    /// to an empty submission.
    pub fn decode(body: &[u8]) -> LeadSubmission {
        match serde_json::from_slice::<LeadPayload>(body) {
            Ok(payload) => payload.into_submission(),
            Err(e) => {
                if !body.is_empty() {
                    tracing::debug!("Lead body is not a JSON object, treating as empty: {}", e);
                }
                LeadSubmission::default()
            }
        }
    }

    /// Decode an `application/x-www-form-urlencoded` body. The first
    /// occurrence of a repeated key wins.
    pub fn decode_form(body: &[u8]) -> LeadSubmission {
        let mut fields = Map::new();
        for (key, value) in url::form_urlencoded::parse(body) {
            fields
                .entry(key.into_owned())
                .or_insert_with(|| Value::String(value.into_owned()));
        }
        LeadSubmission { fields }
    }

    /// Decode a body according to its `Content-Type`. Anything that is not
    /// form-encoded is read as JSON.
    pub fn decode_as(content_type: Option<&str>, body: &[u8]) -> LeadSubmission {
        let is_form = content_type
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE));

        if is_form {
            Self::decode_form(body)
        } else {
            Self::decode(body)
        }
    }

    /// Convert to a submission, unwrapping a double-encoded body.
    pub fn into_submission(self) -> LeadSubmission {
        match self {
            LeadPayload::Fields(fields) => LeadSubmission { fields },
            LeadPayload::Encoded(inner) => match serde_json::from_str::<Value>(&inner) {
                Ok(Value::Object(fields)) => LeadSubmission { fields },
                _ => LeadSubmission::default(),
            },
        }
    }
}

/// One untrusted form submission.
///
/// Every key is optional. Accessors return the textual form of string,
/// number and `true` values; `null`, `false`, arrays and objects count as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadSubmission {
    fields: Map<String, Value>,
}

impl From<Map<String, Value>> for LeadSubmission {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl LeadSubmission {
    /// Whether the honeypot field carries anything a human would not have typed.
    pub fn is_bot(&self) -> bool {
        match self.fields.get(HONEYPOT_FIELD) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Number(n)) => n.as_f64().map_or(true, |v| v != 0.0),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        }
    }

    /// Raw value of the first present key among `keys`, as text.
    pub fn get_field(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.fields.get(*key))
            .find_map(text_of)
    }

    pub fn get_name(&self) -> Option<String> {
        self.get_field(&["name"])
    }

    pub fn get_first_name(&self) -> Option<String> {
        self.get_field(&["first_name", "firstName"])
    }

    pub fn get_last_name(&self) -> Option<String> {
        self.get_field(&["last_name", "lastName"])
    }

    pub fn get_email(&self) -> Option<String> {
        self.get_field(&["email"])
    }

    pub fn get_phone(&self) -> Option<String> {
        self.get_field(&["phone"])
    }

    pub fn get_date(&self) -> Option<String> {
        self.get_field(&["date"])
    }

    pub fn get_start_time(&self) -> Option<String> {
        self.get_field(&["start_time"])
    }

    pub fn get_end_time(&self) -> Option<String> {
        self.get_field(&["end_time"])
    }

    pub fn get_venue(&self) -> Option<String> {
        self.get_field(&["venue"])
    }

    pub fn get_event_type(&self) -> Option<String> {
        self.get_field(&["type"])
    }

    /// Attendee count as text. A numeric zero counts as not filled in.
    pub fn get_attendees(&self) -> Option<String> {
        match self.fields.get("attendees") {
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
            _ => self.get_field(&["attendees"]),
        }
    }

    pub fn get_source(&self) -> Option<String> {
        self.get_field(&["source"])
    }

    pub fn get_note(&self) -> Option<String> {
        self.get_field(&["note", "message"])
    }

    pub fn get_user_agent(&self) -> Option<String> {
        self.get_field(&["ua", "user_agent"])
    }

    pub fn get_referer(&self) -> Option<String> {
        self.get_field(&["referer", "referrer"])
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Outbound record: destination column name to scalar value.
///
/// Values are never blank; the insert methods silently skip blank text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedRecord(Map<String, Value>);

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert trimmed text, skipping it when blank.
    pub fn insert_text(&mut self, column: &str, value: impl AsRef<str>) {
        let value = value.as_ref().trim();
        if !value.is_empty() {
            self.0
                .insert(column.to_string(), Value::String(value.to_string()));
        }
    }

    pub fn insert_opt_text(&mut self, column: &str, value: Option<impl AsRef<str>>) {
        if let Some(value) = value {
            self.insert_text(column, value);
        }
    }

    pub fn insert_number(&mut self, column: &str, value: Number) {
        self.0.insert(column.to_string(), Value::Number(value));
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.0.remove(column)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Text value of a column, if present and textual.
    pub fn get_text(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(Value::as_str)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Successful reply to the form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LeadResponse {
    Created { ok: bool, id: Option<String> },
    Skipped { ok: bool, skipped: bool },
}

impl LeadResponse {
    pub fn created(id: Option<String>) -> Self {
        LeadResponse::Created { ok: true, id }
    }

    pub fn skipped() -> Self {
        LeadResponse::Skipped {
            ok: true,
            skipped: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_object_body() {
        let submission = LeadPayload::decode(br#"{"name": "Jana Novakova", "attendees": 80}"#);
        assert_eq!(submission.get_name(), Some("Jana Novakova".to_string()));
        assert_eq!(submission.get_attendees(), Some("80".to_string()));
        assert!(!submission.is_bot());
    }

    #[test]
    fn test_decode_double_encoded_body() {
        let body = serde_json::to_vec(&json!("{\"email\":\"jana@example.com\"}")).unwrap();
        let submission = LeadPayload::decode(&body);
        assert_eq!(submission.get_email(), Some("jana@example.com".to_string()));
    }

    #[test]
    fn test_decode_garbage_is_empty() {
        assert_eq!(LeadPayload::decode(b"name=Jana"), LeadSubmission::default());
        assert_eq!(LeadPayload::decode(b""), LeadSubmission::default());
        assert_eq!(LeadPayload::decode(b"[1,2]"), LeadSubmission::default());
        assert_eq!(LeadPayload::decode(b"\"not json\""), LeadSubmission::default());
    }

    #[test]
    fn test_decode_form_body() {
        let submission = LeadPayload::decode_as(
            Some("application/x-www-form-urlencoded; charset=UTF-8"),
            b"name=Jana+Nov%C3%A1kov%C3%A1&email=j%40x.cz&attendees=80&name=Other",
        );
        assert_eq!(submission.get_name(), Some("Jana Nováková".to_string()));
        assert_eq!(submission.get_email(), Some("j@x.cz".to_string()));
        assert_eq!(submission.get_attendees(), Some("80".to_string()));
        assert!(!submission.is_bot());

        let spam = LeadPayload::decode_as(Some(FORM_CONTENT_TYPE), b"name=Bot&bot-field=spam");
        assert!(spam.is_bot());
    }

    #[test]
    fn test_decode_as_defaults_to_json() {
        let submission = LeadPayload::decode_as(Some("application/json"), br#"{"name":"Jana"}"#);
        assert_eq!(submission.get_name(), Some("Jana".to_string()));

        let submission = LeadPayload::decode_as(None, br#"{"name":"Jana"}"#);
        assert_eq!(submission.get_name(), Some("Jana".to_string()));
        assert_eq!(LeadPayload::decode_as(None, b"name=Jana"), LeadSubmission::default());
    }

    #[test]
    fn test_honeypot_truthiness() {
        let bot = |value: Value| {
            let mut fields = Map::new();
            fields.insert(HONEYPOT_FIELD.to_string(), value);
            LeadSubmission::from(fields).is_bot()
        };

        assert!(bot(json!("http://spam.example")));
        assert!(bot(json!(true)));
        assert!(bot(json!(1)));
        assert!(!bot(json!("   ")));
        assert!(!bot(json!("")));
        assert!(!bot(json!(false)));
        assert!(!bot(json!(0)));
        assert!(!bot(Value::Null));
    }

    #[test]
    fn test_numeric_zero_attendees_absent() {
        assert_eq!(LeadPayload::decode(br#"{"attendees": 0}"#).get_attendees(), None);
        assert_eq!(LeadPayload::decode(br#"{"attendees": 0.0}"#).get_attendees(), None);
        assert_eq!(
            LeadPayload::decode(br#"{"attendees": "0"}"#).get_attendees(),
            Some("0".to_string())
        );
    }

    #[test]
    fn test_aliases_and_non_text_values() {
        let submission = LeadSubmission::from(
            json!({
                "firstName": "Jana",
                "message": "Hello",
                "referrer": "https://example.com",
                "venue": {"nested": true},
                "phone": null
            })
            .as_object()
            .cloned()
            .unwrap(),
        );

        assert_eq!(submission.get_first_name(), Some("Jana".to_string()));
        assert_eq!(submission.get_note(), Some("Hello".to_string()));
        assert_eq!(
            submission.get_referer(),
            Some("https://example.com".to_string())
        );
        assert_eq!(submission.get_venue(), None);
        assert_eq!(submission.get_phone(), None);
    }

    #[test]
    fn test_record_skips_blank_text() {
        let mut record = NormalizedRecord::new();
        record.insert_text("Name", "  ");
        record.insert_opt_text("Email", None::<&str>);
        record.insert_text("Venue", "  Zamek Loucen ");
        assert_eq!(record.len(), 1);
        assert_eq!(record.get_text("Venue"), Some("Zamek Loucen"));
    }

    #[test]
    fn test_response_shapes() {
        assert_eq!(
            serde_json::to_value(LeadResponse::created(None)).unwrap(),
            json!({"ok": true, "id": null})
        );
        assert_eq!(
            serde_json::to_value(LeadResponse::skipped()).unwrap(),
            json!({"ok": true, "skipped": true})
        );
    }
}
