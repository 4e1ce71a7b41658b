use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::spec::form::FormSpec;
use crate::visibility::is_visible;

/// Client metadata recorded alongside a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionMeta {
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
}

impl SubmissionMeta {
    pub fn now() -> Self {
        Self {
            submitted_at: Utc::now(),
            user_agent: None,
            client_ip: None,
        }
    }
}

/// A finalized answer set for one form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub form_id: String,
    pub answers: Value,
    pub meta: SubmissionMeta,
}

impl Submission {
    pub fn new(form_id: impl Into<String>, answers: Value, meta: SubmissionMeta) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            form_id: form_id.into(),
            answers,
            meta,
        }
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<ValidationError>,
    #[serde(default)]
    pub missing_required: Vec<String>,
    #[serde(default)]
    pub unknown_fields: Vec<String>,
}

/// Whether a field counts as answered. Unlike `not_empty`, `false` is an answer.
pub fn has_answer(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Returns a copy of `answers` with `name` set to `value`.
pub fn with_answer(answers: &Value, name: &str, value: Value) -> Value {
    let mut map = answers.as_object().cloned().unwrap_or_default();
    map.insert(name.to_string(), value);
    Value::Object(map)
}

/// Keeps only the answers of fields that are currently visible.
pub fn prune_hidden(spec: &FormSpec, answers: &Value) -> Value {
    let mut pruned = Map::new();
    for field in &spec.fields {
        if !is_visible(field, answers, &spec.fields) {
            continue;
        }
        if let Some(value) = answers.get(&field.name) {
            pruned.insert(field.name.clone(), value.clone());
        }
    }
    Value::Object(pruned)
}
