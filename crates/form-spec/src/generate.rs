//! Boundary to the AI field generator.
//!
//! The generator itself is an external service; this module defines the trait
//! callers depend on, decodes its responses into [`Field`] records and turns
//! upstream failures into typed errors.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::spec::field::{Field, FieldType};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("form name cannot be empty")]
    EmptyFormName,
    #[error("field generator is rate limited; retry later")]
    RateLimited,
    #[error("field generator quota is exhausted")]
    QuotaExceeded,
    #[error("field generator returned a malformed response: {0}")]
    MalformedResponse(String),
    #[error("field generator returned no fields")]
    EmptyResult,
    #[error("field generator failed with status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("failed to read generator response: {0}")]
    Io(#[from] std::io::Error),
}

/// Proposes fields for a form given its name, in one round trip.
pub trait FieldGenerator {
    fn generate(&self, form_name: &str) -> Result<Vec<Field>, GenerateError>;
}

/// Replays a saved generator response body.
pub struct ResponseFileGenerator {
    path: PathBuf,
}

impl ResponseFileGenerator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FieldGenerator for ResponseFileGenerator {
    fn generate(&self, form_name: &str) -> Result<Vec<Field>, GenerateError> {
        ensure_form_name(form_name)?;
        let body = fs::read_to_string(&self.path)?;
        debug!(path = %self.path.display(), form_name, "decoding saved generator response");
        decode_generated_fields(&body)
    }
}

pub fn ensure_form_name(form_name: &str) -> Result<(), GenerateError> {
    if form_name.trim().is_empty() {
        Err(GenerateError::EmptyFormName)
    } else {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ProposedField {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    placeholder: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    options: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Proposal {
    List(Vec<ProposedField>),
    Wrapped { fields: Vec<ProposedField> },
}

/// Interprets a completed exchange with the generator.
pub fn decode_response(status: u16, body: &str) -> Result<Vec<Field>, GenerateError> {
    if (200..300).contains(&status) {
        decode_generated_fields(body)
    } else {
        Err(classify_failure(status, body))
    }
}

/// Maps a non-success upstream response onto a typed error.
pub fn classify_failure(status: u16, body: &str) -> GenerateError {
    let message = upstream_message(body);
    let lowered = message.to_lowercase();
    let error = if status == 402 || lowered.contains("quota") || lowered.contains("billing") {
        GenerateError::QuotaExceeded
    } else if status == 429 {
        GenerateError::RateLimited
    } else {
        GenerateError::Upstream { status, message }
    };
    warn!(status, error = %error, "field generator request failed");
    error
}

fn upstream_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .or_else(|| value.get("error"))
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}

/// Decodes a generator response body into fields with fresh ids and dense positions.
///
/// Accepts either a JSON array of proposals or an object with a `fields` array,
/// optionally wrapped in a markdown code fence.
pub fn decode_generated_fields(body: &str) -> Result<Vec<Field>, GenerateError> {
    let proposal: Proposal = serde_json::from_str(strip_code_fence(body))
        .map_err(|err| GenerateError::MalformedResponse(err.to_string()))?;
    let proposals = match proposal {
        Proposal::List(fields) | Proposal::Wrapped { fields } => fields,
    };
    if proposals.is_empty() {
        return Err(GenerateError::EmptyResult);
    }

    let mut used_names = BTreeSet::new();
    let mut fields = Vec::with_capacity(proposals.len());
    for (index, proposed) in proposals.into_iter().enumerate() {
        let field = to_field(proposed, index, &mut used_names)?;
        fields.push(field);
    }
    debug!(count = fields.len(), "decoded generated fields");
    Ok(fields)
}

fn to_field(
    proposed: ProposedField,
    index: usize,
    used_names: &mut BTreeSet<String>,
) -> Result<Field, GenerateError> {
    let base = proposed
        .name
        .as_deref()
        .map(identifier)
        .filter(|name| !name.is_empty())
        .or_else(|| proposed.label.as_deref().map(identifier))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            GenerateError::MalformedResponse(format!("field #{} has neither name nor label", index + 1))
        })?;
    let name = unique_name(base, used_names);

    let mut kind = match proposed.kind.as_deref() {
        Some(label) => label.parse::<FieldType>().unwrap_or_else(|_| {
            warn!(field = %name, kind = label, "unknown generated field type; using text");
            FieldType::Text
        }),
        None => FieldType::Text,
    };

    let options = proposed
        .options
        .map(|options| {
            options
                .into_iter()
                .map(|option| option.trim().to_string())
                .filter(|option| !option.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|options| !options.is_empty());
    if kind.is_choice() && options.is_none() {
        warn!(field = %name, "generated choice field has no options; using text");
        kind = FieldType::Text;
    }

    let label = proposed
        .label
        .filter(|label| !label.trim().is_empty())
        .unwrap_or_else(|| humanize(&name));

    Ok(Field {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        label,
        kind,
        description: None,
        placeholder: proposed.placeholder.filter(|text| !text.trim().is_empty()),
        options: if kind.is_choice() { options } else { None },
        required: proposed.required,
        position: index as i64,
        conditional_rule: None,
    })
}

fn strip_code_fence(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.trim_start_matches(|ch: char| ch.is_ascii_alphabetic());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

fn unique_name(base: String, used: &mut BTreeSet<String>) -> String {
    let mut candidate = base.clone();
    let mut suffix = 2;
    while used.contains(&candidate) {
        candidate = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    used.insert(candidate.clone());
    candidate
}

fn humanize(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_and_fenced_proposals() {
        let body = r#"```json
        { "fields": [
            { "name": "Full Name", "type": "text", "label": "Full name", "required": true },
            { "name": "contact", "type": "tel", "placeholder": "+1 555 0100" },
            { "name": "size", "type": "dropdown", "options": ["S", " M ", ""] }
        ] }
        ```"#;
        let fields = decode_generated_fields(body).expect("decode");
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].name, "full_name");
        assert!(fields[0].required);
        assert_eq!(fields[1].kind, FieldType::Phone);
        assert_eq!(fields[1].label, "Contact");
        assert_eq!(fields[1].placeholder.as_deref(), Some("+1 555 0100"));
        assert_eq!(fields[2].kind, FieldType::SingleChoice);
        assert_eq!(fields[2].options, Some(vec!["S".to_string(), "M".to_string()]));
        let positions = fields.iter().map(|field| field.position).collect::<Vec<_>>();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_ne!(fields[0].id, fields[1].id);
    }

    #[test]
    fn choice_without_options_falls_back_to_text() {
        let fields =
            decode_generated_fields(r#"[{ "name": "color", "type": "radio" }]"#).expect("decode");
        assert_eq!(fields[0].kind, FieldType::Text);
        assert!(fields[0].options.is_none());
    }

    #[test]
    fn duplicate_names_get_suffixes() {
        let fields = decode_generated_fields(r#"[{ "name": "email" }, { "label": "Email" }]"#)
            .expect("decode");
        assert_eq!(fields[0].name, "email");
        assert_eq!(fields[1].name, "email_2");
    }

    #[test]
    fn malformed_and_empty_bodies_are_typed_errors() {
        assert!(matches!(
            decode_generated_fields("not json"),
            Err(GenerateError::MalformedResponse(_))
        ));
        assert!(matches!(
            decode_generated_fields("[]"),
            Err(GenerateError::EmptyResult)
        ));
        assert!(matches!(
            decode_generated_fields(r#"[{ "type": "text" }]"#),
            Err(GenerateError::MalformedResponse(_))
        ));
    }

    #[test]
    fn failures_are_classified() {
        assert!(matches!(
            classify_failure(429, r#"{"error":{"message":"Rate limit reached"}}"#),
            GenerateError::RateLimited
        ));
        assert!(matches!(
            classify_failure(429, r#"{"error":{"message":"You exceeded your current quota"}}"#),
            GenerateError::QuotaExceeded
        ));
        assert!(matches!(classify_failure(402, ""), GenerateError::QuotaExceeded));
        match classify_failure(500, "upstream exploded") {
            GenerateError::Upstream { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn success_status_decodes_body() {
        let fields = decode_response(200, r#"[{ "name": "age", "type": "number" }]"#)
            .expect("decode");
        assert_eq!(fields[0].kind, FieldType::Number);
        assert!(matches!(
            decode_response(503, "busy"),
            Err(GenerateError::Upstream { status: 503, .. })
        ));
    }

    #[test]
    fn empty_form_name_is_rejected() {
        let generator = ResponseFileGenerator::new("/nonexistent");
        assert!(matches!(
            generator.generate("  "),
            Err(GenerateError::EmptyFormName)
        ));
    }
}
