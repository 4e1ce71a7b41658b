use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::answers::{ValidationError, ValidationResult, has_answer};
use crate::spec::field::{Field, FieldType};
use crate::spec::form::FormSpec;
use crate::visibility::resolve_visibility;

/// Validates answers against the fields that are currently visible.
pub fn validate(spec: &FormSpec, answers: &Value) -> ValidationResult {
    let visibility = resolve_visibility(spec, answers);
    let answers_map = answers.as_object().cloned().unwrap_or_default();

    let mut errors = Vec::new();
    let mut missing_required = Vec::new();

    for field in spec.ordered() {
        if !visibility.get(&field.id).copied().unwrap_or(true) {
            continue;
        }

        let value = answers_map.get(&field.name);
        if !has_answer(value) {
            if field.required {
                missing_required.push(field.name.clone());
            }
            continue;
        }

        if let Some(value) = value
            && let Some(error) = validate_value(field, value)
        {
            errors.push(error);
        }
    }

    let all_names: BTreeSet<_> = spec.fields.iter().map(|field| field.name.as_str()).collect();
    let unknown_fields: Vec<String> = answers_map
        .keys()
        .filter(|key| !all_names.contains(key.as_str()))
        .cloned()
        .collect();

    ValidationResult {
        valid: errors.is_empty() && missing_required.is_empty() && unknown_fields.is_empty(),
        errors,
        missing_required,
        unknown_fields,
    }
}

fn validate_value(field: &Field, value: &Value) -> Option<ValidationError> {
    match field.kind {
        FieldType::Text | FieldType::Paragraph => {
            (!value.is_string()).then(|| type_mismatch(field))
        }
        FieldType::Boolean => (!value.is_boolean()).then(|| type_mismatch(field)),
        FieldType::Number => {
            let numeric = match value {
                Value::Number(_) => true,
                Value::String(text) => text.trim().parse::<f64>().is_ok_and(f64::is_finite),
                _ => false,
            };
            (!numeric).then(|| type_mismatch(field))
        }
        FieldType::Email => match value.as_str() {
            Some(text) => (!email_pattern().is_match(text.trim()))
                .then(|| base_error(field, "invalid email address", "invalid_email")),
            None => Some(type_mismatch(field)),
        },
        FieldType::Phone => match value.as_str() {
            Some(text) => {
                (!is_phone(text)).then(|| base_error(field, "invalid phone number", "invalid_phone"))
            }
            None => Some(type_mismatch(field)),
        },
        FieldType::Date => match value.as_str() {
            Some(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                .is_err()
                .then(|| base_error(field, "date must be formatted YYYY-MM-DD", "invalid_date")),
            None => Some(type_mismatch(field)),
        },
        FieldType::SingleChoice => {
            let Some(text) = value.as_str() else {
                return Some(type_mismatch(field));
            };
            (!option_allowed(field, text)).then(|| invalid_option(field))
        }
        FieldType::MultiChoice => {
            let Some(items) = value.as_array() else {
                return Some(type_mismatch(field));
            };
            for item in items {
                match item.as_str() {
                    Some(text) if option_allowed(field, text) => continue,
                    Some(_) => return Some(invalid_option(field)),
                    None => return Some(type_mismatch(field)),
                }
            }
            None
        }
    }
}

fn option_allowed(field: &Field, candidate: &str) -> bool {
    field
        .options
        .as_ref()
        .is_some_and(|options| options.iter().any(|option| option == candidate))
}

fn is_phone(text: &str) -> bool {
    let digits = text.chars().filter(char::is_ascii_digit).count();
    digits >= 7 && phone_pattern().is_match(text.trim())
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\+?[0-9\s\-().]+$").expect("phone pattern is valid"))
}

fn type_mismatch(field: &Field) -> ValidationError {
    base_error(field, "type mismatch", "type_mismatch")
}

fn invalid_option(field: &Field) -> ValidationError {
    base_error(field, "value is not one of the field options", "invalid_option")
}

fn base_error(field: &Field, message: &str, code: &str) -> ValidationError {
    ValidationError {
        field_id: Some(field.id.clone()),
        path: Some(format!("/{}", field.name)),
        message: message.into(),
        code: Some(code.into()),
    }
}

/// Structural problem in a form definition, as reported to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionIssue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    pub code: String,
    pub message: String,
}

impl DefinitionIssue {
    fn new(field_id: Option<&str>, code: &str, message: String) -> Self {
        Self {
            field_id: field_id.map(String::from),
            code: code.into(),
            message,
        }
    }
}

/// Editor-side checks of a form definition.
///
/// The evaluator tolerates every issue reported here; lint exists so authors
/// can see rules that will silently fail open.
pub fn lint_form(spec: &FormSpec) -> Vec<DefinitionIssue> {
    let mut issues = Vec::new();
    let mut seen_ids = BTreeSet::new();
    let mut seen_names = BTreeSet::new();

    for field in &spec.fields {
        let id = Some(field.id.as_str());
        if field.id.trim().is_empty() {
            issues.push(DefinitionIssue::new(None, "empty_id", "field id cannot be empty".into()));
        } else if !seen_ids.insert(field.id.as_str()) {
            issues.push(DefinitionIssue::new(
                id,
                "duplicate_id",
                format!("duplicate field id '{}'", field.id),
            ));
        }

        if field.name.trim().is_empty() {
            issues.push(DefinitionIssue::new(
                id,
                "empty_name",
                format!("field '{}' has no name", field.id),
            ));
        } else if !seen_names.insert(field.name.as_str()) {
            issues.push(DefinitionIssue::new(
                id,
                "duplicate_name",
                format!("duplicate field name '{}'", field.name),
            ));
        }

        let has_options = field
            .options
            .as_ref()
            .is_some_and(|options| !options.is_empty());
        if field.kind.is_choice() && !has_options {
            issues.push(DefinitionIssue::new(
                id,
                "missing_options",
                format!("{} field '{}' must define options", field.kind, field.id),
            ));
        }
        if !field.kind.is_choice() && field.options.is_some() {
            issues.push(DefinitionIssue::new(
                id,
                "unexpected_options",
                format!("{} field '{}' cannot carry options", field.kind, field.id),
            ));
        }

        if let Some(rule) = &field.conditional_rule {
            if rule.source_field_id == field.id {
                issues.push(DefinitionIssue::new(
                    id,
                    "self_reference",
                    format!("field '{}' conditions on itself", field.id),
                ));
            } else if spec.field(&rule.source_field_id).is_none() {
                issues.push(DefinitionIssue::new(
                    id,
                    "unknown_source",
                    format!(
                        "field '{}' conditions on unknown field '{}'",
                        field.id, rule.source_field_id
                    ),
                ));
            }
        }
    }

    issues
}
