use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::answers::{Submission, has_answer};
use crate::spec::field::{Field, FieldType};
use crate::spec::form::FormSpec;

/// Aggregated responses for one form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSummary {
    pub form_id: String,
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_submitted_at: Option<DateTime<Utc>>,
    pub fields: Vec<FieldSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub field_id: String,
    pub name: String,
    pub label: String,
    pub answered: usize,
    /// Share of submissions answering this field, 0.0 to 1.0.
    pub response_rate: f64,
    /// Per-option counts for choice and boolean fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub option_counts: BTreeMap<String, usize>,
}

/// Summarizes the submissions belonging to `spec`; other forms' submissions are ignored.
pub fn summarize(spec: &FormSpec, submissions: &[Submission]) -> ResponseSummary {
    let relevant = submissions
        .iter()
        .filter(|submission| submission.form_id == spec.id)
        .collect::<Vec<_>>();
    let total = relevant.len();

    let fields = spec
        .ordered()
        .into_iter()
        .map(|field| summarize_field(field, &relevant, total))
        .collect();

    ResponseSummary {
        form_id: spec.id.clone(),
        total,
        first_submitted_at: relevant.iter().map(|s| s.meta.submitted_at).min(),
        last_submitted_at: relevant.iter().map(|s| s.meta.submitted_at).max(),
        fields,
    }
}

fn summarize_field(field: &Field, submissions: &[&Submission], total: usize) -> FieldSummary {
    let mut answered = 0;
    let mut option_counts = BTreeMap::new();

    if let Some(options) = &field.options {
        for option in options {
            option_counts.insert(option.clone(), 0);
        }
    }
    if field.kind == FieldType::Boolean {
        option_counts.insert("true".to_string(), 0);
        option_counts.insert("false".to_string(), 0);
    }

    for submission in submissions {
        let value = submission.answers.get(&field.name);
        if !has_answer(value) {
            continue;
        }
        answered += 1;
        match (field.kind, value) {
            (FieldType::SingleChoice, Some(Value::String(choice))) => {
                *option_counts.entry(choice.clone()).or_insert(0) += 1;
            }
            (FieldType::MultiChoice, Some(Value::Array(items))) => {
                for choice in items.iter().filter_map(Value::as_str) {
                    *option_counts.entry(choice.to_string()).or_insert(0) += 1;
                }
            }
            (FieldType::Boolean, Some(Value::Bool(flag))) => {
                *option_counts.entry(flag.to_string()).or_insert(0) += 1;
            }
            _ => {}
        }
    }

    let response_rate = if total == 0 {
        0.0
    } else {
        answered as f64 / total as f64
    };

    FieldSummary {
        field_id: field.id.clone(),
        name: field.name.clone(),
        label: field.label.clone(),
        answered,
        response_rate,
        option_counts,
    }
}
