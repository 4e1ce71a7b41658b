use serde_json::Value;

use crate::answers::has_answer;
use crate::spec::form::FormSpec;
use crate::visibility::VisibilityMap;

/// First visible required field, in render order, that has no answer yet.
pub fn next_field(spec: &FormSpec, answers: &Value, visibility: &VisibilityMap) -> Option<String> {
    spec.ordered()
        .into_iter()
        .filter(|field| field.required)
        .filter(|field| visibility.get(&field.id).copied().unwrap_or(true))
        .find(|field| !has_answer(answers.get(&field.name)))
        .map(|field| field.id.clone())
}

/// Number of visible fields holding an answer.
pub fn answered_count(spec: &FormSpec, answers: &Value, visibility: &VisibilityMap) -> usize {
    spec.fields
        .iter()
        .filter(|field| visibility.get(&field.id).copied().unwrap_or(true))
        .filter(|field| has_answer(answers.get(&field.name)))
        .count()
}

/// Number of visible fields.
pub fn visible_count(visibility: &VisibilityMap) -> usize {
    visibility.values().filter(|visible| **visible).count()
}
