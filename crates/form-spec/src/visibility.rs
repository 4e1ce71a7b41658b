use std::borrow::Cow;
use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::spec::{
    field::Field,
    form::FormSpec,
    rule::{ConditionalRule, RuleAction, RuleOperator},
};

pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

/// Decides whether `field` is rendered given the current answers.
///
/// Anything that prevents the rule from being evaluated (no rule, a disabled
/// rule, a source field that no longer exists) resolves to visible.
pub fn is_visible(field: &Field, answers: &Value, all_fields: &[Field]) -> bool {
    let Some(rule) = field.conditional_rule.as_ref().filter(|rule| rule.enabled) else {
        return true;
    };
    let Some(source) = all_fields
        .iter()
        .find(|candidate| candidate.id == rule.source_field_id)
    else {
        return true;
    };

    let condition = evaluate_condition(rule, answers.get(&source.name));
    match rule.action {
        RuleAction::Show => condition,
        RuleAction::Hide => !condition,
    }
}

/// Evaluates the rule's operator against the source answer, ignoring `action`.
pub fn evaluate_condition(rule: &ConditionalRule, source_value: Option<&Value>) -> bool {
    match rule.operator {
        RuleOperator::Equals => equals_ignore_case(&value_text(source_value), &rule.value),
        RuleOperator::NotEquals => !equals_ignore_case(&value_text(source_value), &rule.value),
        RuleOperator::Contains => value_text(source_value)
            .to_lowercase()
            .contains(&rule.value.to_lowercase()),
        RuleOperator::NotEmpty => is_filled(source_value),
        RuleOperator::GreaterThan => {
            compare_numbers(source_value, &rule.value) == Some(Ordering::Greater)
        }
        RuleOperator::LessThan => compare_numbers(source_value, &rule.value) == Some(Ordering::Less),
    }
}

/// Visibility of every field in the form, keyed by field id.
pub fn resolve_visibility(spec: &FormSpec, answers: &Value) -> VisibilityMap {
    spec.fields
        .iter()
        .map(|field| (field.id.clone(), is_visible(field, answers, &spec.fields)))
        .collect()
}

/// Visible fields in render order.
pub fn visible_fields<'a>(spec: &'a FormSpec, answers: &Value) -> Vec<&'a Field> {
    spec.ordered()
        .into_iter()
        .filter(|field| is_visible(field, answers, &spec.fields))
        .collect()
}

/// String form of an answer used by the text operators.
pub fn value_text(value: Option<&Value>) -> Cow<'_, str> {
    match value {
        None | Some(Value::Null) => Cow::Borrowed(""),
        Some(Value::String(text)) => Cow::Borrowed(text.as_str()),
        Some(Value::Bool(true)) => Cow::Borrowed("true"),
        Some(Value::Bool(false)) => Cow::Borrowed("false"),
        Some(Value::Number(number)) => Cow::Owned(number_text(number)),
        Some(Value::Array(items)) => Cow::Owned(
            items
                .iter()
                .map(|item| value_text(Some(item)))
                .collect::<Vec<_>>()
                .join(","),
        ),
        Some(other) => Cow::Owned(other.to_string()),
    }
}

/// `false`, `null`, `""` and `[]` count as not filled.
pub fn is_filled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Whole floats print without a fraction so `12.0` reads the same as `12`.
fn number_text(number: &Number) -> String {
    match number.as_f64() {
        Some(float) if number.is_f64() && float.fract() == 0.0 && float.abs() < 9.0e15 => {
            format!("{}", float as i64)
        }
        _ => number.to_string(),
    }
}

fn equals_ignore_case(left: &str, right: &str) -> bool {
    left == right || left.to_lowercase() == right.to_lowercase()
}

fn compare_numbers(value: Option<&Value>, literal: &str) -> Option<Ordering> {
    let left = match value? {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    let right = literal.trim().parse::<f64>().ok()?;
    left.partial_cmp(&right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_text_joins_arrays() {
        let value = json!(["Red", "Blue"]);
        assert_eq!(value_text(Some(&value)), "Red,Blue");
        assert_eq!(value_text(Some(&json!(42))), "42");
        assert_eq!(value_text(None), "");
    }

    #[test]
    fn equality_ignores_case_without_trimming() {
        assert!(equals_ignore_case("YES", "yes"));
        assert!(!equals_ignore_case("yes ", "yes"));
        assert!(equals_ignore_case("", ""));
    }

    #[test]
    fn text_operators_share_case_folding() {
        let rule = |operator| ConditionalRule::new(RuleAction::Show, "f1", operator, "ΟΔΟΣ");
        let answer = json!("οδος");
        assert!(evaluate_condition(&rule(RuleOperator::Equals), Some(&answer)));
        assert!(evaluate_condition(&rule(RuleOperator::Contains), Some(&answer)));
        assert!(!evaluate_condition(&rule(RuleOperator::NotEquals), Some(&answer)));
    }

    #[test]
    fn whole_floats_read_like_integers() {
        assert_eq!(value_text(Some(&json!(12.0))), "12");
        assert_eq!(value_text(Some(&json!(12.5))), "12.5");
        assert_eq!(value_text(Some(&json!(-3))), "-3");
        let rule = ConditionalRule::new(RuleAction::Show, "f1", RuleOperator::Equals, "12");
        assert!(evaluate_condition(&rule, Some(&json!(12.0))));
    }

    #[test]
    fn numbers_compare_from_strings_and_numbers() {
        assert_eq!(compare_numbers(Some(&json!(18)), "16"), Some(Ordering::Greater));
        assert_eq!(compare_numbers(Some(&json!("3.5")), " 4 "), Some(Ordering::Less));
        assert_eq!(compare_numbers(Some(&json!("abc")), "4"), None);
        assert_eq!(compare_numbers(None, "4"), None);
    }
}
