use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Whether a satisfied condition shows or hides the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    #[default]
    Show,
    Hide,
}

/// Comparison applied to the source field's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    Equals,
    NotEquals,
    Contains,
    NotEmpty,
    GreaterThan,
    LessThan,
}

impl RuleOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleOperator::Equals => "equals",
            RuleOperator::NotEquals => "not_equals",
            RuleOperator::Contains => "contains",
            RuleOperator::NotEmpty => "not_empty",
            RuleOperator::GreaterThan => "greater_than",
            RuleOperator::LessThan => "less_than",
        }
    }

    /// `not_empty` ignores the rule literal.
    pub fn uses_value(self) -> bool {
        !matches!(self, RuleOperator::NotEmpty)
    }
}

/// Declarative show/hide condition referencing another field's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConditionalRule {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub action: RuleAction,
    pub source_field_id: String,
    pub operator: RuleOperator,
    #[serde(default)]
    pub value: String,
}

impl ConditionalRule {
    pub fn new(
        action: RuleAction,
        source_field_id: impl Into<String>,
        operator: RuleOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            enabled: true,
            action,
            source_field_id: source_field_id.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
