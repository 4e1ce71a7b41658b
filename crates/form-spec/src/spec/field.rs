use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::rule::ConditionalRule;

/// Supported field input types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Email,
    Phone,
    Number,
    Paragraph,
    SingleChoice,
    MultiChoice,
    Boolean,
    Date,
}

impl FieldType {
    /// Choice types are the only ones that carry an options list.
    pub fn is_choice(self) -> bool {
        matches!(self, FieldType::SingleChoice | FieldType::MultiChoice)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Number => "number",
            FieldType::Paragraph => "paragraph",
            FieldType::SingleChoice => "single_choice",
            FieldType::MultiChoice => "multi_choice",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "text" | "string" | "short_text" => Ok(FieldType::Text),
            "email" => Ok(FieldType::Email),
            "phone" | "tel" | "telephone" => Ok(FieldType::Phone),
            "number" | "integer" | "numeric" => Ok(FieldType::Number),
            "paragraph" | "textarea" | "long_text" => Ok(FieldType::Paragraph),
            "single_choice" | "single-choice" | "select" | "radio" | "dropdown" | "enum" => {
                Ok(FieldType::SingleChoice)
            }
            "multi_choice" | "multi-choice" | "multiple_choice" | "checkbox" | "checkboxes" => {
                Ok(FieldType::MultiChoice)
            }
            "boolean" | "bool" | "toggle" | "yes_no" => Ok(FieldType::Boolean),
            "date" => Ok(FieldType::Date),
            _ => Err(format!("unknown field type '{}'", value)),
        }
    }
}

/// One input element of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Field {
    pub id: String,
    /// Key under which the answer is stored.
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_rule: Option<ConditionalRule>,
}

impl Field {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        label: impl Into<String>,
        kind: FieldType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            label: label.into(),
            kind,
            description: None,
            placeholder: None,
            options: None,
            required: false,
            position: 0,
            conditional_rule: None,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn at(mut self, position: i64) -> Self {
        self.position = position;
        self
    }

    pub fn with_rule(mut self, rule: ConditionalRule) -> Self {
        self.conditional_rule = Some(rule);
        self
    }
}

/// Fields in render order. Ties keep their declared order.
pub fn ordered_fields(fields: &[Field]) -> Vec<&Field> {
    let mut ordered = fields.iter().collect::<Vec<_>>();
    ordered.sort_by_key(|field| field.position);
    ordered
}
