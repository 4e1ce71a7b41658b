use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::{Field, ordered_fields};

/// Top-level form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Published forms accept public submissions.
    #[serde(default)]
    pub published: bool,
    /// Handlebars template shown after a successful submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl FormSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            published: false,
            success_message: None,
            fields: Vec::new(),
        }
    }

    pub fn field(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Fields in render order.
    pub fn ordered(&self) -> Vec<&Field> {
        ordered_fields(&self.fields)
    }
}
