use serde_json::{Map, Value, json};

use crate::{
    progress::{answered_count, next_field, visible_count},
    spec::{field::FieldType, form::FormSpec},
    visibility::{resolve_visibility, value_text},
};

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// A visible required field is still unanswered.
    NeedInput,
    /// All visible required fields are filled.
    Complete,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Complete => "complete",
        }
    }
}

/// Progress counters exposed to renderers.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

/// Describes a single field for render outputs.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub placeholder: Option<String>,
    pub kind: FieldType,
    pub required: bool,
    pub visible: bool,
    pub current_value: Option<Value>,
    pub options: Option<Vec<String>>,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_name: String,
    pub published: bool,
    pub status: RenderStatus,
    pub next_field_id: Option<String>,
    pub progress: RenderProgress,
    pub help: Option<String>,
    /// Fields in render order.
    pub fields: Vec<RenderField>,
}

impl RenderPayload {
    pub fn field(&self, id: &str) -> Option<&RenderField> {
        self.fields.iter().find(|field| field.id == id)
    }
}

/// Build the renderer payload from the form and the answers so far.
pub fn build_render_payload(spec: &FormSpec, answers: &Value) -> RenderPayload {
    let visibility = resolve_visibility(spec, answers);
    let next_field_id = next_field(spec, answers, &visibility);
    let answered = answered_count(spec, answers, &visibility);
    let total = visible_count(&visibility);

    let fields = spec
        .ordered()
        .into_iter()
        .map(|field| RenderField {
            id: field.id.clone(),
            name: field.name.clone(),
            label: field.label.clone(),
            description: field.description.clone(),
            placeholder: field.placeholder.clone(),
            kind: field.kind,
            required: field.required,
            visible: visibility.get(&field.id).copied().unwrap_or(true),
            current_value: answers.get(&field.name).cloned(),
            options: field.options.clone(),
        })
        .collect::<Vec<_>>();

    let status = if next_field_id.is_some() {
        RenderStatus::NeedInput
    } else {
        RenderStatus::Complete
    };

    RenderPayload {
        form_id: spec.id.clone(),
        form_name: spec.name.clone(),
        published: spec.published,
        status,
        next_field_id,
        progress: RenderProgress { answered, total },
        help: spec.description.clone(),
        fields,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(field.id.clone()));
            map.insert("name".into(), Value::String(field.name.clone()));
            map.insert("label".into(), Value::String(field.label.clone()));
            map.insert(
                "description".into(),
                field
                    .description
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            if let Some(placeholder) = &field.placeholder {
                map.insert("placeholder".into(), Value::String(placeholder.clone()));
            }
            map.insert("type".into(), Value::String(field.kind.as_str().into()));
            map.insert("required".into(), Value::Bool(field.required));
            if let Some(current_value) = &field.current_value {
                map.insert("current_value".into(), current_value.clone());
            }
            if let Some(options) = &field.options {
                map.insert(
                    "options".into(),
                    Value::Array(options.iter().cloned().map(Value::String).collect()),
                );
            }
            map.insert("visible".into(), Value::Bool(field.visible));
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": payload.form_id,
        "form_name": payload.form_name,
        "published": payload.published,
        "status": payload.status.as_str(),
        "next_field_id": payload.next_field_id,
        "progress": {
            "answered": payload.progress.answered,
            "total": payload.progress.total,
        },
        "help": payload.help,
        "fields": fields,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", payload.form_name, payload.form_id));
    lines.push(format!(
        "Status: {} ({}/{})",
        payload.status.as_str(),
        payload.progress.answered,
        payload.progress.total
    ));
    if let Some(help) = &payload.help {
        lines.push(format!("Help: {}", help));
    }

    if let Some(next_id) = &payload.next_field_id {
        lines.push(format!("Next field: {}", next_id));
        if let Some(field) = payload.field(next_id) {
            lines.push(format!("  Label: {}", field.label));
            if let Some(description) = &field.description {
                lines.push(format!("  Description: {}", description));
            }
            if let Some(options) = &field.options {
                lines.push(format!("  Options: {}", options.join(", ")));
            }
        }
    } else {
        lines.push("All visible required fields are answered.".to_string());
    }

    lines.push("Visible fields:".to_string());
    for field in payload.fields.iter().filter(|field| field.visible) {
        let mut entry = format!(" - {} ({}, {})", field.name, field.label, field.kind);
        if field.required {
            entry.push_str(" [required]");
        }
        if let Some(current_value) = &field.current_value {
            entry.push_str(&format!(" = {}", value_text(Some(current_value))));
        }
        lines.push(entry);
    }

    lines.join("\n")
}
