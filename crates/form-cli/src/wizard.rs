use std::fmt::Write;

use form_spec::{FieldType, Submission};
use serde_json::Value;

/// Controls which bits of state the fill loop prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: field prompts only.
    Clean,
    /// Verbose output: status, visible fields, error details, help text.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints prompts and progress while a form is being filled.
pub struct FillPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    show_answers_json: bool,
}

impl FillPresenter {
    pub fn new(verbosity: Verbosity, show_answers_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            show_answers_json,
        }
    }

    pub fn show_header(&mut self, payload: &FillPayload) {
        if self.header_printed {
            return;
        }
        println!("Form: {}", payload.form_name);
        if let Some(help) = &payload.help {
            println!("{}", help);
        }
        self.header_printed = true;
    }

    pub fn show_status(&self, payload: &FillPayload) {
        if !self.verbosity.is_verbose() {
            return;
        }
        println!(
            "Status: {} ({}/{})",
            payload.status, payload.progress.answered, payload.progress.total
        );
        println!("Visible fields:");
        for field in payload.fields.iter().filter(|field| field.visible) {
            let mut entry = format!(" - {} ({})", field.name, field.label);
            if field.required {
                entry.push_str(" [required]");
            }
            println!("{}", entry);
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = format!("{}/{} {}", prompt.index, prompt.total, prompt.label);
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        println!("{}", line);
        if let Some(description) = &prompt.description {
            println!("{}", description);
        }
        if let Some(placeholder) = &prompt.placeholder {
            println!("e.g. {}", placeholder);
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_completion(&self, submission: &Submission, message: Option<&str>) {
        println!("Done ✅");
        if let Some(message) = message {
            println!("{}", message);
        }
        if self.verbosity.is_verbose() {
            match submission.to_cbor() {
                Ok(bytes) => println!("Submission (CBOR hex): {}", encode_hex(&bytes)),
                Err(err) => eprintln!("Failed to serialize submission to CBOR: {}", err),
            }
        }
        if self.show_answers_json {
            match submission.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => eprintln!("Failed to serialize submission to JSON: {}", err),
            }
        }
    }
}

/// Render payload extracted from the component output.
pub struct FillPayload {
    pub form_name: String,
    pub help: Option<String>,
    pub status: String,
    pub progress: FillProgress,
    pub fields: Vec<FillField>,
}

impl FillPayload {
    pub fn from_json(json: &Value) -> Result<Self, String> {
        let form_name = json
            .get("form_name")
            .and_then(Value::as_str)
            .ok_or_else(|| "render payload missing form_name".to_string())?
            .to_string();
        let help = json
            .get("help")
            .and_then(Value::as_str)
            .map(|value| value.to_string());
        let status = json
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("need_input")
            .to_string();
        let progress = json
            .get("progress")
            .and_then(Value::as_object)
            .ok_or_else(|| "render payload missing progress".to_string())?;
        let answered = progress
            .get("answered")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;
        let total = progress.get("total").and_then(Value::as_u64).unwrap_or(0) as usize;
        let fields = json
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| "render payload missing fields".to_string())?
            .iter()
            .map(FillField::from_json)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            form_name,
            help,
            status,
            progress: FillProgress { answered, total },
            fields,
        })
    }

    /// First visible field, in render order, not yet prompted for.
    pub fn next_unasked<'a>(&'a self, asked: &[String]) -> Option<&'a FillField> {
        self.fields
            .iter()
            .find(|field| field.visible && !asked.contains(&field.id))
    }

    /// 1-based index of `field` among the visible fields.
    pub fn visible_index(&self, field: &FillField) -> usize {
        self.fields
            .iter()
            .filter(|candidate| candidate.visible)
            .position(|candidate| candidate.id == field.id)
            .map_or(1, |index| index + 1)
    }

    pub fn visible_count(&self) -> usize {
        self.fields.iter().filter(|field| field.visible).count()
    }
}

pub struct FillProgress {
    pub answered: usize,
    pub total: usize,
}

/// Minimal view of a field used for prompting.
pub struct FillField {
    pub id: String,
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub placeholder: Option<String>,
    pub kind: FieldType,
    pub required: bool,
    pub options: Vec<String>,
    pub visible: bool,
}

impl FillField {
    fn from_json(value: &Value) -> Result<Self, String> {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(String::from);
        let id = text("id").ok_or_else(|| "field missing id".to_string())?;
        let name = text("name").ok_or_else(|| format!("field '{}' missing name", id))?;
        let label = text("label").unwrap_or_else(|| name.clone());
        let kind = text("type")
            .as_deref()
            .unwrap_or("text")
            .parse::<FieldType>()?;
        let options = value
            .get("options")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(Self {
            description: text("description"),
            placeholder: text("placeholder"),
            required: value
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            visible: value.get("visible").and_then(Value::as_bool).unwrap_or(true),
            id,
            name,
            label,
            kind,
            options,
        })
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub index: usize,
    pub total: usize,
    pub label: String,
    pub description: Option<String>,
    pub placeholder: Option<String>,
    pub required: bool,
    pub hint: Option<String>,
}

impl PromptContext {
    pub fn new(field: &FillField, payload: &FillPayload) -> Self {
        Self {
            index: payload.visible_index(field),
            total: payload.visible_count(),
            label: field.label.clone(),
            description: field.description.clone(),
            placeholder: field.placeholder.clone(),
            required: field.required,
            hint: type_hint(field.kind, &field.options),
        }
    }
}

fn type_hint(kind: FieldType, options: &[String]) -> Option<String> {
    match kind {
        FieldType::Boolean => Some("(yes/no)".to_string()),
        FieldType::Number => Some("(number)".to_string()),
        FieldType::Date => Some("(YYYY-MM-DD)".to_string()),
        FieldType::SingleChoice if !options.is_empty() => {
            Some(format!("({})", options.join("/")))
        }
        FieldType::MultiChoice if !options.is_empty() => {
            Some(format!("(comma separated: {})", options.join(", ")))
        }
        _ => None,
    }
}

/// Error produced when parsing answers typed by the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(&mut encoded, "{:02x}", byte).expect("writing to string cannot fail");
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> FillPayload {
        FillPayload::from_json(&json!({
            "form_name": "Signup",
            "status": "need_input",
            "progress": { "answered": 0, "total": 2 },
            "fields": [
                { "id": "f1", "name": "name", "label": "Name", "type": "text", "visible": true },
                { "id": "f2", "name": "email", "label": "Email", "type": "email", "visible": false },
                { "id": "f3", "name": "plan", "label": "Plan", "type": "single_choice",
                  "options": ["Free", "Pro"], "required": true, "visible": true }
            ]
        }))
        .expect("payload")
    }

    #[test]
    fn next_unasked_skips_hidden_and_asked_fields() {
        let payload = payload();
        assert_eq!(payload.next_unasked(&[]).map(|f| f.id.as_str()), Some("f1"));
        let asked = vec!["f1".to_string()];
        let next = payload.next_unasked(&asked).expect("next field");
        assert_eq!(next.id, "f3");
        assert_eq!(payload.visible_index(next), 2);
        assert_eq!(payload.visible_count(), 2);
    }

    #[test]
    fn prompt_context_hints_choices() {
        let payload = payload();
        let plan = &payload.fields[2];
        let prompt = PromptContext::new(plan, &payload);
        assert_eq!(prompt.hint.as_deref(), Some("(Free/Pro)"));
        assert!(prompt.required);
    }

    #[test]
    fn payload_requires_fields() {
        let result = FillPayload::from_json(&json!({
            "form_name": "x",
            "progress": { "answered": 0, "total": 0 }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn hex_encoding_is_lowercase() {
        assert_eq!(encode_hex(&[0x0a, 0xff]), "0aff");
    }
}
