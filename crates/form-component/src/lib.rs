use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use form_spec::{
    FormSpec, GenerateError, RenderPayload, SubmissionMeta, TemplateError, ValidationResult,
    build_render_payload, decode_response, generate::ensure_form_name, lint_form, prune_hidden,
    render_json_ui as spec_render_json_ui, render_success_message,
    render_text as spec_render_text, resolve_visibility, validate, visible_fields, with_answer,
};

const DEFAULT_SPEC: &str = include_str!("../../form-spec/tests/fixtures/newsletter_form.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse answers: {0}")]
    AnswersParse(#[source] serde_json::Error),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("form '{0}' is not published")]
    NotPublished(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_spec_json: Option<String>,
}

/// Submission context supplied by the host.
#[derive(Debug, Deserialize, Default)]
struct SubmitContext {
    #[serde(default)]
    user_agent: Option<String>,
    #[serde(default)]
    client_ip: Option<String>,
    /// Allows submitting unpublished forms from the editor preview.
    #[serde(default)]
    preview: bool,
}

fn load_form_spec(config_json: &str) -> Result<FormSpec, ComponentError> {
    let config = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    let spec_json = config.form_spec_json.as_deref().unwrap_or(DEFAULT_SPEC);

    serde_json::from_str(spec_json).map_err(ComponentError::ConfigParse)
}

fn ensure_form(form_id: &str, config_json: &str) -> Result<FormSpec, ComponentError> {
    let spec = load_form_spec(config_json)?;
    if spec.id != form_id {
        warn!(requested = form_id, loaded = %spec.id, "form id mismatch");
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        Ok(spec)
    }
}

fn parse_answers(answers_json: &str) -> Value {
    serde_json::from_str(answers_json).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn parse_context(ctx_json: &str) -> SubmitContext {
    serde_json::from_str(ctx_json).unwrap_or_default()
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(
        ensure_form(form_id, config_json)
            .and_then(|spec| serde_json::to_value(spec).map_err(ComponentError::JsonEncode)),
    )
}

pub fn get_visibility(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).map(|spec| {
        let answers = parse_answers(answers_json);
        let visibility = resolve_visibility(&spec, &answers);
        let visible = visible_fields(&spec, &answers)
            .into_iter()
            .map(|field| field.name.clone())
            .collect::<Vec<_>>();
        json!({
            "visibility": visibility,
            "visible_fields": visible,
        })
    }))
}

pub fn validate_answers(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let answers = serde_json::from_str(answers_json).map_err(ComponentError::AnswersParse)?;
        serde_json::to_value(validate(&spec, &answers)).map_err(ComponentError::JsonEncode)
    }))
}

pub fn lint(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let issues = lint_form(&spec);
        let issues = serde_json::to_value(issues).map_err(ComponentError::JsonEncode)?;
        Ok(json!({ "issues": issues }))
    }))
}

pub fn next(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).map(|spec| {
        let answers = parse_answers(answers_json);
        let payload = build_render_payload(&spec, &answers);
        json!({
            "status": payload.status.as_str(),
            "next_field_id": payload.next_field_id,
            "progress": submission_progress(&payload),
        })
    }))
}

fn render_payload(
    form_id: &str,
    config_json: &str,
    answers_json: &str,
) -> Result<RenderPayload, ComponentError> {
    let spec = ensure_form(form_id, config_json)?;
    let answers = parse_answers(answers_json);
    Ok(build_render_payload(&spec, &answers))
}

pub fn render_text(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond_string(
        render_payload(form_id, config_json, answers_json)
            .map(|payload| spec_render_text(&payload)),
    )
}

pub fn render_json_ui(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(
        render_payload(form_id, config_json, answers_json)
            .map(|payload| spec_render_json_ui(&payload)),
    )
}

fn submission_progress(payload: &RenderPayload) -> Value {
    json!({
        "answered": payload.progress.answered,
        "total": payload.progress.total,
    })
}

fn build_error_response(
    payload: &RenderPayload,
    answers: Value,
    validation: &ValidationResult,
) -> Result<Value, ComponentError> {
    let validation_value = serde_json::to_value(validation).map_err(ComponentError::JsonEncode)?;
    Ok(json!({
        "status": "error",
        "next_field_id": payload.next_field_id,
        "progress": submission_progress(payload),
        "answers": answers,
        "validation": validation_value,
    }))
}

/// Narrows a full validation run to the problems caused by `field_name`.
///
/// Errors on other fields and stray keys already in the answer set do not block
/// the patch; `submit_all` reports them.
fn patch_validation(spec: &FormSpec, answers: &Value, field_name: &str) -> ValidationResult {
    let full = validate(spec, answers);
    let field_id = spec.field_by_name(field_name).map(|field| field.id.as_str());
    let errors: Vec<_> = full
        .errors
        .into_iter()
        .filter(|error| field_id.is_some() && error.field_id.as_deref() == field_id)
        .collect();
    let unknown_fields: Vec<_> = full
        .unknown_fields
        .into_iter()
        .filter(|name| name == field_name)
        .collect();
    ValidationResult {
        valid: errors.is_empty() && unknown_fields.is_empty(),
        errors,
        missing_required: Vec::new(),
        unknown_fields,
    }
}

/// Records one answer, then reports validation and progress for the whole form.
///
/// Missing required answers are not an error here; the form is simply not
/// complete yet.
pub fn submit_patch(
    form_id: &str,
    config_json: &str,
    answers_json: &str,
    field_name: &str,
    value_json: &str,
) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let value: Value = serde_json::from_str(value_json).map_err(ComponentError::AnswersParse)?;
        let answers = with_answer(&parse_answers(answers_json), field_name, value);
        let validation = patch_validation(&spec, &answers, field_name);
        let payload = build_render_payload(&spec, &answers);

        if !validation.valid {
            return build_error_response(&payload, answers, &validation);
        }

        Ok(json!({
            "status": payload.status.as_str(),
            "next_field_id": payload.next_field_id,
            "progress": submission_progress(&payload),
            "answers": answers,
        }))
    }))
}

/// Validates the full answer set and finalizes it into a submission.
///
/// Answers for hidden fields are dropped before the submission is built.
pub fn submit_all(form_id: &str, config_json: &str, ctx_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let ctx = parse_context(ctx_json);
        if !spec.published && !ctx.preview {
            return Err(ComponentError::NotPublished(spec.id.clone()));
        }

        let answers = parse_answers(answers_json);
        let validation = validate(&spec, &answers);
        let payload = build_render_payload(&spec, &answers);
        if !validation.valid {
            debug!(form_id, "submission rejected by validation");
            return build_error_response(&payload, answers, &validation);
        }

        let answers = prune_hidden(&spec, &answers);
        let message = render_success_message(&spec, &answers)?;
        let meta = SubmissionMeta {
            user_agent: ctx.user_agent,
            client_ip: ctx.client_ip,
            ..SubmissionMeta::now()
        };
        let submission = form_spec::Submission::new(&spec.id, answers, meta);
        debug!(form_id, submission_id = %submission.id, "submission accepted");
        let submission = serde_json::to_value(&submission).map_err(ComponentError::JsonEncode)?;

        Ok(json!({
            "status": "complete",
            "progress": submission_progress(&payload),
            "submission": submission,
            "message": message,
        }))
    }))
}

/// Builds a draft form from a field generator response.
pub fn import_generated(form_id: &str, form_name: &str, status: u16, body: &str) -> String {
    respond(
        ensure_form_name(form_name)
            .and_then(|_| decode_response(status, body))
            .map_err(ComponentError::from)
            .and_then(|fields| {
                let mut spec = FormSpec::new(form_id, form_name.trim());
                spec.fields = fields;
                debug!(form_id, count = spec.fields.len(), "imported generated fields");
                serde_json::to_value(spec).map_err(ComponentError::JsonEncode)
            }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FORM_ID: &str = "newsletter-signup";

    fn draft_config() -> String {
        let mut spec: Value = serde_json::from_str(DEFAULT_SPEC).expect("default spec");
        spec["published"] = json!(false);
        json!({ "form_spec_json": spec.to_string() }).to_string()
    }

    #[test]
    fn describe_returns_spec_json() {
        let payload = describe(FORM_ID, "");
        let spec: Value = serde_json::from_str(&payload).expect("valid json");
        assert_eq!(spec["id"], FORM_ID);
    }

    #[test]
    fn describe_rejects_other_form_ids() {
        let payload = describe("other-form", "");
        let parsed: Value = serde_json::from_str(&payload).expect("json");
        assert_eq!(parsed["error"], "form 'other-form' is not available");
    }

    #[test]
    fn malformed_config_is_reported() {
        let payload = describe(FORM_ID, "{not json");
        let parsed: Value = serde_json::from_str(&payload).expect("json");
        assert!(
            parsed["error"]
                .as_str()
                .unwrap_or_default()
                .starts_with("failed to parse config")
        );
    }

    #[test]
    fn visibility_lists_visible_field_names() {
        let response = get_visibility(FORM_ID, "", r#"{"subscribe":"Yes"}"#);
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["visibility"]["f3"], true);
        assert_eq!(parsed["visibility"]["f4"], false);
        assert_eq!(
            parsed["visible_fields"],
            json!(["full_name", "subscribe", "email"])
        );
    }

    #[test]
    fn validate_answers_reports_valid_when_complete() {
        let answers = json!({ "full_name": "Ada", "subscribe": "No" });
        let result = validate_answers(FORM_ID, "", &answers.to_string());
        let parsed: Value = serde_json::from_str(&result).expect("json");
        assert!(parsed["valid"].as_bool().unwrap_or(false));
    }

    #[test]
    fn validate_answers_rejects_unparseable_answers() {
        let result = validate_answers(FORM_ID, "", "nope");
        let parsed: Value = serde_json::from_str(&result).expect("json");
        assert!(parsed.get("error").is_some());
    }

    #[test]
    fn next_returns_progress_payload() {
        let response = next(FORM_ID, "", r#"{"full_name": "Ada", "subscribe": "Yes"}"#);
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["status"], "need_input");
        assert_eq!(parsed["next_field_id"], "f3");
        assert_eq!(parsed["progress"]["answered"], 2);
        assert_eq!(parsed["progress"]["total"], 3);
    }

    #[test]
    fn lint_reports_no_issues_for_default_form() {
        let response = lint(FORM_ID, "");
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["issues"], json!([]));
    }

    #[test]
    fn render_text_outputs_summary() {
        let output = render_text(FORM_ID, "", "{}");
        assert!(output.contains("Form:"));
        assert!(output.contains("Visible fields"));
    }

    #[test]
    fn render_json_ui_outputs_json_payload() {
        let payload = render_json_ui(FORM_ID, "", r#"{"full_name":"Ada"}"#);
        let parsed: Value = serde_json::from_str(&payload).expect("json");
        assert_eq!(parsed["form_id"], FORM_ID);
        assert_eq!(parsed["progress"]["total"], 2);
    }

    #[test]
    fn submit_patch_reveals_conditional_field() {
        let response = submit_patch(FORM_ID, "", r#"{"full_name":"Ada"}"#, "subscribe", r#""Yes""#);
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["status"], "need_input");
        assert_eq!(parsed["next_field_id"], "f3");
        assert_eq!(parsed["answers"]["subscribe"], "Yes");
    }

    #[test]
    fn submit_patch_ignores_problems_on_other_fields() {
        let answers = json!({ "full_name": 42, "utm_source": "mail" });
        let response = submit_patch(FORM_ID, "", &answers.to_string(), "subscribe", r#""No""#);
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["status"], "complete");
        assert_eq!(parsed["answers"]["subscribe"], "No");
        assert_eq!(parsed["answers"]["utm_source"], "mail");
    }

    #[test]
    fn submit_patch_rejects_unknown_patched_field() {
        let response = submit_patch(FORM_ID, "", "{}", "nickname", r#""Ada""#);
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["status"], "error");
        assert_eq!(parsed["validation"]["unknown_fields"], json!(["nickname"]));
    }

    #[test]
    fn submit_patch_returns_validation_error() {
        let response = submit_patch(FORM_ID, "", "{}", "subscribe", r#""Maybe""#);
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["status"], "error");
        assert_eq!(parsed["validation"]["errors"][0]["code"], "invalid_option");
    }

    #[test]
    fn submit_all_completes_and_prunes_hidden_answers() {
        let answers = json!({
            "full_name": "Ada",
            "subscribe": "No",
            "email": "ada@example.com",
            "reason": "Too many emails"
        });
        let ctx = json!({ "user_agent": "tests/1.0" });
        let response = submit_all(FORM_ID, "", &ctx.to_string(), &answers.to_string());
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["status"], "complete");
        assert_eq!(parsed["submission"]["form_id"], FORM_ID);
        assert_eq!(parsed["submission"]["meta"]["user_agent"], "tests/1.0");
        assert!(parsed["submission"]["answers"].get("email").is_none());
        assert_eq!(parsed["submission"]["answers"]["reason"], "Too many emails");
        assert_eq!(parsed["message"], "Thanks Ada, you're on the list!");
    }

    #[test]
    fn submit_all_reports_missing_required() {
        let response = submit_all(FORM_ID, "", "{}", r#"{"full_name":"Ada","subscribe":"Yes"}"#);
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["status"], "error");
        assert_eq!(parsed["validation"]["missing_required"], json!(["email"]));
    }

    #[test]
    fn submit_all_requires_published_form_unless_previewing() {
        let answers = r#"{"full_name":"Ada","subscribe":"No"}"#;
        let config = draft_config();

        let response = submit_all(FORM_ID, &config, "{}", answers);
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["error"], "form 'newsletter-signup' is not published");

        let response = submit_all(FORM_ID, &config, r#"{"preview":true}"#, answers);
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["status"], "complete");
    }

    #[test]
    fn import_generated_builds_form() {
        let body = r#"[{"name":"name","type":"text","required":true},{"name":"plan","type":"radio","options":["Free","Pro"]}]"#;
        let response = import_generated("signup", "Signup", 200, body);
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["name"], "Signup");
        assert_eq!(parsed["fields"][1]["type"], "single_choice");
        assert_eq!(parsed["fields"][1]["position"], 1);
    }

    #[test]
    fn import_generated_surfaces_generator_failures() {
        let response = import_generated("signup", "Signup", 429, r#"{"error":{"message":"slow down"}}"#);
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["error"], "field generator is rate limited; retry later");

        let response = import_generated("signup", " ", 200, "[]");
        let parsed: Value = serde_json::from_str(&response).expect("json");
        assert_eq!(parsed["error"], "form name cannot be empty");
    }
}
