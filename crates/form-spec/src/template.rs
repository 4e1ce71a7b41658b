use handlebars::{Handlebars, handlebars_helper, no_escape};
use serde_json::{Value, json};
use thiserror::Error;

use crate::spec::form::FormSpec;
use crate::visibility::value_text;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to render template: {0}")]
    Render(#[from] handlebars::RenderError),
}

handlebars_helper!(join: |items: array, separator: str| {
    items
        .iter()
        .map(|item| value_text(Some(item)).into_owned())
        .collect::<Vec<_>>()
        .join(separator)
});

/// Plain-text engine: no HTML escaping, missing keys render empty.
pub fn engine() -> Handlebars<'static> {
    let mut engine = Handlebars::new();
    engine.register_escape_fn(no_escape);
    engine.set_strict_mode(false);
    engine.register_helper("join", Box::new(join));
    engine
}

/// Renders the form's success message against the submitted answers.
///
/// Returns `Ok(None)` when the form has no success message.
pub fn render_success_message(
    spec: &FormSpec,
    answers: &Value,
) -> Result<Option<String>, TemplateError> {
    let Some(template) = spec.success_message.as_deref() else {
        return Ok(None);
    };
    let data = json!({
        "form": { "id": spec.id, "name": spec.name },
        "answers": answers,
    });
    let rendered = engine().render_template(template, &data)?;
    Ok(Some(rendered))
}
