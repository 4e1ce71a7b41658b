use std::{
    fs, io,
    path::{Path, PathBuf},
};

use form_component::import_generated;
use form_spec::{FormSpec, lint_form};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Describes which generator response should become which form.
#[derive(Debug, Clone)]
pub struct ImportInput {
    pub form_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub status: u16,
    pub body: String,
}

/// Turns a field generator response into a draft form.
pub fn build_form(input: &ImportInput) -> Result<FormSpec, String> {
    let form_id = input
        .form_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| slugify(&input.name));
    if form_id.is_empty() {
        return Err("form id cannot be derived from an empty name".into());
    }

    let response = import_generated(&form_id, &input.name, input.status, &input.body);
    let value: Value = serde_json::from_str(&response).map_err(|err| err.to_string())?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(error.to_string());
    }
    let mut spec: FormSpec = serde_json::from_value(value).map_err(|err| err.to_string())?;
    spec.description = input.description.clone();

    for issue in lint_form(&spec) {
        warn!(code = %issue.code, "{}", issue.message);
    }
    debug!(form_id = %spec.id, fields = spec.fields.len(), "built draft form");
    Ok(spec)
}

/// Writes `<out_root>/<id>.form.json`, refusing to overwrite unless `force` is set.
pub fn write_form(spec: &FormSpec, out_root: &Path, force: bool) -> io::Result<PathBuf> {
    fs::create_dir_all(out_root)?;
    let path = out_root.join(format!("{}.form.json", sanitize_file_name(&spec.id)));
    if path.exists() && !force {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "form {} already exists; rerun with --force to overwrite",
                path.display()
            ),
        ));
    }
    write_json(&path, spec)?;
    Ok(path)
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn sanitize_file_name(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "form".into()
    } else {
        cleaned
    }
}

pub fn write_json(path: &Path, value: &impl Serialize) -> io::Result<()> {
    let contents = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    fs::write(path, contents)
}
