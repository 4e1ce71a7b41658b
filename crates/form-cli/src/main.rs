mod import;

mod wizard;

use clap::{Parser, Subcommand, ValueEnum};
use form_component::{render_json_ui, render_text, submit_all, submit_patch};
use form_spec::{
    FieldType, FormSpec, Submission, ValidationResult, lint_form, resolve_visibility, summarize,
    validate, visible_fields,
};
use import::{ImportInput, build_form, write_form, write_json};
use serde_json::{Map, Number, Value, json};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use wizard::{AnswerParseError, FillField, FillPayload, FillPresenter, PromptContext, Verbosity};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Form builder CLI",
    long_about = "Preview, validate and analyse forms with conditional field visibility"
)]
struct Cli {
    /// Log filter directive (e.g. `debug`, `form_spec=trace`).
    #[arg(long, global = true, env = "FORMCRAFT_LOG", default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Fill a form interactively, re-evaluating visibility after every answer.
    Fill {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Optional JSON file containing initial answers.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Show status, visible fields and parse expectations.
        #[arg(long, alias = "debug")]
        verbose: bool,
        /// Print the final submission as JSON.
        #[arg(long)]
        answers_json: bool,
        /// Write the final submission to this file.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Print which fields are visible for a set of answers.
    Visibility {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
    },
    /// Validate answers against a form.
    Validate {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Render the form state for a set of answers.
    Render {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Report structural problems in a form definition.
    Lint {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
    },
    /// Turn a saved field generator response into a draft form file.
    Import {
        /// Form name the fields were generated for.
        #[arg(long)]
        name: String,
        /// File holding the generator response body.
        #[arg(long, value_name = "RESPONSE")]
        response: PathBuf,
        /// HTTP status the generator answered with.
        #[arg(long, default_value_t = 200)]
        status: u16,
        /// Form id (defaults to a slug of the name).
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Output directory (defaults to FORMCRAFT_OUTPUT_DIR or the current directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Overwrite an existing form file.
        #[arg(long)]
        force: bool,
    },
    /// Summarize a JSON array of submissions for a form.
    Summary {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "SUBMISSIONS")]
        submissions: PathBuf,
    },
    /// Print the JSON Schema of the form definition format.
    Schema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    match cli.command {
        Command::Fill {
            form,
            answers,
            verbose,
            answers_json,
            out,
        } => run_fill(form, answers, verbose, answers_json, out),
        Command::Visibility { form, answers } => run_visibility(form, answers),
        Command::Validate { form, answers } => run_validate(form, answers),
        Command::Render {
            form,
            answers,
            format,
        } => run_render(form, answers, format),
        Command::Lint { form } => run_lint(form),
        Command::Import {
            name,
            response,
            status,
            id,
            description,
            out,
            force,
        } => run_import(
            ImportInput {
                form_id: id,
                name,
                description,
                status,
                body: fs::read_to_string(&response)?,
            },
            out,
            force,
        ),
        Command::Summary { form, submissions } => run_summary(form, submissions),
        Command::Schema => run_schema(),
    }
}

fn init_logging(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn load_form(path: &Path) -> CliResult<(FormSpec, String)> {
    let contents = fs::read_to_string(path)?;
    let spec: FormSpec = serde_json::from_str(&contents)?;
    debug!(form_id = %spec.id, fields = spec.fields.len(), path = %path.display(), "loaded form");
    Ok((spec, contents))
}

fn load_answers(path: Option<&Path>) -> CliResult<Value> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(Value::Object(Map::new())),
    }
}

fn component_config(spec_json: &str) -> String {
    json!({ "form_spec_json": spec_json }).to_string()
}

fn run_visibility(form_path: PathBuf, answers_path: Option<PathBuf>) -> CliResult<()> {
    let (spec, _) = load_form(&form_path)?;
    let answers = load_answers(answers_path.as_deref())?;
    let visibility = resolve_visibility(&spec, &answers);
    for field in spec.ordered() {
        let visible = visibility.get(&field.id).copied().unwrap_or(true);
        println!(
            "{} {} ({})",
            if visible { "visible" } else { "hidden " },
            field.name,
            field.label
        );
    }
    let count = visible_fields(&spec, &answers).len();
    println!("{} of {} fields visible", count, spec.fields.len());
    Ok(())
}

fn run_validate(form_path: PathBuf, answers_path: PathBuf) -> CliResult<()> {
    let (spec, _) = load_form(&form_path)?;
    let answers = load_answers(Some(&answers_path))?;

    let result = validate(&spec, &answers);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!(
                "  {} - {}",
                error.path.as_deref().unwrap_or("<unknown>"),
                error.message
            );
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            result.missing_required.join(", ")
        );
    }
    if !result.unknown_fields.is_empty() {
        println!(
            "Unknown answer fields: {}",
            result.unknown_fields.join(", ")
        );
    }
}

fn run_render(
    form_path: PathBuf,
    answers_path: Option<PathBuf>,
    format: RenderMode,
) -> CliResult<()> {
    let (spec, spec_json) = load_form(&form_path)?;
    let answers = load_answers(answers_path.as_deref())?.to_string();
    let config = component_config(&spec_json);
    match format {
        RenderMode::Text => {
            let text = render_text(&spec.id, &config, &answers);
            parse_component_error(&text)?;
            println!("{}", text);
        }
        RenderMode::Json => {
            let ui = parse_component_result(&render_json_ui(&spec.id, &config, &answers))?;
            println!("{}", serde_json::to_string_pretty(&ui)?);
        }
    }
    Ok(())
}

fn run_lint(form_path: PathBuf) -> CliResult<()> {
    let (spec, _) = load_form(&form_path)?;
    let issues = lint_form(&spec);
    if issues.is_empty() {
        println!("No issues found in {}", spec.id);
        return Ok(());
    }
    for issue in &issues {
        println!(
            "{} [{}] {}",
            issue.field_id.as_deref().unwrap_or("<form>"),
            issue.code,
            issue.message
        );
    }
    Err(format!("{} issue(s) found", issues.len()).into())
}

fn run_import(input: ImportInput, out_dir: Option<PathBuf>, force: bool) -> CliResult<()> {
    let spec = build_form(&input)?;
    let out_root = resolve_output_root(out_dir)?;
    let path = write_form(&spec, &out_root, force)?;
    info!(path = %path.display(), "wrote draft form");
    println!(
        "Imported {} field(s) into {}",
        spec.fields.len(),
        path.display()
    );
    Ok(())
}

fn resolve_output_root(out: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = match out {
        Some(path) => path,
        None => env::var_os("FORMCRAFT_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    if candidate.as_os_str().is_empty() {
        return Err("output directory cannot be empty".into());
    }
    Ok(candidate)
}

fn run_summary(form_path: PathBuf, submissions_path: PathBuf) -> CliResult<()> {
    let (spec, _) = load_form(&form_path)?;
    let submissions: Vec<Submission> =
        serde_json::from_str(&fs::read_to_string(submissions_path)?)?;
    let summary = summarize(&spec, &submissions);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(FormSpec);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run_fill(
    form_path: PathBuf,
    answers_path: Option<PathBuf>,
    verbose: bool,
    answers_json: bool,
    out: Option<PathBuf>,
) -> CliResult<()> {
    let (spec, spec_json) = load_form(&form_path)?;
    let form_id = spec.id.as_str();
    let config = component_config(&spec_json);
    let mut answers = initial_answers(&spec, load_answers(answers_path.as_deref())?);
    let mut presenter = FillPresenter::new(Verbosity::from_verbose(verbose), answers_json);
    let mut asked = preanswered_fields(&spec, &answers);

    loop {
        let answers_str = answers.to_string();
        let ui = parse_component_result(&render_json_ui(form_id, &config, &answers_str))?;
        let payload =
            FillPayload::from_json(&ui).map_err(|err| format!("render payload error: {}", err))?;
        presenter.show_header(&payload);

        let Some(field) = payload.next_unasked(&asked) else {
            break;
        };
        presenter.show_status(&payload);
        let prompt = PromptContext::new(field, &payload);
        let answer = prompt_field(&prompt, field, &presenter)?;
        asked.push(field.id.clone());

        let Some(answer) = answer else {
            if let Some(map) = answers.as_object_mut() {
                map.remove(&field.name);
            }
            continue;
        };
        let value_json = serde_json::to_string(&answer)?;
        let patched = parse_component_result(&submit_patch(
            form_id,
            &config,
            &answers_str,
            &field.name,
            &value_json,
        ))?;
        if patched["status"] == "error" {
            print_validation_errors(&patched);
            asked.pop();
            continue;
        }
        answers = patched["answers"].clone();
    }

    let ctx = json!({ "preview": true, "user_agent": concat!("formcraft/", env!("CARGO_PKG_VERSION")) });
    let result = parse_component_result(&submit_all(
        form_id,
        &config,
        &ctx.to_string(),
        &answers.to_string(),
    ))?;
    if result["status"] == "error" {
        print_validation_errors(&result);
        return Err("form is incomplete".into());
    }

    let submission: Submission = serde_json::from_value(result["submission"].clone())?;
    presenter.show_completion(&submission, result["message"].as_str());
    if let Some(path) = out {
        write_json(&path, &submission)?;
        info!(path = %path.display(), "wrote submission");
    }
    Ok(())
}

/// Drops answers for names the form does not define.
fn initial_answers(spec: &FormSpec, answers: Value) -> Value {
    let Value::Object(map) = answers else {
        return Value::Object(Map::new());
    };
    let kept = map
        .into_iter()
        .filter(|(name, _)| {
            let known = spec.field_by_name(name).is_some();
            if !known {
                warn!(answer = %name, "ignoring answer for unknown field");
            }
            known
        })
        .collect();
    Value::Object(kept)
}

/// Fields whose initial answer is present and valid; the fill loop skips them.
fn preanswered_fields(spec: &FormSpec, answers: &Value) -> Vec<String> {
    let validation = validate(spec, answers);
    spec.fields
        .iter()
        .filter(|field| answers.get(&field.name).is_some())
        .filter(|field| {
            !validation
                .errors
                .iter()
                .any(|error| error.field_id.as_deref() == Some(field.id.as_str()))
        })
        .map(|field| field.id.clone())
        .collect()
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

/// Text renders are plain text unless the component reported an error.
fn parse_component_error(response: &str) -> CliResult<()> {
    match serde_json::from_str::<Value>(response) {
        Ok(value) => match value.get("error").and_then(Value::as_str) {
            Some(error) => Err(error.into()),
            None => Ok(()),
        },
        Err(_) => Ok(()),
    }
}

fn prompt_field(
    prompt: &PromptContext,
    field: &FillField,
    presenter: &FillPresenter,
) -> CliResult<Option<Value>> {
    loop {
        presenter.show_prompt(prompt);
        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Err("input closed before the form was complete".into());
        }

        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            return Err("fill aborted by user".into());
        }

        match parse_answer(field, trimmed) {
            Ok(value) => return Ok(value),
            Err(err) => presenter.show_parse_error(&err),
        }
    }
}

/// Parses typed input for a field. `Ok(None)` means an optional field was skipped.
fn parse_answer(field: &FillField, raw: &str) -> Result<Option<Value>, AnswerParseError> {
    if raw.is_empty() {
        if field.required {
            return Err(AnswerParseError::new("This field requires an answer.", None));
        }
        return Ok(None);
    }

    let value = match field.kind {
        FieldType::Boolean => parse_boolean(raw)?,
        FieldType::Number => parse_number(raw)?,
        FieldType::SingleChoice => Value::String(parse_choice(&field.options, raw)?),
        FieldType::MultiChoice => {
            let choices = raw
                .split(',')
                .map(str::trim)
                .filter(|choice| !choice.is_empty())
                .map(|choice| parse_choice(&field.options, choice).map(Value::String))
                .collect::<Result<Vec<_>, _>>()?;
            Value::Array(choices)
        }
        _ => Value::String(raw.to_string()),
    };
    Ok(Some(value))
}

fn parse_boolean(raw: &str) -> Result<Value, AnswerParseError> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
        "false" | "f" | "no" | "n" | "0" => Ok(Value::Bool(false)),
        _ => Err(AnswerParseError::new(
            "Please enter yes or no.",
            Some("expected boolean (y/n/true/false)".to_string()),
        )),
    }
}

fn parse_number(raw: &str) -> Result<Value, AnswerParseError> {
    if let Ok(integer) = raw.parse::<i64>() {
        return Ok(Value::Number(Number::from(integer)));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| {
            AnswerParseError::new(
                "Please enter a number.",
                Some("expected finite number".to_string()),
            )
        })
}

/// Matches an option case-insensitively or by its 1-based index.
fn parse_choice(options: &[String], raw: &str) -> Result<String, AnswerParseError> {
    if let Some(option) = options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(raw))
    {
        return Ok(option.clone());
    }
    if let Ok(index) = raw.parse::<usize>()
        && let Some(option) = index.checked_sub(1).and_then(|index| options.get(index))
    {
        return Ok(option.clone());
    }
    Err(AnswerParseError::new(
        format!("Choose one of: {}.", options.join(", ")),
        Some(format!("allowed values: {}", options.join(", "))),
    ))
}

fn print_validation_errors(response: &Value) {
    let validation = &response["validation"];
    if let Some(errors) = validation["errors"].as_array() {
        for error in errors {
            eprintln!(
                "  {}: {}",
                error["path"].as_str().unwrap_or("<unknown>"),
                error["message"].as_str().unwrap_or("validation failed")
            );
        }
    }
    let names = |key: &str| {
        validation[key]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default()
    };
    let missing = names("missing_required");
    if !missing.is_empty() {
        eprintln!("Missing required answers for: {}", missing);
    }
    let unknown = names("unknown_fields");
    if !unknown.is_empty() {
        eprintln!("Unknown answer fields: {}", unknown);
    }
}
