#![allow(missing_docs)]

pub mod analytics;
pub mod answers;
pub mod generate;
pub mod progress;
pub mod render;
pub mod spec;
pub mod store;
pub mod template;
pub mod validate;
pub mod visibility;

pub use analytics::{FieldSummary, ResponseSummary, summarize};
pub use answers::{
    Submission, SubmissionMeta, ValidationError, ValidationResult, has_answer, prune_hidden,
    with_answer,
};
pub use generate::{
    FieldGenerator, GenerateError, ResponseFileGenerator, classify_failure,
    decode_generated_fields, decode_response,
};
pub use progress::{answered_count, next_field, visible_count};
pub use render::{
    RenderField, RenderPayload, RenderProgress, RenderStatus, build_render_payload,
    render_json_ui, render_text,
};
pub use spec::{
    ConditionalRule, Field, FieldType, FormSpec, RuleAction, RuleOperator, ordered_fields,
};
pub use store::{FieldStore, MemoryFieldStore, MemorySubmissionStore, StoreError, SubmissionSink};
pub use template::{TemplateError, render_success_message};
pub use validate::{DefinitionIssue, lint_form, validate};
pub use visibility::{VisibilityMap, is_visible, resolve_visibility, visible_fields};
