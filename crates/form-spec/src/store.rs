use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::answers::{Submission, SubmissionMeta};
use crate::spec::field::Field;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} '{id}' already exists")]
    Duplicate { kind: &'static str, id: String },
    #[error("reorder for form '{form_id}' must list every field exactly once")]
    InvalidOrder { form_id: String },
}

impl StoreError {
    fn field_not_found(id: &str) -> Self {
        StoreError::NotFound {
            kind: "field",
            id: id.to_string(),
        }
    }
}

/// Persistent field collection, scoped per form.
pub trait FieldStore {
    fn create(&mut self, form_id: &str, field: Field) -> Result<Field, StoreError>;
    fn get(&self, field_id: &str) -> Result<Field, StoreError>;
    fn update(&mut self, field: Field) -> Result<Field, StoreError>;
    fn delete(&mut self, field_id: &str) -> Result<Field, StoreError>;
    /// Fields of one form, ordered by position.
    fn list(&self, form_id: &str) -> Vec<Field>;
    /// Rewrites positions densely (0..n) in the given id order.
    fn reorder(&mut self, form_id: &str, field_ids: &[String]) -> Result<Vec<Field>, StoreError>;
}

/// Accepts finalized answer sets.
pub trait SubmissionSink {
    fn submit(&mut self, form_id: &str, answers: Value, meta: SubmissionMeta) -> Submission;
    /// Submissions of one form, oldest first.
    fn list(&self, form_id: &str) -> Vec<Submission>;
    fn delete(&mut self, submission_id: &str) -> Result<Submission, StoreError>;
    /// Returns the number of submissions removed.
    fn delete_for_form(&mut self, form_id: &str) -> usize;
}

#[derive(Debug, Clone)]
struct StoredField {
    form_id: String,
    field: Field,
}

#[derive(Debug, Default)]
pub struct MemoryFieldStore {
    fields: BTreeMap<String, StoredField>,
}

impl MemoryFieldStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FieldStore for MemoryFieldStore {
    fn create(&mut self, form_id: &str, field: Field) -> Result<Field, StoreError> {
        if self.fields.contains_key(&field.id) {
            return Err(StoreError::Duplicate {
                kind: "field",
                id: field.id,
            });
        }
        debug!(form_id, field_id = %field.id, "creating field");
        self.fields.insert(
            field.id.clone(),
            StoredField {
                form_id: form_id.to_string(),
                field: field.clone(),
            },
        );
        Ok(field)
    }

    fn get(&self, field_id: &str) -> Result<Field, StoreError> {
        self.fields
            .get(field_id)
            .map(|stored| stored.field.clone())
            .ok_or_else(|| StoreError::field_not_found(field_id))
    }

    fn update(&mut self, field: Field) -> Result<Field, StoreError> {
        let stored = self
            .fields
            .get_mut(&field.id)
            .ok_or_else(|| StoreError::field_not_found(&field.id))?;
        debug!(field_id = %field.id, "updating field");
        stored.field = field.clone();
        Ok(field)
    }

    fn delete(&mut self, field_id: &str) -> Result<Field, StoreError> {
        debug!(field_id, "deleting field");
        self.fields
            .remove(field_id)
            .map(|stored| stored.field)
            .ok_or_else(|| StoreError::field_not_found(field_id))
    }

    fn list(&self, form_id: &str) -> Vec<Field> {
        let mut fields = self
            .fields
            .values()
            .filter(|stored| stored.form_id == form_id)
            .map(|stored| stored.field.clone())
            .collect::<Vec<_>>();
        fields.sort_by(|left, right| {
            left.position
                .cmp(&right.position)
                .then_with(|| left.id.cmp(&right.id))
        });
        fields
    }

    fn reorder(&mut self, form_id: &str, field_ids: &[String]) -> Result<Vec<Field>, StoreError> {
        let current = self.list(form_id);
        let mut requested = field_ids.to_vec();
        requested.sort();
        requested.dedup();
        let mut existing = current.iter().map(|field| field.id.clone()).collect::<Vec<_>>();
        existing.sort();
        if requested.len() != field_ids.len() || requested != existing {
            return Err(StoreError::InvalidOrder {
                form_id: form_id.to_string(),
            });
        }

        for (position, id) in field_ids.iter().enumerate() {
            if let Some(stored) = self.fields.get_mut(id) {
                stored.field.position = position as i64;
            }
        }
        debug!(form_id, count = field_ids.len(), "reordered fields");
        Ok(self.list(form_id))
    }
}

#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    submissions: Vec<Submission>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_submissions(submissions: Vec<Submission>) -> Self {
        Self { submissions }
    }
}

impl SubmissionSink for MemorySubmissionStore {
    fn submit(&mut self, form_id: &str, answers: Value, meta: SubmissionMeta) -> Submission {
        let submission = Submission::new(form_id, answers, meta);
        debug!(form_id, submission_id = %submission.id, "recording submission");
        self.submissions.push(submission.clone());
        submission
    }

    fn list(&self, form_id: &str) -> Vec<Submission> {
        let mut submissions = self
            .submissions
            .iter()
            .filter(|submission| submission.form_id == form_id)
            .cloned()
            .collect::<Vec<_>>();
        submissions.sort_by_key(|submission| submission.meta.submitted_at);
        submissions
    }

    fn delete(&mut self, submission_id: &str) -> Result<Submission, StoreError> {
        let index = self
            .submissions
            .iter()
            .position(|submission| submission.id == submission_id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "submission",
                id: submission_id.to_string(),
            })?;
        Ok(self.submissions.remove(index))
    }

    fn delete_for_form(&mut self, form_id: &str) -> usize {
        let before = self.submissions.len();
        self.submissions
            .retain(|submission| submission.form_id != form_id);
        let removed = before - self.submissions.len();
        debug!(form_id, removed, "deleted submissions for form");
        removed
    }
}
