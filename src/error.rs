//! Error types for the planning core
//!
//! Three families, matching how each one is recovered:
//! - [`ValidationError`]: a draft is incomplete or out of range. Field-keyed,
//!   nothing was mutated, the caller corrects and resubmits.
//! - [`ConsistencyError`]: the plan references data that is not there. This is
//!   a defect, reported loudly and never repaired silently.
//! - [`PersistenceError`]: saving failed. Local state is kept unchanged.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Field-keyed validation failures of a task group draft
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    fields: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error for a single field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut error = Self::new();
        error.add(field, message);
        error
    }

    /// Record a failure for a field; the first message per field wins
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Turn an accumulated error map into a result
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Broken references inside the plan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    #[error("task group '{group_id}' references missing element '{element_id}'")]
    MissingElement {
        group_id: String,
        element_id: String,
    },

    #[error("task '{task_id}' references missing task group '{group_id}'")]
    MissingGroup { task_id: String, group_id: String },

    #[error("task '{task_id}' is stored on element '{stored_on}' but claims element '{element_id}'")]
    MisplacedTask {
        task_id: String,
        stored_on: String,
        element_id: String,
    },

    #[error("task group '{group_id}' has no cost for element '{element_id}'")]
    MissingCost {
        group_id: String,
        element_id: String,
    },

    #[error("task group '{group_id}' expected {expected} occurrences but found {found}")]
    MissingOccurrences {
        group_id: String,
        expected: usize,
        found: usize,
    },

    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("cannot schedule occurrence {index} of task group '{group_id}': date out of range")]
    DateOutOfRange { group_id: String, index: u32 },
}

/// Failures of the save round-trip
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("a save is already in progress")]
    SaveInProgress,

    #[error("failed to save plan: {0}")]
    Write(String),
}

/// Any failure of a plan operation
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("plan consistency error: {0}")]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
}

impl PlanError {
    pub fn not_found(kind: &'static str, id: &str) -> Self {
        PlanError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type PlanResult<T> = Result<T, PlanError>;
