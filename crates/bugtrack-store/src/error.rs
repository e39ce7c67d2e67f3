//! Error taxonomy of the entity store.

use serde::Serialize;
use std::fmt::{Display, Formatter};

use crate::jsonl::JsonlError;

/// One violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every constraint a write broke, in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.field.as_str()).collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid bug identifier: {0}")]
    InvalidIdentifier(String),

    #[error("bug not found: {0}")]
    NotFound(String),

    #[error("invalid status `{0}` (expected one of: Open, In Progress, Resolved)")]
    InvalidStatus(String),

    #[error("missing required field(s): {}", .0.join(", "))]
    MissingRequiredField(Vec<String>),

    #[error(transparent)]
    Jsonl(#[from] JsonlError),

    #[error("bug store lock busy: {lock_path} (held by {holder})")]
    LockBusy { lock_path: String, holder: String },

    #[error("failed to acquire bug store lock {lock_path}: {message}")]
    LockIo { lock_path: String, message: String },
}

impl StoreError {
    /// Whether the failure comes from the caller's input rather than storage.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            StoreError::Jsonl(_) | StoreError::LockBusy { .. } | StoreError::LockIo { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_field() {
        let err = StoreError::from(ValidationError {
            violations: vec![
                Violation::new("title", "is required"),
                Violation::new("reportedBy", "must be at most 50 characters"),
            ],
        });
        assert_eq!(
            err.to_string(),
            "validation failed: title: is required; reportedBy: must be at most 50 characters"
        );
    }

    #[test]
    fn storage_failures_are_not_client_errors() {
        assert!(StoreError::NotFound("x".to_string()).is_client_error());
        assert!(
            !StoreError::LockBusy {
                lock_path: "bugs.jsonl.lock".to_string(),
                holder: "pid 7".to_string(),
            }
            .is_client_error()
        );
    }
}
