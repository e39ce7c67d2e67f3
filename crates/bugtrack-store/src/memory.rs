//! Canonical in-memory representation of the bug collection.
//!
//! This is the memory boundary for `bugtrack-store`:
//! - load/store JSONL
//! - the entity operations (create, find, replace, status, comment, delete)
//! - no locking or I/O policy (see `atomic_store` and `store`)

use chrono::Utc;
use std::collections::BTreeMap;
use std::path::Path;

use crate::bug::{
    Bug, Comment, MAX_COMMENT_CHARS, MAX_REASON_CHARS, Source, Status, new_bug_id,
    parse_bug_id,
};
use crate::error::{StoreError, ValidationError};
use crate::fields::{BugFields, is_blank, optional_text, required_text};
use crate::jsonl::{read_bugs_from_path, write_bugs_to_path};
use crate::query::BugQuery;

/// Canonical in-memory state for bugs, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bugs: BTreeMap<String, Bug>,
}

impl MemoryStore {
    /// Build a store from fully-materialized bugs.
    ///
    /// Duplicate IDs resolve with last-write-wins.
    pub fn from_bugs(bugs: Vec<Bug>) -> Self {
        let mut index = BTreeMap::new();
        for bug in bugs {
            index.insert(bug.id.clone(), bug);
        }
        Self { bugs: index }
    }

    /// Load store state from a JSONL file.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::from_bugs(read_bugs_from_path(path)?))
    }

    /// Persist store state to a JSONL file.
    pub fn save_jsonl(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let bugs: Vec<Bug> = self.bugs.values().cloned().collect();
        write_bugs_to_path(path, &bugs)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bugs.is_empty()
    }

    /// Iterate all bugs in identifier order.
    pub fn bugs(&self) -> impl Iterator<Item = &Bug> {
        self.bugs.values()
    }

    /// Validate `fields`, assign a fresh id, and insert.
    pub fn create(&mut self, fields: BugFields) -> Result<Bug, StoreError> {
        let valid = fields.validate()?;
        let now = Utc::now();
        let bug = Bug {
            id: new_bug_id(),
            title: valid.title,
            description: valid.description,
            priority: valid.priority,
            status: valid.status,
            reported_by: valid.reported_by,
            assigned_to: valid.assigned_to,
            source: valid.source,
            customer: valid.customer,
            comments: Vec::new(),
            status_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.bugs.insert(bug.id.clone(), bug.clone());
        Ok(bug)
    }

    pub fn find_by_id(&self, id: &str) -> Result<&Bug, StoreError> {
        let id = parse_bug_id(id)?;
        self.bugs.get(&id).ok_or(StoreError::NotFound(id))
    }

    pub fn find_all(&self, query: &BugQuery) -> Vec<Bug> {
        query.apply(self.bugs.values())
    }

    /// Overwrite the fields `patch` carries and re-validate the result.
    ///
    /// A changed status is logged as one history entry attributed to `by`.
    pub fn replace_fields(
        &mut self,
        id: &str,
        patch: BugFields,
        by: Option<String>,
    ) -> Result<Bug, StoreError> {
        let id = parse_bug_id(id)?;
        let bug = self
            .bugs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let carries_customer = patch.customer.is_some();
        let mut merged = BugFields::from_bug(bug).overlay(patch);
        // Moving a bug to `internal` without a new customer block drops the old one.
        if !carries_customer
            && merged.source.as_deref().and_then(Source::parse) == Some(Source::Internal)
        {
            merged.customer = None;
        }
        let valid = merged.validate()?;
        let now = Utc::now();
        if valid.status != bug.status {
            bug.transition(valid.status, by, None, now);
        }
        bug.title = valid.title;
        bug.description = valid.description;
        bug.priority = valid.priority;
        bug.reported_by = valid.reported_by;
        bug.assigned_to = valid.assigned_to;
        bug.source = valid.source;
        bug.customer = valid.customer;
        bug.updated_at = now;
        Ok(bug.clone())
    }

    /// Set status unconditionally, appending exactly one history entry.
    pub fn set_status(
        &mut self,
        id: &str,
        status: &str,
        reason: Option<String>,
        by: Option<String>,
    ) -> Result<Bug, StoreError> {
        let id = parse_bug_id(id)?;
        let to = Status::parse(status.trim())
            .ok_or_else(|| StoreError::InvalidStatus(status.to_string()))?;
        let reason = optional_text("reason", reason, MAX_REASON_CHARS).map_err(|v| {
            ValidationError {
                violations: vec![v],
            }
        })?;
        let bug = self
            .bugs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        bug.transition(to, by, reason, Utc::now());
        Ok(bug.clone())
    }

    /// Append a comment and return it.
    pub fn append_comment(
        &mut self,
        id: &str,
        author: Option<String>,
        message: Option<String>,
    ) -> Result<Comment, StoreError> {
        let id = parse_bug_id(id)?;
        let missing: Vec<String> = [("author", &author), ("message", &message)]
            .into_iter()
            .filter(|(_, value)| is_blank(value.as_deref()))
            .map(|(name, _)| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::MissingRequiredField(missing));
        }
        let message = required_text("message", message.as_deref(), MAX_COMMENT_CHARS, true)
            .map_err(|v| ValidationError {
                violations: vec![v],
            })?;
        let bug = self
            .bugs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let comment = Comment {
            author: author.unwrap_or_default().trim().to_string(),
            message,
            created_at: Utc::now(),
        };
        bug.push_comment(comment.clone());
        Ok(comment)
    }

    /// Remove a bug permanently, returning it.
    pub fn delete(&mut self, id: &str) -> Result<Bug, StoreError> {
        let id = parse_bug_id(id)?;
        self.bugs.remove(&id).ok_or(StoreError::NotFound(id))
    }
}
