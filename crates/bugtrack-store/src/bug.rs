//! Bug type: the single entity tracked by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 1000;
pub const MAX_REPORTED_BY_CHARS: usize = 50;
pub const MAX_COMMENT_CHARS: usize = 2000;
pub const MAX_REASON_CHARS: usize = 500;

/// Actor recorded on status changes when the caller names nobody.
pub const SYSTEM_ACTOR: &str = "system";

/// Bug priority. Declaration order is the sort rank.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == raw)
    }
}

/// Workflow status. Any status may move to any other; none is terminal.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Status {
    #[default]
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Open, Status::InProgress, Status::Resolved];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "Open",
            Status::InProgress => "In Progress",
            Status::Resolved => "Resolved",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

/// Where a bug came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Internal,
    Customer,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Internal, Source::Customer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Internal => "internal",
            Source::Customer => "customer",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

/// Reporting customer, only present on `source = customer` bugs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// One entry of the append-only status log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: Status,
    pub to: Status,
    pub by: String,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A tracked bug.
///
/// `comments` and `status_history` are owned, append-only sequences: the
/// only mutators on `Bug` push to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bug {
    pub id: String,

    // ── Content ──
    pub title: String,
    pub description: String,

    // ── Workflow ──
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,

    // ── People ──
    pub reported_by: String,
    #[serde(default)]
    pub assigned_to: String,

    // ── Origin ──
    #[serde(default)]
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<Customer>,

    // ── Sub-collections ──
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,

    // ── Timestamps ──
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bug {
    /// Move to `to`, logging the transition. Always appends one entry,
    /// including when `to` equals the current status.
    pub fn transition(
        &mut self,
        to: Status,
        by: Option<String>,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) {
        self.status_history.push(StatusChange {
            from: self.status,
            to,
            by: actor_or_system(by),
            at,
            reason,
        });
        self.status = to;
        self.updated_at = at;
    }

    pub fn push_comment(&mut self, comment: Comment) {
        self.updated_at = comment.created_at;
        self.comments.push(comment);
    }
}

fn actor_or_system(by: Option<String>) -> String {
    match by {
        Some(by) if !by.trim().is_empty() => by.trim().to_string(),
        _ => SYSTEM_ACTOR.to_string(),
    }
}

/// Generate a fresh identifier in the store's native format.
pub fn new_bug_id() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Parse a caller-supplied identifier into canonical form.
///
/// Malformed input is `InvalidIdentifier`, never `NotFound`.
pub fn parse_bug_id(raw: &str) -> Result<String, StoreError> {
    Uuid::parse_str(raw.trim())
        .map(|id| id.hyphenated().to_string())
        .map_err(|_| StoreError::InvalidIdentifier(raw.to_string()))
}
