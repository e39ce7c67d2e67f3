//! List queries: exact-match filters plus a single sort key.

use std::cmp::Ordering;

use crate::bug::Bug;

/// Exact-match conjunction. `None` members do not constrain the result.
///
/// Values are compared against the wire form (`"In Progress"`, `"High"`,
/// `"customer"`), so an unknown value simply matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BugFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub source: Option<String>,
    pub assigned_to: Option<String>,
}

impl BugFilter {
    pub fn matches(&self, bug: &Bug) -> bool {
        self.status.as_ref().is_none_or(|s| bug.status.as_str() == s)
            && self
                .priority
                .as_ref()
                .is_none_or(|p| bug.priority.as_str() == p)
            && self.source.as_ref().is_none_or(|s| bug.source.as_str() == s)
            && self
                .assigned_to
                .as_ref()
                .is_none_or(|a| bug.assigned_to == *a)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Priority,
    Status,
}

impl SortField {
    /// Unknown names fall back to `createdAt`.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("updatedAt") => SortField::UpdatedAt,
            Some("title") => SortField::Title,
            Some("priority") => SortField::Priority,
            Some("status") => SortField::Status,
            _ => SortField::CreatedAt,
        }
    }

    fn compare(&self, a: &Bug, b: &Bug) -> Ordering {
        match self {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Priority => a.priority.cmp(&b.priority),
            SortField::Status => a.status.cmp(&b.status),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// `asc` sorts ascending; anything else is descending.
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(order) if order.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BugQuery {
    pub filter: BugFilter,
    pub sort_by: SortField,
    pub order: SortOrder,
}

impl BugQuery {
    /// Filter and sort `bugs`. Ties break on id so output is deterministic.
    pub fn apply<'a>(&self, bugs: impl Iterator<Item = &'a Bug>) -> Vec<Bug> {
        let mut rows: Vec<Bug> = bugs.filter(|bug| self.filter.matches(bug)).cloned().collect();
        rows.sort_by(|a, b| {
            let ordering = self.sort_by.compare(a, b).then_with(|| a.id.cmp(&b.id));
            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        rows
    }
}
