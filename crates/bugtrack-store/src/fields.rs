//! Write payloads and the schema validation applied to them.
//!
//! Every write (create or replace) is expressed as a [`BugFields`] overlay.
//! Validation walks the full overlay and reports all violations at once.

use serde::{Deserialize, Serialize};

use crate::bug::{
    Bug, Customer, MAX_DESCRIPTION_CHARS, MAX_REPORTED_BY_CHARS, MAX_TITLE_CHARS, Priority,
    Source, Status,
};
use crate::error::{ValidationError, Violation};

/// Client-writable bug fields. Absent members are left untouched on replace
/// and defaulted on create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BugFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerFields>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl BugFields {
    /// Current field values of a stored bug, as an overlay base.
    pub fn from_bug(bug: &Bug) -> Self {
        Self {
            title: Some(bug.title.clone()),
            description: Some(bug.description.clone()),
            priority: Some(bug.priority.as_str().to_string()),
            status: Some(bug.status.as_str().to_string()),
            reported_by: Some(bug.reported_by.clone()),
            assigned_to: Some(bug.assigned_to.clone()),
            source: Some(bug.source.as_str().to_string()),
            customer: bug.customer.as_ref().map(|c| CustomerFields {
                name: Some(c.name.clone()),
                email: Some(c.email.clone()),
                id: Some(c.id.clone()),
            }),
        }
    }

    /// Replace every member that `patch` carries.
    pub fn overlay(mut self, patch: BugFields) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if patch.$field.is_some() {
                    self.$field = patch.$field;
                })*
            };
        }
        take!(
            title,
            description,
            priority,
            status,
            reported_by,
            assigned_to,
            source,
            customer
        );
        self
    }

    /// Names of required members that are absent or blank.
    pub fn missing_required(&self) -> Vec<String> {
        [
            ("title", &self.title),
            ("description", &self.description),
            ("reportedBy", &self.reported_by),
        ]
        .into_iter()
        .filter(|(_, value)| is_blank(value.as_deref()))
        .map(|(name, _)| name.to_string())
        .collect()
    }

    /// Validate the complete field set, applying defaults for absent
    /// optional members.
    pub fn validate(&self) -> Result<ValidBugFields, ValidationError> {
        let mut violations = Vec::new();

        let title = required_text("title", self.title.as_deref(), MAX_TITLE_CHARS, true)
            .unwrap_or_else(|v| collect(&mut violations, v));
        let description = required_text(
            "description",
            self.description.as_deref(),
            MAX_DESCRIPTION_CHARS,
            true,
        )
        .unwrap_or_else(|v| collect(&mut violations, v));
        let priority = enum_value(
            "priority",
            self.priority.as_deref(),
            Priority::parse,
            &Priority::ALL.map(|p| p.as_str()),
        )
        .unwrap_or_else(|v| collect(&mut violations, v));
        let status = enum_value(
            "status",
            self.status.as_deref(),
            Status::parse,
            &Status::ALL.map(|s| s.as_str()),
        )
        .unwrap_or_else(|v| collect(&mut violations, v));
        let reported_by = required_text(
            "reportedBy",
            self.reported_by.as_deref(),
            MAX_REPORTED_BY_CHARS,
            false,
        )
        .unwrap_or_else(|v| collect(&mut violations, v));
        let source = enum_value(
            "source",
            self.source.as_deref(),
            Source::parse,
            &Source::ALL.map(|s| s.as_str()),
        )
        .unwrap_or_else(|v| collect(&mut violations, v));

        let customer = match (&self.customer, source) {
            (None, _) => None,
            (Some(_), Source::Internal) => {
                violations.push(Violation::new(
                    "customer",
                    "is only allowed when source is `customer`",
                ));
                None
            }
            (Some(fields), Source::Customer) => validate_customer(fields, &mut violations),
        };

        if !violations.is_empty() {
            return Err(ValidationError { violations });
        }

        Ok(ValidBugFields {
            title,
            description,
            priority,
            status,
            reported_by,
            assigned_to: self.assigned_to.clone().unwrap_or_default(),
            source,
            customer,
        })
    }
}

/// Field values that passed validation, defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidBugFields {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: Status,
    pub reported_by: String,
    pub assigned_to: String,
    pub source: Source,
    pub customer: Option<Customer>,
}

fn validate_customer(
    fields: &CustomerFields,
    violations: &mut Vec<Violation>,
) -> Option<Customer> {
    let mut ok = true;
    for (name, value) in [
        ("customer.name", &fields.name),
        ("customer.email", &fields.email),
    ] {
        if is_blank(value.as_deref()) {
            violations.push(Violation::new(name, "is required"));
            ok = false;
        }
    }
    ok.then(|| Customer {
        name: fields.name.clone().unwrap_or_default().trim().to_string(),
        email: fields.email.clone().unwrap_or_default().trim().to_string(),
        id: fields.id.clone().unwrap_or_default(),
    })
}

fn collect<T: Default>(violations: &mut Vec<Violation>, violation: Violation) -> T {
    violations.push(violation);
    T::default()
}

pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Presence plus length check. `trim` controls whether surrounding
/// whitespace is stripped from the stored value.
pub(crate) fn required_text(
    field: &str,
    value: Option<&str>,
    max_chars: usize,
    trim: bool,
) -> Result<String, Violation> {
    if is_blank(value) {
        return Err(Violation::new(field, "is required"));
    }
    let value = value.unwrap_or_default();
    let value = if trim { value.trim() } else { value };
    if value.chars().count() > max_chars {
        return Err(Violation::new(
            field,
            format!("must be at most {max_chars} characters"),
        ));
    }
    Ok(value.to_string())
}

pub(crate) fn optional_text(
    field: &str,
    value: Option<String>,
    max_chars: usize,
) -> Result<Option<String>, Violation> {
    match value {
        Some(v) if v.trim().is_empty() => Ok(None),
        Some(v) if v.chars().count() > max_chars => Err(Violation::new(
            field,
            format!("must be at most {max_chars} characters"),
        )),
        other => Ok(other),
    }
}

fn enum_value<T: Default>(
    field: &str,
    value: Option<&str>,
    parse: fn(&str) -> Option<T>,
    allowed: &[&str],
) -> Result<T, Violation> {
    match value {
        None => Ok(T::default()),
        Some(raw) => parse(raw).ok_or_else(|| {
            Violation::new(
                field,
                format!("`{raw}` is not one of: {}", allowed.join(", ")),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> BugFields {
        BugFields {
            title: Some("Login broken".to_string()),
            description: Some("button unresponsive".to_string()),
            reported_by: Some("Jane".to_string()),
            ..BugFields::default()
        }
    }

    #[test]
    fn defaults_apply_to_absent_optional_fields() {
        let valid = minimal().validate().expect("minimal fields are valid");
        assert_eq!(valid.status, Status::Open);
        assert_eq!(valid.priority, Priority::Medium);
        assert_eq!(valid.source, Source::Internal);
        assert_eq!(valid.assigned_to, "");
        assert_eq!(valid.customer, None);
    }

    #[test]
    fn title_and_description_are_trimmed() {
        let fields = BugFields {
            title: Some("  Login broken  ".to_string()),
            description: Some("\tbutton unresponsive\n".to_string()),
            ..minimal()
        };
        let valid = fields.validate().expect("fields are valid");
        assert_eq!(valid.title, "Login broken");
        assert_eq!(valid.description, "button unresponsive");
    }

    #[test]
    fn every_violation_is_reported() {
        let fields = BugFields {
            title: Some("x".repeat(MAX_TITLE_CHARS + 1)),
            description: None,
            priority: Some("Urgent".to_string()),
            status: Some("Closed".to_string()),
            reported_by: Some("y".repeat(MAX_REPORTED_BY_CHARS + 1)),
            ..BugFields::default()
        };
        let err = fields.validate().expect_err("fields are invalid");
        assert_eq!(
            err.fields(),
            vec!["title", "description", "priority", "status", "reportedBy"]
        );
    }

    #[test]
    fn length_limits_count_characters_not_bytes() {
        let fields = BugFields {
            title: Some("é".repeat(MAX_TITLE_CHARS)),
            ..minimal()
        };
        assert!(fields.validate().is_ok());
    }

    #[test]
    fn customer_block_requires_customer_source() {
        let customer = CustomerFields {
            name: Some("Acme".to_string()),
            email: Some("ops@acme.test".to_string()),
            id: None,
        };

        let internal = BugFields {
            customer: Some(customer.clone()),
            ..minimal()
        };
        assert!(
            internal
                .validate()
                .expect_err("internal with customer")
                .has_field("customer")
        );

        let external = BugFields {
            source: Some("customer".to_string()),
            customer: Some(customer),
            ..minimal()
        };
        let valid = external.validate().expect("customer bug is valid");
        assert_eq!(valid.source, Source::Customer);
        assert_eq!(valid.customer.expect("customer kept").name, "Acme");
    }

    #[test]
    fn overlay_replaces_only_present_members() {
        let base = minimal();
        let patched = base.clone().overlay(BugFields {
            priority: Some("High".to_string()),
            ..BugFields::default()
        });
        assert_eq!(patched.title, base.title);
        assert_eq!(patched.priority.as_deref(), Some("High"));
    }

    #[test]
    fn missing_required_treats_blank_as_missing() {
        let fields = BugFields {
            title: Some("   ".to_string()),
            ..BugFields::default()
        };
        assert_eq!(
            fields.missing_required(),
            vec!["title", "description", "reportedBy"]
        );
        assert!(minimal().missing_required().is_empty());
    }
}
