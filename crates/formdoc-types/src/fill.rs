//! Per-user fill records and workflow status

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::field::Role;

/// A value entered into one field: bool for checkboxes, string for
/// everything else (including data-URIs for signature and image fields).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
}

impl FieldValue {
    /// A value counts as blank when it is a trimmed-empty string. An explicit
    /// `false` checkbox is a present value.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Bool(_) => false,
            FieldValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// Truthiness for checkbox rendering
    pub fn truthy(&self) -> bool {
        match self {
            FieldValue::Bool(b) => *b,
            FieldValue::Text(s) => !s.trim().is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Bool(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Per-user workflow status for one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillStatus {
    #[default]
    Pending,
    Submitted,
    Approved,
    Rejected,
}

/// The set of values one user has entered for one document, plus where that
/// user sits in the workflow. Keyed externally by (document id, user id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFieldRecord {
    #[serde(default)]
    pub status: FillStatus,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub field_values: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

impl UserFieldRecord {
    pub fn new(role: Role) -> Self {
        Self {
            status: FillStatus::Pending,
            role,
            field_values: BTreeMap::new(),
            approver: None,
            remarks: None,
            submitted_at: None,
            approved_at: None,
        }
    }

    pub fn value(&self, field_id: &str) -> Option<&FieldValue> {
        self.field_values.get(field_id)
    }

    /// Whether the field holds a non-blank value
    pub fn has_value(&self, field_id: &str) -> bool {
        self.value(field_id).is_some_and(|v| !v.is_blank())
    }
}
