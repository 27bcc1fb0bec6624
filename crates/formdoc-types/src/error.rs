//! Error taxonomy shared across the workspace

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fill::FillStatus;

/// One required field found empty at submit or decision time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingField {
    pub id: String,
    pub label: String,
    /// Page the field sits on, so a caller can jump the view there
    pub page: u32,
}

#[derive(Error, Debug)]
pub enum FormDocError {
    /// Required fields lacking a non-blank value; carries the exact set so
    /// the caller can enumerate labels and jump to the first offending page.
    #[error("missing required fields: {}", .missing.iter().map(|m| m.label.as_str()).collect::<Vec<_>>().join(", "))]
    ValidationFailure { missing: Vec<MissingField> },

    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("page not found: {0}")]
    PageNotFound(u32),

    #[error("invalid value for attribute '{attribute}': {reason}")]
    InvalidAttributeValue { attribute: String, reason: String },

    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: FillStatus, to: FillStatus },

    #[error("document has no pages")]
    EmptyDocument,

    #[error("resource load failed: {0}")]
    ResourceLoad(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("corrupt file: {0}")]
    CorruptFile(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("PDF operation failed: {0}")]
    Pdf(String),
}

impl FormDocError {
    /// First page carrying a missing required field, if this is a
    /// validation failure
    pub fn first_offending_page(&self) -> Option<u32> {
        match self {
            FormDocError::ValidationFailure { missing } => {
                missing.iter().map(|m| m.page).min()
            }
            _ => None,
        }
    }
}
