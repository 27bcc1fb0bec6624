//! Document mutation events
//!
//! A lightweight event stream so observers (and the persistence layer) can
//! react to mutations; cascade deletion of fill data hangs off
//! `DocumentDeleted`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentEvent {
    FieldAdded {
        field_id: String,
        field_type: String,
        page: u32,
    },
    FieldMoved {
        field_id: String,
        new_x: f64,
        new_y: f64,
    },
    FieldDeleted {
        field_id: String,
    },
    PageAdded {
        page: u32,
    },
    Submitted {
        user_id: String,
    },
    Decided {
        user_id: String,
        approver: String,
        approved: bool,
    },
    DocumentDeleted {
        document_id: String,
    },
}
