//! Shared data model for the formdoc workspace
//!
//! This crate defines the persisted shapes for documents, pages, positioned
//! fields, per-user fill records and document events, plus the error
//! taxonomy used across the workspace. It is serde-only: no I/O, no PDF
//! dependencies.

pub mod document;
pub mod error;
pub mod event;
pub mod field;
pub mod fill;
pub mod geometry;

pub use document::{Document, DocumentCollection, DocumentStatus, Page, PageImage, Workflow};
pub use error::{FormDocError, MissingField};
pub use event::DocumentEvent;
pub use field::{Field, FieldKind, LabelPosition, Role};
pub use fill::{FieldValue, FillStatus, UserFieldRecord};
pub use geometry::{PageBounds, PixelRect, PAGE_HEIGHT_PX, PAGE_WIDTH_PX};
