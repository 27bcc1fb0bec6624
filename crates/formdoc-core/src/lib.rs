//! Core engine for the formdoc workspace
//!
//! Field editor mutations over a document's page-indexed field map, the
//! per-user fill store with its submit/approve workflow, the role-gated
//! render resolver, the source-buffer registry, and the persistence and
//! rasterizer contracts.

pub mod editor;
pub mod fill_store;
pub mod rasterizer;
pub mod registry;
pub mod resolve;
pub mod store;

pub use editor::{FieldEditor, FieldUpdate};
pub use fill_store::{Decision, FillData, FillStore};
pub use rasterizer::{blank_page_png, PageRasterizer, MAX_PAGE_DIMENSION_PX};
pub use registry::SourceBufferRegistry;
pub use resolve::{resolve, resolve_for_actor, Resolved};
pub use store::{DocumentStore, JsonFileAdapter, MemoryAdapter, PersistenceAdapter};
