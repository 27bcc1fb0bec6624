//! PDF output for form documents
//!
//! Turns a document's page rasters and field overlay into a downloadable
//! PDF, either flattened (values drawn into the content stream) or as
//! interactive AcroForm widgets. Coordinates are converted from top-left
//! authoring pixels to bottom-left PDF points on the way out.

mod acroform;
pub mod coords;
mod export;
mod fonts;
mod images;

pub use export::{
    export, export_filename, export_with_timeout, ExportOutput, ExportRequest, ExportStrategy,
};
