//! Page geometry constants and primitives

use serde::{Deserialize, Serialize};

/// Default authoring-space page width in pixels (8.5in at 96dpi)
pub const PAGE_WIDTH_PX: u32 = 816;

/// Default authoring-space page height in pixels (11in at 96dpi)
pub const PAGE_HEIGHT_PX: u32 = 1056;

/// Output page dimensions in PDF points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBounds {
    pub width: f64,
    pub height: f64,
}

impl PageBounds {
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
        }
    }

    pub fn a4() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
        }
    }
}

impl Default for PageBounds {
    fn default() -> Self {
        Self::letter()
    }
}

/// An axis-aligned rectangle in page-local pixel coordinates (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    /// Whether the rectangle lies entirely within a page of the given size
    pub fn within(&self, page_width: f64, page_height: f64) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= page_width
            && self.y + self.height <= page_height
    }
}
