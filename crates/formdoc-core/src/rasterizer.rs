//! Page rasterizer contract
//!
//! Converting an uploaded source file into page rasters is an external
//! collaborator's job; the core only depends on this contract. The blank
//! white raster used by the "add blank page" operation lives here too.

use formdoc_types::{FormDocError, Page};

/// Converts a source file into ordered page records. Implementations must
/// produce at least one page or fail with `UnsupportedFileType` /
/// `CorruptFile`.
pub trait PageRasterizer {
    fn rasterize(&self, file_name: &str, bytes: &[u8]) -> Result<Vec<Page>, FormDocError>;
}

/// Largest accepted page edge in pixels; well past any real raster while
/// keeping the buffer allocation bounded
pub const MAX_PAGE_DIMENSION_PX: u32 = 10_000;

/// Encode a blank white page raster as PNG
pub fn blank_page_png(width: u32, height: u32) -> Result<Vec<u8>, FormDocError> {
    if width == 0 || height == 0 {
        return Err(FormDocError::ResourceLoad(
            "blank page dimensions must be positive".to_string(),
        ));
    }
    if width > MAX_PAGE_DIMENSION_PX || height > MAX_PAGE_DIMENSION_PX {
        return Err(FormDocError::ResourceLoad(format!(
            "blank page dimensions {width}x{height} exceed {MAX_PAGE_DIMENSION_PX}px"
        )));
    }
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Grayscale);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| FormDocError::ResourceLoad(e.to_string()))?;
        writer
            .write_image_data(&vec![0xFF; width as usize * height as usize])
            .map_err(|e| FormDocError::ResourceLoad(e.to_string()))?;
    }
    Ok(out)
}
