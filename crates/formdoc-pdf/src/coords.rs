//! Coordinate transformation between authoring and PDF coordinate systems
//!
//! Fields are authored in page-local pixels with origin top-left; PDF points
//! have origin bottom-left. The transform scales by the output page size and
//! flips the vertical axis.

use formdoc_types::PageBounds;

/// Convert an authoring-space point (top-left origin, pixels) to PDF points
/// (bottom-left origin)
pub fn px_to_pt(
    px_x: f64,
    px_y: f64,
    page_px_width: f64,
    page_px_height: f64,
    bounds: PageBounds,
) -> (f64, f64) {
    let scale_x = bounds.width / page_px_width;
    let scale_y = bounds.height / page_px_height;
    (px_x * scale_x, bounds.height - px_y * scale_y)
}

/// Convert PDF points back to authoring-space pixels
pub fn pt_to_px(
    pt_x: f64,
    pt_y: f64,
    page_px_width: f64,
    page_px_height: f64,
    bounds: PageBounds,
) -> (f64, f64) {
    let scale_x = bounds.width / page_px_width;
    let scale_y = bounds.height / page_px_height;
    (pt_x / scale_x, (bounds.height - pt_y) / scale_y)
}

/// Map a field's bounding box to a PDF `[x1, y1, x2, y2]` rectangle. The
/// lower-left corner is the top-left pixel corner shifted down by the
/// field's height.
pub fn field_rect_to_pdf(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    page_px_width: f64,
    page_px_height: f64,
    bounds: PageBounds,
) -> [f64; 4] {
    let scale_x = bounds.width / page_px_width;
    let scale_y = bounds.height / page_px_height;
    let x1 = x * scale_x;
    let y1 = bounds.height - y * scale_y - height * scale_y;
    [x1, y1, x1 + width * scale_x, y1 + height * scale_y]
}

/// Invert [`field_rect_to_pdf`], recovering `(x, y, width, height)` in
/// authoring pixels
pub fn pdf_rect_to_field(
    rect: [f64; 4],
    page_px_width: f64,
    page_px_height: f64,
    bounds: PageBounds,
) -> (f64, f64, f64, f64) {
    let scale_x = bounds.width / page_px_width;
    let scale_y = bounds.height / page_px_height;
    let [x1, y1, x2, y2] = rect;
    let width = (x2 - x1) / scale_x;
    let height = (y2 - y1) / scale_y;
    let x = x1 / scale_x;
    let y = (bounds.height - y2) / scale_y;
    (x, y, width, height)
}
