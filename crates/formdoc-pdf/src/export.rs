//! PDF export pipeline
//!
//! Builds a fresh PDF from a document's page rasters and field overlay.
//! Template exports draw every field as an outlined, labelled placeholder;
//! filled exports draw only the values a user recorded. Identical inputs
//! produce the same drawing operations, so exports are reproducible apart
//! from compression metadata.

use std::time::Duration;

use formdoc_types::{
    Field, FieldKind, FormDocError, LabelPosition, PageBounds, UserFieldRecord,
};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{acroform, coords, fonts, images};

/// How field overlays are realised in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStrategy {
    /// Draw everything into page content streams; the output has no
    /// interactive elements and renders identically everywhere.
    #[default]
    Flatten,
    /// Inject interactive AcroForm widgets instead of drawing values.
    FormFields,
}

/// One export job: a document, optionally a user's fill record, and the
/// output geometry
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub document: formdoc_types::Document,
    pub user_id: Option<String>,
    pub record: Option<UserFieldRecord>,
    pub strategy: ExportStrategy,
    pub source_pdf: Option<Vec<u8>>,
    pub bounds: PageBounds,
}

impl ExportRequest {
    /// Template mode: placeholders for every field, no values
    pub fn template(document: formdoc_types::Document) -> Self {
        Self {
            document,
            user_id: None,
            record: None,
            strategy: ExportStrategy::default(),
            source_pdf: None,
            bounds: PageBounds::letter(),
        }
    }

    /// Filled mode: draw the values from one user's record
    pub fn filled(
        document: formdoc_types::Document,
        user_id: impl Into<String>,
        record: UserFieldRecord,
    ) -> Self {
        Self {
            document,
            user_id: Some(user_id.into()),
            record: Some(record),
            strategy: ExportStrategy::default(),
            source_pdf: None,
            bounds: PageBounds::letter(),
        }
    }

    pub fn with_strategy(mut self, strategy: ExportStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_source_pdf(mut self, bytes: Vec<u8>) -> Self {
        self.source_pdf = Some(bytes);
        self
    }

    pub fn with_bounds(mut self, bounds: PageBounds) -> Self {
        self.bounds = bounds;
        self
    }
}

/// Finished export: the PDF bytes and a download-safe filename
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// Run an export job synchronously
pub fn export(request: &ExportRequest) -> Result<ExportOutput, FormDocError> {
    if request.document.pages.is_empty() {
        return Err(FormDocError::EmptyDocument);
    }
    let bytes = match request.strategy {
        ExportStrategy::Flatten => flatten(request)?,
        ExportStrategy::FormFields => acroform::inject(request)?,
    };
    let filename = export_filename(&request.document.document_name, request.user_id.as_deref());
    Ok(ExportOutput { bytes, filename })
}

/// Run an export job on a blocking worker with an upper time bound
pub async fn export_with_timeout(
    request: ExportRequest,
    timeout_ms: u64,
) -> Result<ExportOutput, FormDocError> {
    let task = tokio::task::spawn_blocking(move || export(&request));
    match tokio::time::timeout(Duration::from_millis(timeout_ms), task).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(FormDocError::Pdf("export task panicked".to_string())),
        Err(_) => Err(FormDocError::ResourceLoad(format!(
            "export timed out after {timeout_ms}ms"
        ))),
    }
}

/// Build a download filename from the document name and optional user id.
/// Anything outside `[A-Za-z0-9]` collapses to a single underscore.
pub fn export_filename(document_name: &str, user_id: Option<&str>) -> String {
    let stem = sanitize(document_name);
    let stem = if stem.is_empty() { "document".to_string() } else { stem };
    match user_id {
        Some(user) => {
            let user = sanitize(user);
            if user.is_empty() {
                format!("{stem}.pdf")
            } else {
                format!("{stem}_{user}.pdf")
            }
        }
        None => format!("{stem}_template.pdf"),
    }
}

fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_sep = true;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out.trim_matches('_').to_string()
}

fn flatten(request: &ExportRequest) -> Result<Vec<u8>, FormDocError> {
    let mut pdf = lopdf::Document::with_version("1.7");
    let pages_id = pdf.new_object_id();
    let font_ids = fonts::register_standard_fonts(&mut pdf);
    let bounds = request.bounds;

    let mut kids: Vec<Object> = Vec::new();
    for page in &request.document.pages {
        let mut painter = PagePainter::new(&mut pdf, page.width, page.height, bounds);
        painter.background(page)?;
        for field in request.document.fields_on_page(page.number) {
            match &request.record {
                Some(record) => painter.filled_field(field, record)?,
                None => painter.template_field(field)?,
            }
        }
        let (ops, xobjects) = painter.finish();

        let content_id = pdf.add_object(Object::Stream(Stream::new(
            Dictionary::new(),
            ops.into_bytes(),
        )));

        let mut font_dict = Dictionary::new();
        for (key, id) in &font_ids {
            font_dict.set(*key, Object::Reference(*id));
        }
        let mut resources = dictionary! { "Font" => Object::Dictionary(font_dict) };
        if !xobjects.is_empty() {
            let mut xobj_dict = Dictionary::new();
            for (name, id) in &xobjects {
                xobj_dict.set(name.as_str(), Object::Reference(*id));
            }
            resources.set("XObject", Object::Dictionary(xobj_dict));
        }

        let page_id = pdf.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(bounds.width as f32),
                Object::Real(bounds.height as f32),
            ],
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Dictionary(resources),
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    pdf.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(page_count),
        }),
    );
    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    pdf.trailer.set("Root", Object::Reference(catalog_id));

    let mut out = Vec::new();
    pdf.save_to(&mut out)
        .map_err(|e| FormDocError::Pdf(format!("failed to serialize PDF: {e}")))?;
    Ok(out)
}

const TEMPLATE_OUTLINE: (f32, f32, f32) = (0.29, 0.44, 0.85);
const PLACEHOLDER_GRAY: (f32, f32, f32) = (0.55, 0.55, 0.55);
const LABEL_GRAY: (f32, f32, f32) = (0.25, 0.25, 0.25);

/// Accumulates content-stream operations and image resources for one page
struct PagePainter<'a> {
    pdf: &'a mut lopdf::Document,
    ops: String,
    xobjects: Vec<(String, ObjectId)>,
    page_px_width: f64,
    page_px_height: f64,
    bounds: PageBounds,
    image_seq: usize,
}

impl<'a> PagePainter<'a> {
    fn new(pdf: &'a mut lopdf::Document, page_px_width: u32, page_px_height: u32, bounds: PageBounds) -> Self {
        Self {
            pdf,
            ops: String::new(),
            xobjects: Vec::new(),
            page_px_width: page_px_width as f64,
            page_px_height: page_px_height as f64,
            bounds,
            image_seq: 0,
        }
    }

    fn finish(self) -> (String, Vec<(String, ObjectId)>) {
        (self.ops, self.xobjects)
    }

    /// Draw the page raster as a full-bleed background image
    fn background(&mut self, page: &formdoc_types::Page) -> Result<(), FormDocError> {
        let Some(bytes) = page.image.png_bytes() else {
            return Ok(());
        };
        let bytes = bytes.to_vec();
        match self.register_image(&bytes) {
            Ok(name) => {
                self.ops.push_str(&format!(
                    "q {:.2} 0 0 {:.2} 0 0 cm /{} Do Q\n",
                    self.bounds.width, self.bounds.height, name
                ));
            }
            Err(e) => {
                warn!(page = page.number, error = %e, "page raster unusable, exporting without background");
            }
        }
        Ok(())
    }

    fn template_field(&mut self, field: &Field) -> Result<(), FormDocError> {
        let rect = self.field_rect(field);
        let [x1, y1, _, y2] = rect;
        let font_size = self.scaled_font_size(field);

        self.stroke_rect(rect, TEMPLATE_OUTLINE, 0.75);

        if field.show_label && !field.label.is_empty() {
            let label_size = (font_size * 0.85).max(4.0);
            let (lx, ly) = match field.label_position {
                LabelPosition::Top => (x1, y2 + 3.0),
                LabelPosition::Left => {
                    // Standard fonts average roughly half the em per glyph
                    let approx_width = 0.5 * label_size * field.label.chars().count() as f64;
                    (x1 - 4.0 - approx_width, y1 + (y2 - y1 - label_size) / 2.0)
                }
            };
            self.text("Helv", label_size, lx, ly, LABEL_GRAY, &field.label);
        }

        match &field.kind {
            FieldKind::Checkbox => {}
            FieldKind::Image { image_src } => match image_src {
                Some(src) => self.image_or_placeholder(src, rect, font_size),
                None => self.placeholder_text(field, rect, font_size),
            },
            _ => self.placeholder_text(field, rect, font_size),
        }
        Ok(())
    }

    fn filled_field(&mut self, field: &Field, record: &UserFieldRecord) -> Result<(), FormDocError> {
        let Some(value) = record.value(&field.id) else {
            return Ok(());
        };
        if value.is_blank() && !matches!(field.kind, FieldKind::Checkbox) {
            return Ok(());
        }
        let rect = self.field_rect(field);
        let [x1, y1, _, y2] = rect;
        let font_size = self.scaled_font_size(field);
        let color = parse_hex_color(&field.font_color);

        match &field.kind {
            FieldKind::Checkbox => {
                if value.truthy() {
                    let glyph_size = ((y2 - y1) * 0.85).max(4.0);
                    self.text(
                        "ZaDb",
                        glyph_size,
                        x1 + (y2 - y1) * 0.1,
                        y1 + (y2 - y1) * 0.18,
                        color,
                        "4",
                    );
                }
            }
            FieldKind::Signature => {
                if let Some(text) = value.as_text() {
                    if text.starts_with("data:") {
                        self.image_or_placeholder(text, rect, font_size);
                    } else {
                        let size = (font_size * 1.2).max(6.0);
                        self.text("TiIt", size, x1 + 2.0, y1 + (y2 - y1 - size) / 2.0, color, text);
                    }
                }
            }
            FieldKind::Image { .. } => {
                if let Some(src) = value.as_text() {
                    self.image_or_placeholder(src, rect, font_size);
                }
            }
            _ => {
                if let Some(text) = value.as_text() {
                    let key = fonts::resource_key(fonts::standard_font(&field.font_family));
                    self.text(key, font_size, x1 + 2.0, y1 + (y2 - y1 - font_size) / 2.0, color, text);
                }
            }
        }
        Ok(())
    }

    fn placeholder_text(&mut self, field: &Field, rect: [f64; 4], font_size: f64) {
        let text = field.kind.placeholder();
        if text.is_empty() {
            return;
        }
        let [x1, y1, _, y2] = rect;
        self.text(
            "Helv",
            font_size,
            x1 + 3.0,
            y1 + (y2 - y1 - font_size) / 2.0,
            PLACEHOLDER_GRAY,
            text,
        );
    }

    /// Draw a data-URI image into the rect; degrade to a text marker when
    /// the payload is unusable
    fn image_or_placeholder(&mut self, src: &str, rect: [f64; 4], font_size: f64) {
        let result = images::decode_data_uri(src).and_then(|bytes| self.register_image(&bytes));
        let [x1, y1, x2, y2] = rect;
        match result {
            Ok(name) => {
                self.ops.push_str(&format!(
                    "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /{} Do Q\n",
                    x2 - x1,
                    y2 - y1,
                    x1,
                    y1,
                    name
                ));
            }
            Err(e) => {
                warn!(error = %e, "image payload unusable, drawing placeholder");
                self.text(
                    "Helv",
                    font_size,
                    x1 + 3.0,
                    y1 + (y2 - y1 - font_size) / 2.0,
                    PLACEHOLDER_GRAY,
                    "Image unavailable",
                );
            }
        }
    }

    fn register_image(&mut self, bytes: &[u8]) -> Result<String, FormDocError> {
        let (id, _, _) = images::embed_png(self.pdf, bytes)?;
        self.image_seq += 1;
        let name = format!("Im{}", self.image_seq);
        self.xobjects.push((name.clone(), id));
        Ok(name)
    }

    fn field_rect(&self, field: &Field) -> [f64; 4] {
        coords::field_rect_to_pdf(
            field.x,
            field.y,
            field.width,
            field.height,
            self.page_px_width,
            self.page_px_height,
            self.bounds,
        )
    }

    fn scaled_font_size(&self, field: &Field) -> f64 {
        let scale = self.bounds.height / self.page_px_height;
        (field.font_size * scale).clamp(4.0, 48.0)
    }

    fn text(&mut self, font_key: &str, size: f64, x: f64, y: f64, color: (f32, f32, f32), text: &str) {
        let (r, g, b) = color;
        self.ops.push_str(&format!(
            "BT /{font_key} {size:.2} Tf {r:.3} {g:.3} {b:.3} rg {x:.2} {y:.2} Td ({}) Tj ET\n",
            escape_pdf_string(text)
        ));
    }

    fn stroke_rect(&mut self, rect: [f64; 4], color: (f32, f32, f32), line_width: f64) {
        let [x1, y1, x2, y2] = rect;
        let (r, g, b) = color;
        self.ops.push_str(&format!(
            "q {r:.3} {g:.3} {b:.3} RG {line_width:.2} w {x1:.2} {y1:.2} {:.2} {:.2} re S Q\n",
            x2 - x1,
            y2 - y1
        ));
    }
}

/// Escape a string for inclusion in a PDF literal string
fn escape_pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii() => out.push(c),
            // literal strings are Latin-1; anything beyond gets a marker
            _ => out.push('?'),
        }
    }
    out
}

/// Parse `#rrggbb` (or `#rgb`) into normalized RGB; black on bad input
pub(crate) fn parse_hex_color(color: &str) -> (f32, f32, f32) {
    let hex = color.trim().trim_start_matches('#');
    // byte-indexed slicing below requires single-byte chars
    if !hex.is_ascii() {
        return (0.0, 0.0, 0.0);
    }
    let expand = |h: u8| h * 17;
    let channels = match hex.len() {
        6 => (
            u8::from_str_radix(&hex[0..2], 16),
            u8::from_str_radix(&hex[2..4], 16),
            u8::from_str_radix(&hex[4..6], 16),
        ),
        3 => (
            u8::from_str_radix(&hex[0..1], 16).map(expand),
            u8::from_str_radix(&hex[1..2], 16).map(expand),
            u8::from_str_radix(&hex[2..3], 16).map(expand),
        ),
        _ => return (0.0, 0.0, 0.0),
    };
    match channels {
        (Ok(r), Ok(g), Ok(b)) => (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0),
        _ => (0.0, 0.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formdoc_types::{Document, FieldValue, Page, PageImage, Role, UserFieldRecord};
    use pretty_assertions::assert_eq;

    fn document_with_page() -> Document {
        let mut doc = Document::new("Lease Agreement");
        doc.pages.push(Page {
            number: 1,
            width: 816,
            height: 1056,
            image: PageImage::Reference("page-1.png".to_string()),
        });
        doc
    }

    fn add_field(doc: &mut Document, kind: FieldKind, x: f64, y: f64) -> String {
        let field = Field::new(kind, 1, x, y);
        let id = field.id.clone();
        doc.dropped_fields.entry(1).or_default().push(field);
        id
    }

    fn page_text(bytes: &[u8]) -> String {
        let pdf = lopdf::Document::load_mem(bytes).unwrap();
        let pages = pdf.get_pages();
        let content = pdf.get_page_content(pages[&1]).unwrap();
        String::from_utf8_lossy(&content).into_owned()
    }

    #[test]
    fn empty_document_is_rejected() {
        let request = ExportRequest::template(Document::new("Empty"));
        assert!(matches!(export(&request), Err(FormDocError::EmptyDocument)));
    }

    #[test]
    fn template_export_is_a_loadable_pdf() {
        let mut doc = document_with_page();
        add_field(&mut doc, FieldKind::Text, 100.0, 100.0);
        let out = export(&ExportRequest::template(doc)).unwrap();
        let pdf = lopdf::Document::load_mem(&out.bytes).unwrap();
        assert_eq!(pdf.get_pages().len(), 1);
        assert_eq!(out.filename, "Lease_Agreement_template.pdf");
    }

    #[test]
    fn template_select_shows_first_option() {
        let mut doc = document_with_page();
        add_field(
            &mut doc,
            FieldKind::Select {
                options: vec!["Monthly".to_string(), "Yearly".to_string()],
            },
            50.0,
            50.0,
        );
        let out = export(&ExportRequest::template(doc)).unwrap();
        assert!(page_text(&out.bytes).contains("(Monthly)"));
    }

    #[test]
    fn filled_checkbox_draws_glyph_only_when_truthy() {
        let mut doc = document_with_page();
        let id = add_field(&mut doc, FieldKind::Checkbox, 40.0, 40.0);

        let mut record = UserFieldRecord::new(Role::Applicant);
        record.field_values.insert(id.clone(), FieldValue::Bool(true));
        let out = export(&ExportRequest::filled(doc.clone(), "u1", record)).unwrap();
        assert!(page_text(&out.bytes).contains("/ZaDb"));

        let mut record = UserFieldRecord::new(Role::Applicant);
        record.field_values.insert(id, FieldValue::Bool(false));
        let out = export(&ExportRequest::filled(doc, "u1", record)).unwrap();
        assert!(!page_text(&out.bytes).contains("/ZaDb"));
    }

    #[test]
    fn filled_export_draws_values_not_placeholders() {
        let mut doc = document_with_page();
        let id = add_field(&mut doc, FieldKind::Text, 100.0, 100.0);
        let mut record = UserFieldRecord::new(Role::Applicant);
        record
            .field_values
            .insert(id, FieldValue::Text("Jane Doe".to_string()));
        let out = export(&ExportRequest::filled(doc, "user-7", record)).unwrap();
        let text = page_text(&out.bytes);
        assert!(text.contains("(Jane Doe)"));
        assert!(!text.contains("RG"), "filled exports have no template outlines");
        assert_eq!(out.filename, "Lease_Agreement_user_7.pdf");
    }

    #[test]
    fn exports_are_deterministic() {
        let mut doc = document_with_page();
        add_field(&mut doc, FieldKind::Text, 10.0, 20.0);
        add_field(&mut doc, FieldKind::Date, 30.0, 40.0);
        let a = export(&ExportRequest::template(doc.clone())).unwrap();
        let b = export(&ExportRequest::template(doc)).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn filename_sanitization() {
        assert_eq!(export_filename("W-9 (2024)", None), "W_9_2024_template.pdf");
        assert_eq!(export_filename("", None), "document_template.pdf");
        assert_eq!(export_filename("Lease", Some("a/b c")), "Lease_a_b_c.pdf");
        assert_eq!(export_filename("Lease", Some("")), "Lease.pdf");
    }

    #[test]
    fn hex_colors_parse_with_black_fallback() {
        assert_eq!(parse_hex_color("#ff0000"), (1.0, 0.0, 0.0));
        assert_eq!(parse_hex_color("#fff"), (1.0, 1.0, 1.0));
        assert_eq!(parse_hex_color("not-a-color"), (0.0, 0.0, 0.0));
        // multi-byte input whose byte length looks like a valid hex width
        assert_eq!(parse_hex_color("€€"), (0.0, 0.0, 0.0));
        assert_eq!(parse_hex_color("#é0"), (0.0, 0.0, 0.0));
    }

    #[test]
    fn multibyte_font_color_degrades_to_black() {
        let mut doc = document_with_page();
        let id = add_field(&mut doc, FieldKind::Text, 100.0, 100.0);
        if let Some(field) = doc.field_mut(&id) {
            field.font_color = "€€".to_string();
        }
        let mut record = UserFieldRecord::new(Role::Applicant);
        record
            .field_values
            .insert(id, FieldValue::Text("Jane".to_string()));
        let out = export(&ExportRequest::filled(doc, "u1", record)).unwrap();
        let text = page_text(&out.bytes);
        assert!(text.contains("(Jane)"));
        assert!(text.contains("0.000 0.000 0.000 rg"));
    }

    #[test]
    fn pdf_string_escaping() {
        assert_eq!(escape_pdf_string("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(escape_pdf_string("line1\nline2"), "line1\\nline2");
    }

    #[tokio::test]
    async fn timeout_wrapper_returns_the_export() {
        let mut doc = document_with_page();
        add_field(&mut doc, FieldKind::Text, 5.0, 5.0);
        let out = export_with_timeout(ExportRequest::template(doc), 5_000)
            .await
            .unwrap();
        assert!(out.bytes.starts_with(b"%PDF"));
    }
}
