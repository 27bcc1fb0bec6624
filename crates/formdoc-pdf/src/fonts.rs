//! Standard-14 font selection and resources
//!
//! Authoring font families are mapped onto the PDF standard fonts for
//! maximum viewer compatibility; cursive families (and signature rendering)
//! land on Times-Italic.

use lopdf::{dictionary, Document, Object, ObjectId};

pub const HELVETICA: &str = "Helvetica";
pub const TIMES_ROMAN: &str = "Times-Roman";
pub const TIMES_ITALIC: &str = "Times-Italic";
pub const COURIER: &str = "Courier";
pub const ZAPF_DINGBATS: &str = "ZapfDingbats";

/// Map an authoring font family to a standard base font
pub fn standard_font(family: &str) -> &'static str {
    let lower = family.to_lowercase();
    match lower.as_str() {
        "serif" => return TIMES_ROMAN,
        "sans-serif" => return HELVETICA,
        "monospace" => return COURIER,
        "cursive" => return TIMES_ITALIC,
        _ => {}
    }
    if lower.contains("times") || lower.contains("georgia") || lower.contains("garamond") {
        return TIMES_ROMAN;
    }
    if lower.contains("courier") || lower.contains("mono") || lower.contains("consolas") {
        return COURIER;
    }
    HELVETICA
}

/// Resource name a base font is registered under
pub fn resource_key(base_font: &str) -> &'static str {
    match base_font {
        TIMES_ROMAN => "TiRo",
        TIMES_ITALIC => "TiIt",
        COURIER => "Cour",
        ZAPF_DINGBATS => "ZaDb",
        _ => "Helv",
    }
}

/// Register the standard fonts once per output document; returns
/// (resource key, font object id) pairs for page resource dictionaries.
pub fn register_standard_fonts(pdf: &mut Document) -> Vec<(&'static str, ObjectId)> {
    [
        HELVETICA,
        TIMES_ROMAN,
        TIMES_ITALIC,
        COURIER,
        ZAPF_DINGBATS,
    ]
    .iter()
    .map(|base| {
        let id = pdf.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => Object::Name(base.as_bytes().to_vec()),
        });
        (resource_key(base), id)
    })
    .collect()
}
