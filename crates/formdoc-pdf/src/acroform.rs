//! Interactive form-field injection
//!
//! The alternative to flattening: fields become AcroForm widget annotations
//! on the source PDF, so the output stays editable in a viewer. When no
//! source PDF accompanies the request, widgets are placed on generated blank
//! pages instead.

use formdoc_types::{Field, FieldKind, FieldValue, FormDocError, PageBounds};
use lopdf::{dictionary, Dictionary, Object, ObjectId};
use tracing::warn;

use crate::coords;
use crate::export::ExportRequest;

const COMBO_FLAG: i64 = 1 << 17;

pub(crate) fn inject(request: &ExportRequest) -> Result<Vec<u8>, FormDocError> {
    let mut pdf = match &request.source_pdf {
        Some(bytes) => lopdf::Document::load_mem(bytes)
            .map_err(|e| FormDocError::CorruptFile(format!("source PDF unreadable: {e}")))?,
        None => {
            warn!("no source PDF supplied, placing widgets on blank pages");
            blank_document(request.document.pages.len(), request.bounds)
        }
    };

    let helv_id = pdf.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let zadb_id = pdf.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "ZapfDingbats",
    });
    let acroform_id = ensure_acroform(&mut pdf, helv_id, zadb_id)?;

    let pages = pdf.get_pages();
    for page in &request.document.pages {
        let Some(&page_id) = pages.get(&page.number) else {
            warn!(page = page.number, "source PDF has no such page, skipping its fields");
            continue;
        };
        for field in request.document.fields_on_page(page.number) {
            let rect = coords::field_rect_to_pdf(
                field.x,
                field.y,
                field.width,
                field.height,
                page.width as f64,
                page.height as f64,
                request.bounds,
            );
            let value = request.record.as_ref().and_then(|r| r.value(&field.id));
            let scale = request.bounds.height / page.height as f64;
            let widget = widget_dict(field, value, rect, page_id, field.font_size * scale);
            let widget_id = pdf.add_object(widget);
            append_to_acroform(&mut pdf, acroform_id, widget_id)?;
            append_to_page_annots(&mut pdf, page_id, widget_id)?;
        }
    }

    let mut out = Vec::new();
    pdf.save_to(&mut out)
        .map_err(|e| FormDocError::Pdf(format!("failed to serialize PDF: {e}")))?;
    Ok(out)
}

/// Build one widget annotation. Checkboxes are button fields, selects are
/// combo-box choice fields, everything else is a text field.
fn widget_dict(
    field: &Field,
    value: Option<&FieldValue>,
    rect: [f64; 4],
    page_id: ObjectId,
    font_size_pt: f64,
) -> Dictionary {
    let mut dict = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Rect" => rect.iter().map(|&v| Object::Real(v as f32)).collect::<Vec<_>>(),
        "T" => Object::string_literal(field.id.as_str()),
        "TU" => Object::string_literal(field.label.as_str()),
        "F" => Object::Integer(4),
        "P" => Object::Reference(page_id),
        "DA" => Object::string_literal(format!("/Helv {font_size_pt:.1} Tf 0 g")),
    };

    match &field.kind {
        FieldKind::Checkbox => {
            dict.set("FT", Object::Name(b"Btn".to_vec()));
            let state: &[u8] = if value.is_some_and(FieldValue::truthy) {
                b"Yes"
            } else {
                b"Off"
            };
            dict.set("V", Object::Name(state.to_vec()));
            dict.set("AS", Object::Name(state.to_vec()));
            dict.set("DA", Object::string_literal("/ZaDb 0 Tf 0 g"));
        }
        FieldKind::Select { options } => {
            dict.set("FT", Object::Name(b"Ch".to_vec()));
            dict.set("Ff", Object::Integer(COMBO_FLAG));
            dict.set(
                "Opt",
                options
                    .iter()
                    .map(|o| Object::string_literal(o.as_str()))
                    .collect::<Vec<_>>(),
            );
            if let Some(text) = value.and_then(FieldValue::as_text) {
                dict.set("V", Object::string_literal(text));
            }
        }
        _ => {
            dict.set("FT", Object::Name(b"Tx".to_vec()));
            if let Some(text) = value.and_then(FieldValue::as_text) {
                dict.set("V", Object::string_literal(text));
            }
        }
    }
    dict
}

/// Return the catalog's AcroForm, creating one when the source has none.
/// NeedAppearances makes viewers regenerate appearance streams, so we never
/// write them ourselves.
fn ensure_acroform(
    pdf: &mut lopdf::Document,
    helv_id: ObjectId,
    zadb_id: ObjectId,
) -> Result<ObjectId, FormDocError> {
    let root_id = pdf
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|e| FormDocError::Pdf(format!("missing document catalog: {e}")))?;

    let existing = pdf
        .get_object(root_id)
        .ok()
        .and_then(|o| o.as_dict().ok())
        .and_then(|d| d.get(b"AcroForm").ok())
        .cloned();
    match existing {
        Some(Object::Reference(id)) => return Ok(id),
        // an inline AcroForm dictionary is promoted to its own object so the
        // source's existing fields survive and new widgets can be appended
        Some(Object::Dictionary(mut dict)) => {
            if !dict.has(b"NeedAppearances") {
                dict.set("NeedAppearances", Object::Boolean(true));
            }
            let acroform_id = pdf.add_object(Object::Dictionary(dict));
            pdf.get_object_mut(root_id)
                .and_then(|o| o.as_dict_mut())
                .map_err(|e| FormDocError::Pdf(format!("catalog is not a dictionary: {e}")))?
                .set("AcroForm", Object::Reference(acroform_id));
            return Ok(acroform_id);
        }
        _ => {}
    }

    let acroform_id = pdf.add_object(dictionary! {
        "Fields" => Object::Array(Vec::new()),
        "NeedAppearances" => Object::Boolean(true),
        "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
        "DR" => Object::Dictionary(dictionary! {
            "Font" => Object::Dictionary(dictionary! {
                "Helv" => Object::Reference(helv_id),
                "ZaDb" => Object::Reference(zadb_id),
            }),
        }),
    });
    pdf.get_object_mut(root_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| FormDocError::Pdf(format!("catalog is not a dictionary: {e}")))?
        .set("AcroForm", Object::Reference(acroform_id));
    Ok(acroform_id)
}

fn append_to_acroform(
    pdf: &mut lopdf::Document,
    acroform_id: ObjectId,
    widget_id: ObjectId,
) -> Result<(), FormDocError> {
    let acroform = pdf
        .get_object_mut(acroform_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| FormDocError::Pdf(format!("AcroForm is not a dictionary: {e}")))?;
    match acroform.get_mut(b"Fields") {
        Ok(Object::Array(fields)) => fields.push(Object::Reference(widget_id)),
        _ => acroform.set("Fields", vec![Object::Reference(widget_id)]),
    }
    Ok(())
}

fn append_to_page_annots(
    pdf: &mut lopdf::Document,
    page_id: ObjectId,
    widget_id: ObjectId,
) -> Result<(), FormDocError> {
    let annots_ref = {
        let page = pdf
            .get_object_mut(page_id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| FormDocError::Pdf(format!("page is not a dictionary: {e}")))?;
        match page.get(b"Annots") {
            Ok(Object::Reference(id)) => Some(*id),
            Ok(Object::Array(_)) => None,
            _ => {
                page.set("Annots", vec![Object::Reference(widget_id)]);
                return Ok(());
            }
        }
    };
    let array = match annots_ref {
        Some(id) => pdf
            .get_object_mut(id)
            .and_then(|o| o.as_array_mut())
            .map_err(|e| FormDocError::Pdf(format!("Annots is not an array: {e}")))?,
        None => {
            let page = pdf
                .get_object_mut(page_id)
                .and_then(|o| o.as_dict_mut())
                .map_err(|e| FormDocError::Pdf(format!("page is not a dictionary: {e}")))?;
            match page.get_mut(b"Annots") {
                Ok(Object::Array(array)) => array,
                _ => return Err(FormDocError::Pdf("Annots is not an array".to_string())),
            }
        }
    };
    array.push(Object::Reference(widget_id));
    Ok(())
}

/// Minimal empty pages at the output size, used when widgets must be placed
/// without an uploaded source
fn blank_document(page_count: usize, bounds: PageBounds) -> lopdf::Document {
    let mut pdf = lopdf::Document::with_version("1.7");
    let pages_id = pdf.new_object_id();
    let kids: Vec<Object> = (0..page_count.max(1))
        .map(|_| {
            let page_id = pdf.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(bounds.width as f32),
                    Object::Real(bounds.height as f32),
                ],
            });
            Object::Reference(page_id)
        })
        .collect();
    let count = kids.len() as i64;
    pdf.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = pdf.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    pdf.trailer.set("Root", Object::Reference(catalog_id));
    pdf
}
