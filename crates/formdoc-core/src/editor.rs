//! Field editor engine: mutations over a document's field map
//!
//! All placement and movement clamps coordinates to the owning page's
//! bounds. Attribute updates go through the typed [`FieldUpdate`] setters;
//! the string-keyed front door ignores unknown attribute names (logged) to
//! stay compatible with the persisted contract.

use formdoc_types::{
    Document, Field, FieldKind, FormDocError, LabelPosition, Page, PageImage, Role,
};
use tracing::warn;

use crate::rasterizer::blank_page_png;

/// A validated update to one field attribute
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Label(String),
    Required(bool),
    Role(Role),
    ShowLabel(bool),
    LabelPosition(LabelPosition),
    FontSize(f64),
    FontColor(String),
    FontFamily(String),
    Width(f64),
    Height(f64),
    Options(Vec<String>),
    ImageSrc(Option<String>),
}

impl FieldUpdate {
    /// Map a string-keyed attribute patch to a typed update. Unknown names
    /// yield `Ok(None)`; known names with a value of the wrong shape are
    /// rejected.
    pub fn from_attribute(
        name: &str,
        value: &serde_json::Value,
    ) -> Result<Option<FieldUpdate>, FormDocError> {
        let invalid = |reason: &str| FormDocError::InvalidAttributeValue {
            attribute: name.to_string(),
            reason: reason.to_string(),
        };
        let as_string = |v: &serde_json::Value| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid("expected a string"))
        };
        let as_bool = |v: &serde_json::Value| v.as_bool().ok_or_else(|| invalid("expected a bool"));
        let as_number =
            |v: &serde_json::Value| v.as_f64().ok_or_else(|| invalid("expected a number"));

        let update = match name {
            "label" => FieldUpdate::Label(as_string(value)?),
            "required" => FieldUpdate::Required(as_bool(value)?),
            "role" => {
                let s = as_string(value)?;
                let role = Role::parse(&s).ok_or_else(|| invalid("unknown role"))?;
                FieldUpdate::Role(role)
            }
            "showLabel" => FieldUpdate::ShowLabel(as_bool(value)?),
            "labelPosition" => match value.as_str() {
                Some("top") => FieldUpdate::LabelPosition(LabelPosition::Top),
                Some("left") => FieldUpdate::LabelPosition(LabelPosition::Left),
                _ => return Err(invalid("expected \"top\" or \"left\"")),
            },
            "fontSize" => FieldUpdate::FontSize(as_number(value)?),
            "fontColor" => FieldUpdate::FontColor(as_string(value)?),
            "fontFamily" => FieldUpdate::FontFamily(as_string(value)?),
            "width" => FieldUpdate::Width(as_number(value)?),
            "height" => FieldUpdate::Height(as_number(value)?),
            "options" => {
                let arr = value.as_array().ok_or_else(|| invalid("expected an array"))?;
                let options = arr
                    .iter()
                    .map(|v| {
                        v.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| invalid("options must be strings"))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                FieldUpdate::Options(options)
            }
            "imageSrc" => match value {
                serde_json::Value::Null => FieldUpdate::ImageSrc(None),
                serde_json::Value::String(s) => FieldUpdate::ImageSrc(Some(s.clone())),
                _ => return Err(invalid("expected a string or null")),
            },
            _ => return Ok(None),
        };
        Ok(Some(update))
    }

    fn attribute_name(&self) -> &'static str {
        match self {
            FieldUpdate::Label(_) => "label",
            FieldUpdate::Required(_) => "required",
            FieldUpdate::Role(_) => "role",
            FieldUpdate::ShowLabel(_) => "showLabel",
            FieldUpdate::LabelPosition(_) => "labelPosition",
            FieldUpdate::FontSize(_) => "fontSize",
            FieldUpdate::FontColor(_) => "fontColor",
            FieldUpdate::FontFamily(_) => "fontFamily",
            FieldUpdate::Width(_) => "width",
            FieldUpdate::Height(_) => "height",
            FieldUpdate::Options(_) => "options",
            FieldUpdate::ImageSrc(_) => "imageSrc",
        }
    }
}

/// Clamp a coordinate so `[pos, pos + extent]` stays inside `[0, limit]`
fn clamp_position(pos: f64, extent: f64, limit: f64) -> f64 {
    pos.clamp(0.0, (limit - extent).max(0.0))
}

/// Mutation operations over one document's field map
pub struct FieldEditor<'a> {
    doc: &'a mut Document,
}

impl<'a> FieldEditor<'a> {
    pub fn new(doc: &'a mut Document) -> Self {
        Self { doc }
    }

    /// Drop a new field of the given kind at (x, y) on a page. Coordinates
    /// are clamped into the page; the default geometry shrinks to fit pages
    /// smaller than it. Returns the new field so callers can select it.
    pub fn add_field(
        &mut self,
        page_number: u32,
        kind: FieldKind,
        x: f64,
        y: f64,
    ) -> Result<&Field, FormDocError> {
        let page = self
            .doc
            .page(page_number)
            .ok_or(FormDocError::PageNotFound(page_number))?;
        let (page_w, page_h) = (page.width as f64, page.height as f64);

        let kind = match kind {
            // A freshly dropped select starts with two placeholder options
            FieldKind::Select { options } if options.is_empty() => FieldKind::Select {
                options: vec!["Option 1".to_string(), "Option 2".to_string()],
            },
            other => other,
        };

        let mut field = Field::new(kind, page_number, 0.0, 0.0);
        field.width = field.width.min(page_w);
        field.height = field.height.min(page_h);
        field.x = clamp_position(x, field.width, page_w);
        field.y = clamp_position(y, field.height, page_h);

        let fields = self.doc.dropped_fields.entry(page_number).or_default();
        fields.push(field);
        Ok(fields.last().expect("just pushed"))
    }

    /// Re-clamp and move a field. A missing field is a logged no-op;
    /// returns whether anything moved. Array order (z-order) is untouched.
    pub fn move_field(&mut self, field_id: &str, new_x: f64, new_y: f64) -> bool {
        let Some(field) = self.doc.field(field_id) else {
            warn!(field_id, "move_field: field not found");
            return false;
        };
        let Some(page) = self.doc.page(field.page) else {
            warn!(field_id, page = field.page, "move_field: page not found");
            return false;
        };
        let (page_w, page_h) = (page.width as f64, page.height as f64);
        let (w, h) = (field.width, field.height);

        let Some(field) = self.doc.field_mut(field_id) else {
            return false;
        };
        field.x = clamp_position(new_x, w, page_w);
        field.y = clamp_position(new_y, h, page_h);
        true
    }

    /// Apply a typed attribute update. Invalid values are rejected with the
    /// prior state unchanged; a missing field is a logged no-op.
    pub fn update_field(
        &mut self,
        field_id: &str,
        update: FieldUpdate,
    ) -> Result<(), FormDocError> {
        let Some(field) = self.doc.field(field_id) else {
            warn!(field_id, "update_field: field not found");
            return Ok(());
        };
        let page = self
            .doc
            .page(field.page)
            .ok_or(FormDocError::PageNotFound(field.page))?;
        let (page_w, page_h) = (page.width as f64, page.height as f64);
        let (x, y) = (field.x, field.y);

        let invalid = |reason: String| FormDocError::InvalidAttributeValue {
            attribute: update.attribute_name().to_string(),
            reason,
        };

        // Validate against the current field before touching it
        match &update {
            FieldUpdate::FontSize(v) => {
                if *v <= 0.0 {
                    return Err(invalid("font size must be positive".to_string()));
                }
            }
            FieldUpdate::Width(v) => {
                if *v <= 0.0 {
                    return Err(invalid("width must be positive".to_string()));
                }
                if x + *v > page_w {
                    return Err(invalid(format!(
                        "width {} would extend past the page edge",
                        v
                    )));
                }
            }
            FieldUpdate::Height(v) => {
                if *v <= 0.0 {
                    return Err(invalid("height must be positive".to_string()));
                }
                if y + *v > page_h {
                    return Err(invalid(format!(
                        "height {} would extend past the page edge",
                        v
                    )));
                }
            }
            FieldUpdate::Options(options) => {
                if !field.kind.is_select() {
                    return Err(invalid("options only apply to select fields".to_string()));
                }
                if options.is_empty() {
                    return Err(invalid("a select needs at least one option".to_string()));
                }
            }
            FieldUpdate::ImageSrc(_) => {
                if !field.kind.is_image() {
                    return Err(invalid("imageSrc only applies to image fields".to_string()));
                }
            }
            _ => {}
        }

        let Some(field) = self.doc.field_mut(field_id) else {
            return Ok(());
        };
        match update {
            FieldUpdate::Label(v) => field.label = v,
            FieldUpdate::Required(v) => field.required = v,
            FieldUpdate::Role(v) => field.role = v,
            FieldUpdate::ShowLabel(v) => field.show_label = v,
            FieldUpdate::LabelPosition(v) => field.label_position = v,
            FieldUpdate::FontSize(v) => field.font_size = v,
            FieldUpdate::FontColor(v) => field.font_color = v,
            FieldUpdate::FontFamily(v) => field.font_family = v,
            FieldUpdate::Width(v) => field.width = v,
            FieldUpdate::Height(v) => field.height = v,
            FieldUpdate::Options(options) => field.kind = FieldKind::Select { options },
            FieldUpdate::ImageSrc(src) => field.kind = FieldKind::Image { image_src: src },
        }
        Ok(())
    }

    /// String-keyed attribute patch: unknown names are ignored (logged),
    /// known names route through the typed setter and its validation.
    pub fn update_field_attribute(
        &mut self,
        field_id: &str,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<(), FormDocError> {
        match FieldUpdate::from_attribute(name, value)? {
            Some(update) => self.update_field(field_id, update),
            None => {
                warn!(field_id, attribute = name, "ignoring unknown attribute");
                Ok(())
            }
        }
    }

    /// Remove a field from its page's list. Silent on absence.
    pub fn delete_field(&mut self, field_id: &str) -> bool {
        for fields in self.doc.dropped_fields.values_mut() {
            if let Some(pos) = fields.iter().position(|f| f.id == field_id) {
                fields.remove(pos);
                return true;
            }
        }
        false
    }

    /// Append a blank white page with the next sequential number
    pub fn add_blank_page(&mut self, width: u32, height: u32) -> Result<&Page, FormDocError> {
        let number = self.doc.next_page_number();
        let data = blank_page_png(width, height)?;
        self.doc.pages.push(Page {
            number,
            width,
            height,
            image: PageImage::Png { data },
        });
        Ok(self.doc.pages.last().expect("just pushed"))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn page_doc(width: u32, height: u32) -> Document {
        let mut doc = Document::new("prop");
        doc.pages.push(Page {
            number: 1,
            width,
            height,
            image: PageImage::Reference("p1".to_string()),
        });
        doc
    }

    proptest! {
        /// Property: every placed field lies fully inside its page, whatever
        /// the page size and drop point (including out-of-bounds drops).
        #[test]
        fn placed_fields_stay_inside_page(
            page_w in 1u32..3000,
            page_h in 1u32..3000,
            x in -2000.0f64..5000.0,
            y in -2000.0f64..5000.0,
        ) {
            let mut doc = page_doc(page_w, page_h);
            let mut editor = FieldEditor::new(&mut doc);
            let field = editor.add_field(1, FieldKind::Text, x, y).unwrap();

            prop_assert!(field.x >= 0.0);
            prop_assert!(field.y >= 0.0);
            prop_assert!(field.x + field.width <= page_w as f64 + f64::EPSILON);
            prop_assert!(field.y + field.height <= page_h as f64 + f64::EPSILON);
        }

        /// Property: moving to (x2, y2) and back to the original clamped
        /// coordinates restores the position exactly.
        #[test]
        fn move_roundtrip_is_idempotent(
            x1 in 0.0f64..800.0,
            y1 in 0.0f64..1000.0,
            x2 in -500.0f64..2000.0,
            y2 in -500.0f64..2000.0,
        ) {
            let mut doc = page_doc(816, 1056);
            let mut editor = FieldEditor::new(&mut doc);
            let id = editor.add_field(1, FieldKind::Text, x1, y1).unwrap().id.clone();
            let (orig_x, orig_y) = {
                let f = doc.field(&id).unwrap();
                (f.x, f.y)
            };

            let mut editor = FieldEditor::new(&mut doc);
            editor.move_field(&id, x2, y2);
            editor.move_field(&id, orig_x, orig_y);

            let f = doc.field(&id).unwrap();
            prop_assert_eq!(f.x, orig_x);
            prop_assert_eq!(f.y, orig_y);
        }
    }
}
