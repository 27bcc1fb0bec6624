//! Document records: ordered pages plus page-indexed field lists

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FormDocError;
use crate::field::{Field, Role};

mod b64 {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(serde::de::Error::custom)
    }
}

/// Page raster: embedded PNG bytes or an external reference the persistence
/// layer resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageImage {
    Png {
        #[serde(with = "b64")]
        data: Vec<u8>,
    },
    Reference(String),
}

impl PageImage {
    pub fn png_bytes(&self) -> Option<&[u8]> {
        match self {
            PageImage::Png { data } => Some(data),
            PageImage::Reference(_) => None,
        }
    }
}

/// A single page raster record. Immutable once created except for wholesale
/// replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub number: u32,
    pub width: u32,
    pub height: u32,
    pub image: PageImage,
}

/// One workflow routing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub initiator: String,
    pub applicant: String,
    pub approvers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Active,
    Archived,
    #[default]
    Draft,
}

/// A document: ordered pages, a page-indexed map of field lists, and
/// workflow metadata. Exclusively owns its pages and fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub reference_id: String,
    pub document_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "type", default)]
    pub doc_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub to_be_filled_by: String,
    #[serde(default)]
    pub created_by: String,
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub workflows: Vec<Workflow>,
    #[serde(default)]
    pub pages: Vec<Page>,
    /// Field lists keyed by owning page number. Array position within a list
    /// is creation order, which is also z-order (later draws on top).
    #[serde(default)]
    pub dropped_fields: BTreeMap<u32, Vec<Field>>,
    #[serde(default)]
    pub status: DocumentStatus,
}

impl Document {
    pub fn new(document_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            reference_id: String::new(),
            document_name: document_name.into(),
            category: String::new(),
            doc_type: String::new(),
            description: String::new(),
            to_be_filled_by: String::new(),
            created_by: String::new(),
            created_on: Utc::now(),
            workflows: Vec::new(),
            pages: Vec::new(),
            dropped_fields: BTreeMap::new(),
            status: DocumentStatus::default(),
        }
    }

    pub fn page(&self, number: u32) -> Option<&Page> {
        self.pages.iter().find(|p| p.number == number)
    }

    /// Next sequential page number (pages are contiguous from 1)
    pub fn next_page_number(&self) -> u32 {
        self.pages.len() as u32 + 1
    }

    /// Fields on one page, in creation (z-) order
    pub fn fields_on_page(&self, number: u32) -> &[Field] {
        self.dropped_fields
            .get(&number)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All fields across all pages, page order then creation order
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.dropped_fields.values().flatten()
    }

    pub fn field(&self, field_id: &str) -> Option<&Field> {
        self.all_fields().find(|f| f.id == field_id)
    }

    pub fn field_mut(&mut self, field_id: &str) -> Option<&mut Field> {
        self.dropped_fields
            .values_mut()
            .flatten()
            .find(|f| f.id == field_id)
    }

    /// Required fields a given role must fill, across all pages
    pub fn required_fields_for_role(&self, role: Role) -> Vec<&Field> {
        self.all_fields()
            .filter(|f| f.required && f.role == role)
            .collect()
    }

    /// Structural invariants: contiguous page numbering from 1, field-map
    /// keys that reference real pages, consistent back-references, in-bounds
    /// geometry, and at least one option on every select.
    pub fn validate(&self) -> Result<(), FormDocError> {
        for (i, page) in self.pages.iter().enumerate() {
            if page.number != i as u32 + 1 {
                return Err(FormDocError::CorruptFile(format!(
                    "page numbering not contiguous: expected {}, found {}",
                    i + 1,
                    page.number
                )));
            }
        }
        for (page_number, fields) in &self.dropped_fields {
            let page = self
                .page(*page_number)
                .ok_or(FormDocError::PageNotFound(*page_number))?;
            for field in fields {
                if field.page != *page_number {
                    return Err(FormDocError::InvalidAttributeValue {
                        attribute: "page".to_string(),
                        reason: format!(
                            "field {} stored under page {} but references page {}",
                            field.id, page_number, field.page
                        ),
                    });
                }
                let (pw, ph) = (page.width as f64, page.height as f64);
                if field.x < 0.0
                    || field.y < 0.0
                    || field.x + field.width > pw
                    || field.y + field.height > ph
                {
                    return Err(FormDocError::InvalidAttributeValue {
                        attribute: "position".to_string(),
                        reason: format!("field {} extends beyond page bounds", field.id),
                    });
                }
                if let crate::field::FieldKind::Select { options } = &field.kind {
                    if options.is_empty() {
                        return Err(FormDocError::InvalidAttributeValue {
                            attribute: "options".to_string(),
                            reason: format!("select field {} has no options", field.id),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Persisted collection wrapper: `{ "documents": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentCollection {
    pub documents: Vec<Document>,
}
