//! Positioned field instances and their configurable attributes

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Workflow actor that may edit a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Initiator,
    #[default]
    Applicant,
    Approver,
}

impl Role {
    /// Parse a role string as stored in persisted records. Unknown strings
    /// yield `None`; callers must treat that as read-only, never an error.
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "initiator" => Some(Role::Initiator),
            "applicant" => Some(Role::Applicant),
            "approver" => Some(Role::Approver),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Initiator => "initiator",
            Role::Applicant => "applicant",
            Role::Approver => "approver",
        }
    }
}

/// Where the label is drawn relative to the field box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelPosition {
    #[default]
    Top,
    Left,
}

/// Field type discriminant with the closed set of per-type extras.
///
/// Serialized with a `type` tag so a persisted field reads as
/// `{"type":"select","options":[...],...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Name,
    Email,
    Phone,
    Date,
    Checkbox,
    Select {
        options: Vec<String>,
    },
    Signature,
    Image {
        #[serde(rename = "imageSrc", default)]
        image_src: Option<String>,
    },
}

impl FieldKind {
    /// Prefix used when generating field ids
    pub fn id_prefix(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Name => "name",
            FieldKind::Email => "email",
            FieldKind::Phone => "phone",
            FieldKind::Date => "date",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Select { .. } => "select",
            FieldKind::Signature => "signature",
            FieldKind::Image { .. } => "image",
        }
    }

    /// Default geometry (width, height) in authoring pixels
    pub fn default_size(&self) -> (f64, f64) {
        match self {
            FieldKind::Checkbox => (24.0, 24.0),
            FieldKind::Date => (150.0, 32.0),
            FieldKind::Signature => (200.0, 64.0),
            FieldKind::Image { .. } => (150.0, 150.0),
            _ => (200.0, 32.0),
        }
    }

    /// Human label used when the author has not renamed the field
    pub fn default_label(&self) -> &'static str {
        match self {
            FieldKind::Text => "Text",
            FieldKind::Name => "Name",
            FieldKind::Email => "Email",
            FieldKind::Phone => "Phone",
            FieldKind::Date => "Date",
            FieldKind::Checkbox => "Checkbox",
            FieldKind::Select { .. } => "Dropdown",
            FieldKind::Signature => "Signature",
            FieldKind::Image { .. } => "Image",
        }
    }

    /// Placeholder text shown in template exports. A select with options
    /// shows its first option, never the generic fallback.
    pub fn placeholder(&self) -> &str {
        match self {
            FieldKind::Text => "Text input",
            FieldKind::Name => "Full name",
            FieldKind::Email => "name@example.com",
            FieldKind::Phone => "(555) 555-5555",
            FieldKind::Date => "DD/MM/YYYY",
            FieldKind::Checkbox => "",
            FieldKind::Select { options } => {
                options.first().map(String::as_str).unwrap_or("Select...")
            }
            FieldKind::Signature => "Signature",
            FieldKind::Image { .. } => "No image",
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self, FieldKind::Select { .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self, FieldKind::Image { .. })
    }
}

fn default_true() -> bool {
    true
}

fn default_font_size() -> f64 {
    14.0
}

fn default_font_color() -> String {
    "#000000".to_string()
}

fn default_font_family() -> String {
    "Helvetica".to_string()
}

/// A positioned, typed input overlay on a document page.
///
/// Coordinates are page-local pixels with origin top-left; the owning page's
/// dimensions are the authoring coordinate space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Back-reference to the owning page number; must stay consistent with
    /// the `dropped_fields` key the field lives under.
    pub page: u32,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_true")]
    pub show_label: bool,
    #[serde(default)]
    pub label_position: LabelPosition,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_font_color")]
    pub font_color: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
}

impl Field {
    /// Create a field of the given kind at (x, y) on a page, with a fresh
    /// unique id and the kind's default geometry and label.
    pub fn new(kind: FieldKind, page: u32, x: f64, y: f64) -> Self {
        let (width, height) = kind.default_size();
        let id = format!("{}-{}", kind.id_prefix(), Uuid::new_v4());
        let label = kind.default_label().to_string();
        Self {
            id,
            kind,
            label,
            x,
            y,
            width,
            height,
            page,
            required: false,
            role: Role::default(),
            show_label: true,
            label_position: LabelPosition::default(),
            font_size: default_font_size(),
            font_color: default_font_color(),
            font_family: default_font_family(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn role_parse_is_lenient_on_case_and_whitespace() {
        assert_eq!(Role::parse(" Approver "), Some(Role::Approver));
        assert_eq!(Role::parse("applicant"), Some(Role::Applicant));
        assert_eq!(Role::parse("initiator"), Some(Role::Initiator));
        assert_eq!(Role::parse("owner"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn select_placeholder_is_first_option() {
        let kind = FieldKind::Select {
            options: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(kind.placeholder(), "A");
    }

    #[test]
    fn select_placeholder_falls_back_without_options() {
        let kind = FieldKind::Select { options: vec![] };
        assert_eq!(kind.placeholder(), "Select...");
    }

    #[test]
    fn field_json_carries_type_tag() {
        let field = Field::new(FieldKind::Date, 1, 10.0, 20.0);
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["type"], "date");
        assert_eq!(json["page"], 1);
        assert_eq!(json["labelPosition"], "top");
    }

    #[test]
    fn field_json_round_trips() {
        let field = Field::new(
            FieldKind::Select {
                options: vec!["Yes".to_string(), "No".to_string()],
            },
            2,
            100.0,
            200.0,
        );
        let json = serde_json::to_string(&field).unwrap();
        let back: Field = serde_json::from_str(&json).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn fresh_fields_get_unique_prefixed_ids() {
        let a = Field::new(FieldKind::Text, 1, 0.0, 0.0);
        let b = Field::new(FieldKind::Text, 1, 0.0, 0.0);
        assert!(a.id.starts_with("text-"));
        assert_ne!(a.id, b.id);
    }
}
