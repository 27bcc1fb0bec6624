//! Role-gated render resolver
//!
//! One rule drives the applicant-fill, approver-review and template screens:
//! a field is editable exactly when the viewer's role matches the field's
//! role. Everything else is a read-only display of whatever value exists.

use formdoc_types::{Field, FieldValue, Role, UserFieldRecord};

/// What a viewer sees for one field
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<'a> {
    pub value: Option<&'a FieldValue>,
    pub editable: bool,
}

/// Pure resolution: `editable` iff the viewer's role equals the field's
/// role. `None` (no or unknown role) is never editable.
pub fn resolve<'a>(
    field: &Field,
    viewer_role: Option<Role>,
    record: Option<&'a UserFieldRecord>,
) -> Resolved<'a> {
    Resolved {
        value: record.and_then(|r| r.value(&field.id)),
        editable: viewer_role == Some(field.role),
    }
}

/// String front door for callers holding a persisted role string. Unknown
/// role strings resolve to read-only, never an error.
pub fn resolve_for_actor<'a>(
    field: &Field,
    viewer_role: &str,
    record: Option<&'a UserFieldRecord>,
) -> Resolved<'a> {
    resolve(field, Role::parse(viewer_role), record)
}
