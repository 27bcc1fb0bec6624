//! Per-user fill records and the submit/approve workflow
//!
//! Value writes are permissive; validation happens at submit and decision
//! time, across all pages of the document. Status moves
//! `pending -> submitted -> approved | rejected`; a rejected applicant may
//! revise and re-submit, an approved record is terminal.

use std::collections::BTreeMap;

use chrono::Utc;
use formdoc_types::{
    Document, FieldValue, FillStatus, FormDocError, MissingField, Role, UserFieldRecord,
};

/// Persisted shape: document id -> user id -> record
pub type FillData = BTreeMap<String, BTreeMap<String, UserFieldRecord>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Default)]
pub struct FillStore {
    records: FillData,
}

impl FillStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(records: FillData) -> Self {
        Self { records }
    }

    pub fn data(&self) -> &FillData {
        &self.records
    }

    pub fn record(&self, document_id: &str, user_id: &str) -> Option<&UserFieldRecord> {
        self.records.get(document_id)?.get(user_id)
    }

    /// Upsert one field value. No validation against the field definition;
    /// that is deferred to submit.
    pub fn set_field_value(
        &mut self,
        document_id: &str,
        user_id: &str,
        role: Role,
        field_id: &str,
        value: FieldValue,
    ) {
        let record = self
            .records
            .entry(document_id.to_string())
            .or_default()
            .entry(user_id.to_string())
            .or_insert_with(|| UserFieldRecord::new(role));
        record.field_values.insert(field_id.to_string(), value);
    }

    /// Required fields for the record's role, across all pages, that lack a
    /// non-blank value. Page order first, creation order within a page.
    fn missing_required(
        document: &Document,
        role: Role,
        record: Option<&UserFieldRecord>,
    ) -> Vec<MissingField> {
        document
            .required_fields_for_role(role)
            .into_iter()
            .filter(|f| !record.is_some_and(|r| r.has_value(&f.id)))
            .map(|f| MissingField {
                id: f.id.clone(),
                label: f.label.clone(),
                page: f.page,
            })
            .collect()
    }

    /// Validate and submit one user's record. On failure, the exact set of
    /// missing required fields is returned and no state changes.
    pub fn submit(&mut self, document: &Document, user_id: &str) -> Result<(), FormDocError> {
        let record = self.record(&document.id, user_id);
        let role = record.map(|r| r.role).unwrap_or_default();

        if let Some(record) = record {
            match record.status {
                FillStatus::Pending | FillStatus::Rejected => {}
                from => {
                    return Err(FormDocError::InvalidTransition {
                        from,
                        to: FillStatus::Submitted,
                    })
                }
            }
        }

        let missing = Self::missing_required(document, role, record);
        if !missing.is_empty() {
            return Err(FormDocError::ValidationFailure { missing });
        }

        let record = self
            .records
            .entry(document.id.clone())
            .or_default()
            .entry(user_id.to_string())
            .or_insert_with(|| UserFieldRecord::new(role));
        record.status = FillStatus::Submitted;
        record.submitted_at = Some(Utc::now());
        Ok(())
    }

    /// Approve or reject a submitted applicant. Requires non-blank remarks
    /// and every approver-role required field filled on the applicant's
    /// record.
    pub fn decide(
        &mut self,
        document: &Document,
        approver_id: &str,
        applicant_id: &str,
        decision: Decision,
        remarks: &str,
    ) -> Result<(), FormDocError> {
        if remarks.trim().is_empty() {
            return Err(FormDocError::InvalidAttributeValue {
                attribute: "remarks".to_string(),
                reason: "remarks must not be empty".to_string(),
            });
        }

        let record = self
            .record(&document.id, applicant_id)
            .ok_or_else(|| FormDocError::FieldNotFound(applicant_id.to_string()))?;
        let to = match decision {
            Decision::Approved => FillStatus::Approved,
            Decision::Rejected => FillStatus::Rejected,
        };
        if record.status != FillStatus::Submitted {
            return Err(FormDocError::InvalidTransition {
                from: record.status,
                to,
            });
        }

        let missing = Self::missing_required(document, Role::Approver, Some(record));
        if !missing.is_empty() {
            return Err(FormDocError::ValidationFailure { missing });
        }

        // Checked above that the record exists
        if let Some(record) = self
            .records
            .get_mut(&document.id)
            .and_then(|users| users.get_mut(applicant_id))
        {
            record.status = to;
            record.approver = Some(approver_id.to_string());
            record.remarks = Some(remarks.to_string());
            record.approved_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Cascade: drop every record for a deleted document. Returns how many
    /// user records were removed.
    pub fn remove_document(&mut self, document_id: &str) -> usize {
        self.records
            .remove(document_id)
            .map(|users| users.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formdoc_types::{Field, FieldKind, Page, PageImage};
    use pretty_assertions::assert_eq;

    fn document() -> Document {
        let mut doc = Document::new("onboarding");
        for number in 1..=2 {
            doc.pages.push(Page {
                number,
                width: 816,
                height: 1056,
                image: PageImage::Reference(format!("page-{number}.png")),
            });
        }
        doc
    }

    fn required_field(doc: &mut Document, kind: FieldKind, page: u32, role: Role) -> String {
        let mut field = Field::new(kind, page, 10.0, 10.0);
        field.required = true;
        field.role = role;
        let id = field.id.clone();
        doc.dropped_fields.entry(page).or_default().push(field);
        id
    }

    #[test]
    fn submit_reports_missing_fields_across_all_pages() {
        let mut doc = document();
        let on_page_1 = required_field(&mut doc, FieldKind::Text, 1, Role::Applicant);
        let on_page_2 = required_field(&mut doc, FieldKind::Date, 2, Role::Applicant);
        // approver fields never count against the applicant
        required_field(&mut doc, FieldKind::Text, 1, Role::Approver);

        let mut store = FillStore::new();
        store.set_field_value(&doc.id, "jane", Role::Applicant, &on_page_1, "Jane".into());

        let err = store.submit(&doc, "jane").unwrap_err();
        match err {
            FormDocError::ValidationFailure { missing } => {
                let ids: Vec<&str> = missing.iter().map(|m| m.id.as_str()).collect();
                assert_eq!(ids, vec![on_page_2.as_str()]);
                assert_eq!(missing[0].page, 2);
            }
            other => panic!("expected ValidationFailure, got {other:?}"),
        }
    }

    #[test]
    fn trimmed_empty_string_counts_as_missing() {
        let mut doc = document();
        let id = required_field(&mut doc, FieldKind::Text, 1, Role::Applicant);

        let mut store = FillStore::new();
        store.set_field_value(&doc.id, "jane", Role::Applicant, &id, "   ".into());
        assert!(store.submit(&doc, "jane").is_err());

        store.set_field_value(&doc.id, "jane", Role::Applicant, &id, "Jane".into());
        store.submit(&doc, "jane").unwrap();
        let record = store.record(&doc.id, "jane").unwrap();
        assert_eq!(record.status, FillStatus::Submitted);
        assert!(record.submitted_at.is_some());
    }

    #[test]
    fn explicit_false_checkbox_counts_as_filled() {
        let mut doc = document();
        let id = required_field(&mut doc, FieldKind::Checkbox, 1, Role::Applicant);

        let mut store = FillStore::new();
        store.set_field_value(&doc.id, "jane", Role::Applicant, &id, false.into());
        assert!(store.submit(&doc, "jane").is_ok());
    }

    #[test]
    fn submitted_record_cannot_resubmit() {
        let doc = document();
        let mut store = FillStore::new();
        store.submit(&doc, "jane").unwrap();
        assert!(matches!(
            store.submit(&doc, "jane"),
            Err(FormDocError::InvalidTransition {
                from: FillStatus::Submitted,
                ..
            })
        ));
    }

    #[test]
    fn rejected_applicant_may_revise_and_resubmit() {
        let doc = document();
        let mut store = FillStore::new();
        store.submit(&doc, "jane").unwrap();
        store
            .decide(&doc, "boss", "jane", Decision::Rejected, "needs work")
            .unwrap();
        assert_eq!(
            store.record(&doc.id, "jane").unwrap().status,
            FillStatus::Rejected
        );
        store.submit(&doc, "jane").unwrap();
        assert_eq!(
            store.record(&doc.id, "jane").unwrap().status,
            FillStatus::Submitted
        );
    }

    #[test]
    fn decide_requires_remarks() {
        let doc = document();
        let mut store = FillStore::new();
        store.submit(&doc, "jane").unwrap();
        assert!(matches!(
            store.decide(&doc, "boss", "jane", Decision::Approved, "  "),
            Err(FormDocError::InvalidAttributeValue { .. })
        ));
    }

    #[test]
    fn decide_requires_approver_fields_filled() {
        let mut doc = document();
        let approver_field = required_field(&mut doc, FieldKind::Text, 1, Role::Approver);

        let mut store = FillStore::new();
        store.submit(&doc, "jane").unwrap();

        let err = store
            .decide(&doc, "boss", "jane", Decision::Approved, "fine")
            .unwrap_err();
        assert!(matches!(err, FormDocError::ValidationFailure { .. }));

        store.set_field_value(
            &doc.id,
            "jane",
            Role::Applicant,
            &approver_field,
            "verified".into(),
        );
        store
            .decide(&doc, "boss", "jane", Decision::Approved, "fine")
            .unwrap();

        let record = store.record(&doc.id, "jane").unwrap();
        assert_eq!(record.status, FillStatus::Approved);
        assert_eq!(record.approver.as_deref(), Some("boss"));
        assert!(record.approved_at.is_some());
    }

    #[test]
    fn approved_record_is_terminal() {
        let doc = document();
        let mut store = FillStore::new();
        store.submit(&doc, "jane").unwrap();
        store
            .decide(&doc, "boss", "jane", Decision::Approved, "ok")
            .unwrap();
        assert!(store.submit(&doc, "jane").is_err());
        assert!(store
            .decide(&doc, "boss", "jane", Decision::Rejected, "changed my mind")
            .is_err());
    }

    #[test]
    fn failed_submit_changes_nothing() {
        let mut doc = document();
        required_field(&mut doc, FieldKind::Text, 1, Role::Applicant);

        let mut store = FillStore::new();
        store.set_field_value(&doc.id, "jane", Role::Applicant, "other", "x".into());
        let before = store.record(&doc.id, "jane").unwrap().clone();
        assert!(store.submit(&doc, "jane").is_err());
        assert_eq!(store.record(&doc.id, "jane").unwrap(), &before);
    }

    #[test]
    fn remove_document_cascades() {
        let doc = document();
        let mut store = FillStore::new();
        store.set_field_value(&doc.id, "jane", Role::Applicant, "f1", "x".into());
        store.set_field_value(&doc.id, "omar", Role::Approver, "f2", "y".into());
        assert_eq!(store.remove_document(&doc.id), 2);
        assert!(store.record(&doc.id, "jane").is_none());
        assert!(store.record(&doc.id, "omar").is_none());
    }
}
