//! End-to-end workflow scenarios over the document store

use formdoc_core::{
    resolve_for_actor, Decision, DocumentStore, FieldEditor, FieldUpdate, MemoryAdapter,
};
use formdoc_types::{
    Document, DocumentEvent, FieldKind, FillStatus, FormDocError, Page, PageImage, Role,
    PAGE_HEIGHT_PX, PAGE_WIDTH_PX,
};
use pretty_assertions::assert_eq;

fn single_page_document(name: &str) -> Document {
    let mut doc = Document::new(name);
    doc.pages.push(Page {
        number: 1,
        width: PAGE_WIDTH_PX,
        height: PAGE_HEIGHT_PX,
        image: PageImage::Reference("page-1.png".to_string()),
    });
    doc
}

/// Authoring, filling, and an applicant submit: missing required fields
/// block with the exact offender list, filling in unblocks.
#[test]
fn applicant_submit_round_trip() {
    let mut doc = single_page_document("Employment Application");
    let mut editor = FieldEditor::new(&mut doc);
    let name_field = editor
        .add_field(1, FieldKind::Name, 100.0, 100.0)
        .unwrap()
        .id
        .clone();
    editor
        .update_field(&name_field, FieldUpdate::Required(true))
        .unwrap();
    editor
        .update_field(&name_field, FieldUpdate::Label("Full name".to_string()))
        .unwrap();
    let doc_id = doc.id.clone();

    let mut store = DocumentStore::open(MemoryAdapter::new()).unwrap();
    store.add_document(doc, None).unwrap();

    // the applicant sees an editable field with no value yet
    let document = store.document(&doc_id).unwrap();
    let field = document.field(&name_field).unwrap();
    let view = resolve_for_actor(field, "applicant", None);
    assert!(view.editable);
    assert!(view.value.is_none());

    // submit with nothing filled: blocked, nothing changed
    let err = store.submit(&doc_id, "jane").unwrap_err();
    match err {
        FormDocError::ValidationFailure { missing } => {
            assert_eq!(missing.len(), 1);
            assert_eq!(missing[0].id, name_field);
            assert_eq!(missing[0].label, "Full name");
            assert_eq!(missing[0].page, 1);
        }
        other => panic!("expected ValidationFailure, got {other:?}"),
    }
    assert!(store
        .get_user_data(&doc_id, "jane")
        .map_or(true, |r| r.status == FillStatus::Pending));

    // fill and submit
    store
        .fill_mut()
        .set_field_value(&doc_id, "jane", Role::Applicant, &name_field, "Jane".into());
    store.submit(&doc_id, "jane").unwrap();

    let record = store.get_user_data(&doc_id, "jane").unwrap();
    assert_eq!(record.status, FillStatus::Submitted);
    assert!(record.submitted_at.is_some());

    // submitted fields are read-only for the approver role
    let document = store.document(&doc_id).unwrap();
    let field = document.field(&name_field).unwrap();
    let view = resolve_for_actor(field, "approver", store.get_user_data(&doc_id, "jane"));
    assert!(!view.editable);
    assert_eq!(view.value.and_then(|v| v.as_text()), Some("Jane"));
}

/// Approval requires the approver-role fields filled and non-empty remarks;
/// a rejection sends the applicant back to an editable state.
#[test]
fn approver_decision_round_trip() {
    let mut doc = single_page_document("Expense Claim");
    let mut editor = FieldEditor::new(&mut doc);
    let amount = editor
        .add_field(1, FieldKind::Text, 50.0, 50.0)
        .unwrap()
        .id
        .clone();
    editor
        .update_field(&amount, FieldUpdate::Required(true))
        .unwrap();
    let sign_off = editor
        .add_field(1, FieldKind::Signature, 50.0, 200.0)
        .unwrap()
        .id
        .clone();
    editor
        .update_field(&sign_off, FieldUpdate::Required(true))
        .unwrap();
    editor
        .update_field(&sign_off, FieldUpdate::Role(Role::Approver))
        .unwrap();
    let doc_id = doc.id.clone();

    let mut store = DocumentStore::open(MemoryAdapter::new()).unwrap();
    store.add_document(doc, None).unwrap();
    store
        .fill_mut()
        .set_field_value(&doc_id, "jane", Role::Applicant, &amount, "120.00".into());
    store.submit(&doc_id, "jane").unwrap();

    // approval blocked until the approver's signature field is filled
    let err = store
        .decide(&doc_id, "omar", "jane", Decision::Approved, "looks right")
        .unwrap_err();
    assert!(matches!(err, FormDocError::ValidationFailure { .. }));

    // remarks are mandatory even for approvals
    store
        .fill_mut()
        .set_field_value(&doc_id, "jane", Role::Applicant, &sign_off, "Omar".into());
    assert!(matches!(
        store.decide(&doc_id, "omar", "jane", Decision::Approved, "   "),
        Err(FormDocError::InvalidAttributeValue { .. })
    ));

    store
        .decide(&doc_id, "omar", "jane", Decision::Rejected, "wrong amount")
        .unwrap();
    let record = store.get_user_data(&doc_id, "jane").unwrap();
    assert_eq!(record.status, FillStatus::Rejected);
    assert_eq!(record.remarks.as_deref(), Some("wrong amount"));

    // rejected applicants revise and go around again
    store
        .fill_mut()
        .set_field_value(&doc_id, "jane", Role::Applicant, &amount, "125.00".into());
    store.submit(&doc_id, "jane").unwrap();
    store
        .decide(&doc_id, "omar", "jane", Decision::Approved, "ok now")
        .unwrap();
    let record = store.get_user_data(&doc_id, "jane").unwrap();
    assert_eq!(record.status, FillStatus::Approved);
    assert_eq!(record.approver.as_deref(), Some("omar"));

    let events = store.drain_events();
    assert!(events.contains(&DocumentEvent::Decided {
        user_id: "jane".to_string(),
        approver: "omar".to_string(),
        approved: true,
    }));
}

/// Deleting a document drops every user's fill data with it
#[test]
fn delete_cascades_across_users() {
    let mut doc = single_page_document("Old Form");
    let mut editor = FieldEditor::new(&mut doc);
    let field = editor
        .add_field(1, FieldKind::Text, 10.0, 10.0)
        .unwrap()
        .id
        .clone();
    let doc_id = doc.id.clone();

    let mut store = DocumentStore::open(MemoryAdapter::new()).unwrap();
    store.add_document(doc, Some(b"%PDF-1.7 stub".to_vec())).unwrap();
    for user in ["jane", "omar", "priya"] {
        store
            .fill_mut()
            .set_field_value(&doc_id, user, Role::Applicant, &field, "x".into());
    }

    assert!(store.delete_document(&doc_id).unwrap());
    assert!(store.document(&doc_id).is_none());
    assert!(store.source_buffer(&doc_id).is_none());
    for user in ["jane", "omar", "priya"] {
        assert!(store.get_user_data(&doc_id, user).is_none());
    }
}
