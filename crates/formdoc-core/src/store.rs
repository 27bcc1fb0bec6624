//! Persistence adapter contract and the document store
//!
//! The core functions identically whether documents live in memory or in
//! JSON files on disk; it only depends on [`PersistenceAdapter`]. The
//! [`DocumentStore`] composes an adapter with the fill store and the
//! source-buffer registry so that deleting a document cascades everywhere.
//!
//! Adapter failures surface as `Persistence` errors; in-memory state is not
//! rolled back (the local mutation is already applied).

use std::fs;
use std::path::PathBuf;

use formdoc_types::{
    Document, DocumentCollection, DocumentEvent, FieldKind, FormDocError, UserFieldRecord,
};
use tracing::debug;

use crate::editor::FieldEditor;
use crate::fill_store::{Decision, FillData, FillStore};
use crate::registry::SourceBufferRegistry;

/// Load/save contract for documents and per-user fill data
pub trait PersistenceAdapter {
    fn get_documents(&self) -> Result<Vec<Document>, FormDocError>;
    fn save_documents(&mut self, documents: &[Document]) -> Result<(), FormDocError>;
    fn get_user_field_data(&self) -> Result<FillData, FormDocError>;
    fn save_user_field_data(&mut self, data: &FillData) -> Result<(), FormDocError>;

    fn get_document(&self, id: &str) -> Result<Option<Document>, FormDocError> {
        Ok(self.get_documents()?.into_iter().find(|d| d.id == id))
    }

    fn add_document(&mut self, document: Document) -> Result<(), FormDocError> {
        let mut documents = self.get_documents()?;
        documents.push(document);
        self.save_documents(&documents)
    }

    fn update_document(&mut self, document: Document) -> Result<(), FormDocError> {
        let mut documents = self.get_documents()?;
        match documents.iter_mut().find(|d| d.id == document.id) {
            Some(slot) => *slot = document,
            None => documents.push(document),
        }
        self.save_documents(&documents)
    }

    fn delete_document(&mut self, id: &str) -> Result<bool, FormDocError> {
        let mut documents = self.get_documents()?;
        let before = documents.len();
        documents.retain(|d| d.id != id);
        let removed = documents.len() != before;
        if removed {
            self.save_documents(&documents)?;
        }
        Ok(removed)
    }
}

/// In-memory adapter, the default for tests and ephemeral sessions
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    documents: Vec<Document>,
    fill: FillData,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn get_documents(&self) -> Result<Vec<Document>, FormDocError> {
        Ok(self.documents.clone())
    }

    fn save_documents(&mut self, documents: &[Document]) -> Result<(), FormDocError> {
        self.documents = documents.to_vec();
        Ok(())
    }

    fn get_user_field_data(&self) -> Result<FillData, FormDocError> {
        Ok(self.fill.clone())
    }

    fn save_user_field_data(&mut self, data: &FillData) -> Result<(), FormDocError> {
        self.fill = data.clone();
        Ok(())
    }
}

/// Two-file JSON adapter: `{ "documents": [...] }` plus the fill-data map
#[derive(Debug, Clone)]
pub struct JsonFileAdapter {
    documents_path: PathBuf,
    fill_path: PathBuf,
}

impl JsonFileAdapter {
    pub fn new(documents_path: impl Into<PathBuf>, fill_path: impl Into<PathBuf>) -> Self {
        Self {
            documents_path: documents_path.into(),
            fill_path: fill_path.into(),
        }
    }

    fn read_json<T: serde::de::DeserializeOwned + Default>(
        path: &PathBuf,
    ) -> Result<T, FormDocError> {
        if !path.exists() {
            return Ok(T::default());
        }
        let text = fs::read_to_string(path).map_err(|e| FormDocError::Persistence(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| FormDocError::Persistence(e.to_string()))
    }

    fn write_json<T: serde::Serialize>(path: &PathBuf, value: &T) -> Result<(), FormDocError> {
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| FormDocError::Persistence(e.to_string()))?;
        fs::write(path, text).map_err(|e| FormDocError::Persistence(e.to_string()))
    }
}

impl PersistenceAdapter for JsonFileAdapter {
    fn get_documents(&self) -> Result<Vec<Document>, FormDocError> {
        let collection: DocumentCollection = Self::read_json(&self.documents_path)?;
        Ok(collection.documents)
    }

    fn save_documents(&mut self, documents: &[Document]) -> Result<(), FormDocError> {
        let collection = DocumentCollection {
            documents: documents.to_vec(),
        };
        Self::write_json(&self.documents_path, &collection)
    }

    fn get_user_field_data(&self) -> Result<FillData, FormDocError> {
        Self::read_json(&self.fill_path)
    }

    fn save_user_field_data(&mut self, data: &FillData) -> Result<(), FormDocError> {
        Self::write_json(&self.fill_path, data)
    }
}

/// Documents, fill records and source buffers behind one facade with a
/// cascading delete and an observable event stream.
pub struct DocumentStore<A: PersistenceAdapter> {
    adapter: A,
    documents: Vec<Document>,
    fill: FillStore,
    registry: SourceBufferRegistry,
    events: Vec<DocumentEvent>,
}

impl<A: PersistenceAdapter> DocumentStore<A> {
    pub fn open(adapter: A) -> Result<Self, FormDocError> {
        let documents = adapter.get_documents()?;
        let fill = FillStore::from_data(adapter.get_user_field_data()?);
        Ok(Self {
            adapter,
            documents,
            fill,
            registry: SourceBufferRegistry::new(),
            events: Vec::new(),
        })
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn document_mut(&mut self, id: &str) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.id == id)
    }

    pub fn fill(&self) -> &FillStore {
        &self.fill
    }

    pub fn fill_mut(&mut self) -> &mut FillStore {
        &mut self.fill
    }

    pub fn source_buffer(&self, document_id: &str) -> Option<&[u8]> {
        self.registry.get(document_id)
    }

    /// Private copy of the source buffer for consuming readers
    pub fn source_copy(&self, document_id: &str) -> Option<Vec<u8>> {
        self.registry.copy_of(document_id)
    }

    pub fn add_document(
        &mut self,
        document: Document,
        source_pdf: Option<Vec<u8>>,
    ) -> Result<(), FormDocError> {
        document.validate()?;
        if let Some(bytes) = source_pdf {
            self.registry.set(&document.id, bytes);
        }
        self.documents.push(document.clone());
        self.adapter.add_document(document)
    }

    pub fn update_document(&mut self, document: Document) -> Result<(), FormDocError> {
        document.validate()?;
        match self.documents.iter_mut().find(|d| d.id == document.id) {
            Some(slot) => *slot = document.clone(),
            None => self.documents.push(document.clone()),
        }
        self.adapter.update_document(document)
    }

    /// Delete a document and cascade: fill records removed, source buffer
    /// invalidated, `DocumentDeleted` emitted.
    pub fn delete_document(&mut self, id: &str) -> Result<bool, FormDocError> {
        let before = self.documents.len();
        self.documents.retain(|d| d.id != id);
        if self.documents.len() == before {
            return Ok(false);
        }
        let removed_records = self.fill.remove_document(id);
        self.registry.remove(id);
        debug!(document_id = id, removed_records, "document deleted");
        self.events.push(DocumentEvent::DocumentDeleted {
            document_id: id.to_string(),
        });
        self.adapter.delete_document(id)?;
        self.adapter.save_user_field_data(self.fill.data())?;
        Ok(true)
    }

    /// Drop a new field on a page, emitting `FieldAdded`. Returns the new
    /// field's id.
    pub fn add_field(
        &mut self,
        document_id: &str,
        page_number: u32,
        kind: FieldKind,
        x: f64,
        y: f64,
    ) -> Result<String, FormDocError> {
        let document = self
            .document_mut(document_id)
            .ok_or_else(|| FormDocError::FieldNotFound(document_id.to_string()))?;
        let mut editor = FieldEditor::new(document);
        let field = editor.add_field(page_number, kind, x, y)?;
        let field_id = field.id.clone();
        let field_type = field.kind.id_prefix().to_string();
        self.events.push(DocumentEvent::FieldAdded {
            field_id: field_id.clone(),
            field_type,
            page: page_number,
        });
        Ok(field_id)
    }

    /// Move a field, emitting `FieldMoved` with the clamped coordinates
    pub fn move_field(&mut self, document_id: &str, field_id: &str, x: f64, y: f64) -> bool {
        let Some(document) = self.document_mut(document_id) else {
            return false;
        };
        if !FieldEditor::new(document).move_field(field_id, x, y) {
            return false;
        }
        let (new_x, new_y) = self
            .document(document_id)
            .and_then(|d| d.field(field_id))
            .map(|f| (f.x, f.y))
            .unwrap_or((x, y));
        self.events.push(DocumentEvent::FieldMoved {
            field_id: field_id.to_string(),
            new_x,
            new_y,
        });
        true
    }

    /// Remove a field, emitting `FieldDeleted` when something was removed
    pub fn delete_field(&mut self, document_id: &str, field_id: &str) -> bool {
        let Some(document) = self.document_mut(document_id) else {
            return false;
        };
        if !FieldEditor::new(document).delete_field(field_id) {
            return false;
        }
        self.events.push(DocumentEvent::FieldDeleted {
            field_id: field_id.to_string(),
        });
        true
    }

    /// Append a blank page, emitting `PageAdded` with its number
    pub fn add_blank_page(
        &mut self,
        document_id: &str,
        width: u32,
        height: u32,
    ) -> Result<u32, FormDocError> {
        let document = self
            .document_mut(document_id)
            .ok_or_else(|| FormDocError::FieldNotFound(document_id.to_string()))?;
        let mut editor = FieldEditor::new(document);
        let number = editor.add_blank_page(width, height)?.number;
        self.events.push(DocumentEvent::PageAdded { page: number });
        Ok(number)
    }

    /// Fill record for one user, empty after a cascade delete
    pub fn get_user_data(&self, document_id: &str, user_id: &str) -> Option<&UserFieldRecord> {
        self.fill.record(document_id, user_id)
    }

    pub fn submit(&mut self, document_id: &str, user_id: &str) -> Result<(), FormDocError> {
        let document = self
            .document(document_id)
            .ok_or_else(|| FormDocError::FieldNotFound(document_id.to_string()))?
            .clone();
        self.fill.submit(&document, user_id)?;
        self.events.push(DocumentEvent::Submitted {
            user_id: user_id.to_string(),
        });
        self.adapter.save_user_field_data(self.fill.data())
    }

    pub fn decide(
        &mut self,
        document_id: &str,
        approver_id: &str,
        applicant_id: &str,
        decision: Decision,
        remarks: &str,
    ) -> Result<(), FormDocError> {
        let document = self
            .document(document_id)
            .ok_or_else(|| FormDocError::FieldNotFound(document_id.to_string()))?
            .clone();
        self.fill
            .decide(&document, approver_id, applicant_id, decision, remarks)?;
        self.events.push(DocumentEvent::Decided {
            user_id: applicant_id.to_string(),
            approver: approver_id.to_string(),
            approved: decision == Decision::Approved,
        });
        self.adapter.save_user_field_data(self.fill.data())
    }

    /// Persist documents and fill data in one go
    pub fn persist(&mut self) -> Result<(), FormDocError> {
        self.adapter.save_documents(&self.documents)?;
        self.adapter.save_user_field_data(self.fill.data())
    }

    pub fn drain_events(&mut self) -> Vec<DocumentEvent> {
        std::mem::take(&mut self.events)
    }
}
