//! Directory-backed document store
//!
//! ```text
//! <root>/project.json          project, classes and the document listing
//! <root>/documents/<id>.json   one document each
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use spantag_core::model::DocumentSummary;
use spantag_core::{Document, DocumentId, DocumentStore, DocumentUpdate, Project, ProjectId, StoreError};

const MANIFEST: &str = "project.json";
const DOCUMENTS: &str = "documents";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    #[serde(flatten)]
    project: Project,
    /// Listing in import order; served without opening document files
    #[serde(default)]
    documents: Vec<DocumentSummary>,
}

#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    manifest: Manifest,
}

impl FileStore {
    /// Create a new project directory; fails if one already exists there.
    pub fn init(root: impl Into<PathBuf>, project: Project) -> Result<Self, StoreError> {
        let root = root.into();
        if root.join(MANIFEST).exists() {
            return Err(StoreError::Rejected(format!(
                "{} already holds a project",
                root.display()
            )));
        }
        fs::create_dir_all(root.join(DOCUMENTS))?;

        let store = Self {
            root,
            manifest: Manifest {
                project,
                documents: Vec::new(),
            },
        };
        store.write_manifest()?;
        info!(root = %store.root.display(), "initialized project");
        Ok(store)
    }

    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let manifest = read_json(&root.join(MANIFEST))?;
        Ok(Self { root, manifest })
    }

    pub fn project(&self) -> &Project {
        &self.manifest.project
    }

    pub fn document_ids(&self) -> Vec<DocumentId> {
        self.manifest.documents.iter().map(|doc| doc.id.clone()).collect()
    }

    /// Add a document at the end of the project's listing
    pub fn import(&mut self, name: Option<String>, text: String) -> Result<DocumentId, StoreError> {
        let id = DocumentId::generate();
        let mut document = Document::new(id.clone(), self.manifest.project.id.clone(), text);
        document.name = name;

        write_json(&self.document_path(&id), &document)?;
        self.manifest.documents.push(DocumentSummary::from(&document));
        self.write_manifest()?;
        debug!(document = %id, "imported document");
        Ok(id)
    }

    /// All documents of the project, in listing order
    pub fn documents(&self) -> Result<Vec<Document>, StoreError> {
        self.manifest
            .documents
            .iter()
            .map(|doc| self.get_document(&doc.id))
            .collect()
    }

    fn document_path(&self, id: &DocumentId) -> PathBuf {
        self.root.join(DOCUMENTS).join(format!("{id}.json"))
    }

    fn write_manifest(&self) -> Result<(), StoreError> {
        write_json(&self.root.join(MANIFEST), &self.manifest)
    }

    fn check_project(&self, id: &ProjectId) -> Result<(), StoreError> {
        if *id == self.manifest.project.id {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("project {id}")))
        }
    }
}

impl DocumentStore for FileStore {
    fn get_document(&self, id: &DocumentId) -> Result<Document, StoreError> {
        read_json(&self.document_path(id))
    }

    fn get_project(&self, id: &ProjectId) -> Result<Project, StoreError> {
        self.check_project(id)?;
        Ok(self.manifest.project.clone())
    }

    fn get_project_documents(&self, id: &ProjectId) -> Result<Vec<DocumentSummary>, StoreError> {
        self.check_project(id)?;
        Ok(self.manifest.documents.clone())
    }

    fn update_document(&self, id: &DocumentId, update: &DocumentUpdate) -> Result<(), StoreError> {
        let path = self.document_path(id);
        let mut document: Document = read_json(&path)?;
        document.apply(update);
        write_json(&path, &document)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound(path.display().to_string()),
        _ => StoreError::Io(err),
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Write through a sibling temp file so readers never see a partial document
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
