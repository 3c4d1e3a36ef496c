//! Loading and saving the document metadata file.

use std::path::{Path, PathBuf};

use crate::document::DocumentModel;
use crate::error::StoreError;

pub trait DocumentStore: Send + Sync {
    fn load(&self) -> Result<DocumentModel, StoreError>;
    fn save(&self, doc: &DocumentModel) -> Result<(), StoreError>;
}

/// A document stored as one JSON file.
#[derive(Debug, Clone)]
pub struct JsonDocumentStore {
    path: PathBuf,
}

impl JsonDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for JsonDocumentStore {
    fn load(&self) -> Result<DocumentModel, StoreError> {
        if !self.path.is_file() {
            return Err(StoreError::NotFound {
                path: self.path.clone(),
            });
        }
        let data = std::fs::read(&self.path)?;
        serde_json::from_slice(&data).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes a sibling temp file first and renames it over the target.
    fn save(&self, doc: &DocumentModel) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(doc)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
