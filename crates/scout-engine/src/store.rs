//! Durable selector book storage.
//!
//! Load once at run start, merge findings once at run end, persist
//! atomically (temp file + rename). A persist failure is fatal to the
//! run — the findings would be lost — but it never invalidates browser
//! state already advanced.

use scout_common::SelectorBook;
use scout_common::book::BookError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("selector book not found at {0}")]
    ConfigMissing(PathBuf),
    #[error("failed to read selector book: {0}")]
    Io(#[from] std::io::Error),
    #[error("selector book is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Shape(#[from] BookError),
}

pub struct SelectorStore {
    path: PathBuf,
}

impl SelectorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the book. `ConfigMissing` when no record exists yet; the
    /// caller falls back to an empty book rather than aborting.
    pub async fn load(&self) -> Result<SelectorBook, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::ConfigMissing(self.path.clone()));
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        Ok(SelectorBook::from_value(value)?)
    }

    /// Atomic overwrite: write a sibling temp file, then rename over
    /// the target.
    pub async fn persist(&self, book: &SelectorBook) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&book.to_value())?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "selector book persisted");
        Ok(())
    }
}
