//! JSON-file backed category stores

use crate::storage::{write_atomic, Topic};
use crate::{StoreError, StoreResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// File in the data directory that is not a category store
const RESULTS_FILE: &str = "results.json";

/// Durable per-category topic stores
#[derive(Debug, Clone)]
pub struct CategoryManager {
    data_dir: PathBuf,
}

impl CategoryManager {
    /// Creates a manager rooted at `data_dir`; the directory is created lazily
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Path of the store document for a category
    pub fn store_path(&self, category_id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", category_id))
    }

    fn io_error(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Makes sure the store document exists, creating an empty one if needed
    fn ensure_store_file(&self, category_id: &str) -> StoreResult<PathBuf> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| Self::io_error(&self.data_dir, e))?;

        let path = self.store_path(category_id);
        if !path.exists() {
            write_atomic(&path, b"[]").map_err(|e| Self::io_error(&path, e))?;
            tracing::info!("Created empty store {}", path.display());
        }

        Ok(path)
    }

    fn read_store(&self, category_id: &str) -> StoreResult<Vec<Topic>> {
        let path = self.ensure_store_file(category_id)?;
        let raw = std::fs::read_to_string(&path).map_err(|e| Self::io_error(&path, e))?;
        let raw = raw.trim_start_matches('\u{feff}');

        serde_json::from_str(raw).map_err(|source| StoreError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads the stored topics of a category
    ///
    /// A missing store is created empty. An unreadable or unparseable store is
    /// logged and treated as empty; this never fails.
    pub fn load_category_data(&self, category_id: &str) -> Vec<Topic> {
        match self.read_store(category_id) {
            Ok(topics) => {
                tracing::info!("{} existing topics in {}.json", topics.len(), category_id);
                topics
            }
            Err(e) => {
                tracing::warn!("Starting {} from an empty store: {}", category_id, e);
                Vec::new()
            }
        }
    }

    /// Merges `existing` and `incoming`, then rewrites the whole store
    ///
    /// The first record seen for a topic id wins and the result is sorted by
    /// discovery time, newest first. Returns the merged list as written.
    pub fn save_category_data(
        &self,
        category_id: &str,
        existing: &[Topic],
        incoming: &[Topic],
    ) -> StoreResult<Vec<Topic>> {
        let path = self.ensure_store_file(category_id)?;
        let merged = merge_topics(existing, incoming);

        let json = serde_json::to_string_pretty(&merged)?;
        write_atomic(&path, json.as_bytes()).map_err(|e| Self::io_error(&path, e))?;

        tracing::info!("Saved {} topics to {}.json", merged.len(), category_id);
        Ok(merged)
    }

    /// Category ids that currently have a store document, sorted
    pub fn list_store_files(&self) -> StoreResult<Vec<String>> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| Self::io_error(&self.data_dir, e))?;

        let entries =
            std::fs::read_dir(&self.data_dir).map_err(|e| Self::io_error(&self.data_dir, e))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Self::io_error(&self.data_dir, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name == RESULTS_FILE {
                continue;
            }
            if let Some(id) = name.strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }

        ids.sort();
        Ok(ids)
    }
}

/// Deduplicates by topic id (first seen wins) and sorts newest first
pub fn merge_topics(existing: &[Topic], incoming: &[Topic]) -> Vec<Topic> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Topic> = existing
        .iter()
        .chain(incoming)
        .filter(|topic| !topic.topic_id().is_empty() && seen.insert(topic.topic_id().to_string()))
        .cloned()
        .collect();

    merged.sort_by(|a, b| b.stub.scraped_at.cmp(&a.stub.scraped_at));
    merged
}
