//! Category config loading with a tiered fallback chain
//!
//! Sources, in order:
//! 1. `<config_dir>/categories.json` (writable override)
//! 2. the bundled `config/categories.json`
//! 3. the built-in list
//!
//! A source that is missing, unreadable, unparseable or without a single
//! valid entry is skipped. Invalid entries inside a usable source are dropped
//! with a warning.

use crate::config::defaults::{built_in_categories, fix_stale_host};
use crate::config::types::{Category, CategoryDocument, CategoryDocumentRef, CategoryUpdate};
use crate::config::validation::{retain_valid_categories, validate_categories, validate_category};
use crate::storage::write_atomic;
use crate::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};

/// File name of the category document inside a config directory
pub const CATEGORIES_FILE: &str = "categories.json";

/// Location of the category document shipped with the crate
pub fn bundled_categories_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("config")
        .join(CATEGORIES_FILE)
}

/// Which tier a category list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    Override,
    Bundled,
    BuiltIn,
}

/// Loads, repairs and persists category definitions
#[derive(Debug, Clone)]
pub struct ConfigManager {
    categories_path: PathBuf,
    bundled_path: PathBuf,
    categories: Vec<Category>,
    source: Option<ConfigSource>,
}

impl ConfigManager {
    /// Creates a manager whose writable override lives in `config_dir`
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            categories_path: config_dir.as_ref().join(CATEGORIES_FILE),
            bundled_path: bundled_categories_path(),
            categories: Vec::new(),
            source: None,
        }
    }

    /// Replaces the bundled default document location
    pub fn with_bundled_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.bundled_path = path.into();
        self
    }

    pub fn categories_path(&self) -> &Path {
        &self.categories_path
    }

    /// Tier the current list was loaded from, if loaded
    pub fn source(&self) -> Option<ConfigSource> {
        self.source
    }

    /// Loads the category list and returns the enabled entries in config order
    ///
    /// Never fails: the built-in list is the last resort. Invalid entries of a
    /// parseable document are skipped, not the whole document. Stale hosts are
    /// rewritten and the corrected list is written to the override file, as is
    /// a bundled list when no override file exists yet. An existing override
    /// file is never replaced by another tier's list.
    pub fn load_categories(&mut self) -> Vec<Category> {
        let override_exists = self.categories_path.exists();

        let (mut categories, dropped, source) = match read_document(&self.categories_path) {
            Ok((list, dropped)) => (list, dropped, ConfigSource::Override),
            Err(e) => {
                tracing::warn!(
                    "Override config {} unavailable: {}",
                    self.categories_path.display(),
                    e
                );
                match read_document(&self.bundled_path) {
                    Ok((list, dropped)) => (list, dropped, ConfigSource::Bundled),
                    Err(e) => {
                        tracing::warn!(
                            "Bundled config {} unavailable: {}",
                            self.bundled_path.display(),
                            e
                        );
                        (built_in_categories(), 0, ConfigSource::BuiltIn)
                    }
                }
            }
        };

        let repaired = repair_stale_hosts(&mut categories);
        let persist = match source {
            ConfigSource::Override if repaired > 0 && dropped > 0 => {
                tracing::warn!(
                    "Not rewriting {}: it has {} skipped entries",
                    self.categories_path.display(),
                    dropped
                );
                false
            }
            ConfigSource::Override => repaired > 0,
            _ if override_exists => {
                tracing::warn!(
                    "Leaving rejected override {} untouched",
                    self.categories_path.display()
                );
                false
            }
            ConfigSource::Bundled => true,
            ConfigSource::BuiltIn => repaired > 0,
        };

        if persist {
            if let Err(e) = self.save_categories(&categories) {
                tracing::warn!("Could not persist category config: {}", e);
            }
        }

        self.categories = categories;
        self.source = Some(source);

        let enabled = self.enabled_categories();
        tracing::info!("{} enabled categories loaded ({:?})", enabled.len(), source);
        enabled
    }

    /// Atomically rewrites the override file and reloads the in-memory list
    pub fn save_categories(&mut self, categories: &[Category]) -> ConfigResult<()> {
        validate_categories(categories)?;

        self.write_document(categories)?;
        self.categories = categories.to_vec();
        Ok(())
    }

    fn write_document(&self, categories: &[Category]) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(&CategoryDocumentRef { categories })?;
        write_atomic(&self.categories_path, json.as_bytes())?;
        tracing::info!("Categories saved to {}", self.categories_path.display());
        Ok(())
    }

    /// Merges `update` into the category with `id`, saves and reloads
    ///
    /// Other entries are written back exactly as read, including ones the
    /// loader skips. Returns `Ok(false)` when no category has that id.
    pub fn update_category(&mut self, id: &str, update: &CategoryUpdate) -> ConfigResult<bool> {
        let mut categories = parse_document(&self.categories_path)
            .or_else(|_| parse_document(&self.bundled_path))
            .unwrap_or_else(|_| built_in_categories());

        let Some(category) = categories.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };

        update.apply(category);
        validate_category(category)?;

        self.write_document(&categories)?;
        self.load_categories();
        Ok(true)
    }

    /// Looks up an enabled category by id
    pub fn category_by_id(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.enabled && c.id == id)
    }

    pub fn enabled_categories(&self) -> Vec<Category> {
        self.categories.iter().filter(|c| c.enabled).cloned().collect()
    }

    /// Every loaded category, enabled or not
    pub fn all_categories(&self) -> &[Category] {
        &self.categories
    }
}

/// Reads and parses one category document without validating entries
fn parse_document(path: &Path) -> ConfigResult<Vec<Category>> {
    let raw = std::fs::read_to_string(path)?;
    let document: CategoryDocument = serde_json::from_str(raw.trim_start_matches('\u{feff}'))?;
    Ok(document.into_categories())
}

/// Parses a document and keeps its valid entries
///
/// Returns the kept entries and the number skipped. A document with no
/// valid entry is an error.
fn read_document(path: &Path) -> ConfigResult<(Vec<Category>, usize)> {
    let (categories, dropped) = retain_valid_categories(parse_document(path)?);
    if categories.is_empty() {
        return Err(ConfigError::Validation(format!(
            "no valid categories in {}",
            path.display()
        )));
    }
    Ok((categories, dropped))
}

/// Rewrites stale hosts in place; returns how many entries changed
fn repair_stale_hosts(categories: &mut [Category]) -> usize {
    let mut repaired = 0;
    for category in categories.iter_mut() {
        if let Some(fixed) = fix_stale_host(&category.base_url) {
            tracing::warn!("Stale host in {}, rewriting to {}", category.name, fixed);
            category.base_url = fixed;
            repaired += 1;
        }
    }
    repaired
}
