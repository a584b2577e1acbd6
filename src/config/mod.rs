//! Configuration module for Forum-Harvest
//!
//! Two kinds of configuration live here:
//! - `Settings`: per-run tunables read from the environment
//! - `ConfigManager`: the category list, loaded from a JSON document with
//!   bundled and built-in fallbacks
//!
//! # Example
//!
//! ```no_run
//! use forum_harvest::config::{ConfigManager, Settings};
//!
//! let settings = Settings::from_env().unwrap();
//! let mut config = ConfigManager::new(&settings.config_dir);
//! for category in config.load_categories() {
//!     println!("{} -> {}", category.id, category.base_url);
//! }
//! ```

mod defaults;
mod manager;
mod settings;
mod types;
mod validation;

// Re-export types
pub use types::{Category, CategoryUpdate};

pub use defaults::{built_in_categories, fix_stale_host, CANONICAL_HOST, STALE_HOST};
pub use manager::{bundled_categories_path, ConfigManager, ConfigSource, CATEGORIES_FILE};
pub use settings::{Settings, DEFAULT_SITE_ROOT};
pub use validation::{validate_categories, validate_category};
