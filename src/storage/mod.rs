//! Storage module for persisting harvested topics
//!
//! Each category owns one JSON document `<data_dir>/<category>.json`. Saves
//! always rewrite the full document, so callers persist after every page to
//! keep crash loss down to one batch.

mod json_store;
mod schema;

pub use json_store::{merge_topics, CategoryManager};
pub use schema::{Topic, TopicDetails, TopicStub, UNKNOWN_SIZE};

use std::io::Write;
use std::path::Path;

/// Writes `contents` to `path` through a sibling temp file and a rename
///
/// Readers never observe a half-written file.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }

    std::fs::rename(&tmp_path, path)
}
