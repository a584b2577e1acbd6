use serde::{Deserialize, Serialize};

/// One crawlable listing section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Unique key, also the store file name
    pub id: String,

    /// Display name
    pub name: String,

    /// First listing page; later pages append `start=<offset>`
    pub base_url: String,

    /// Token a listing title must contain (e.g. `[PS2]`)
    pub title_search: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub priority: u32,
}

fn default_enabled() -> bool {
    true
}

/// Partial update for one category, merged field by field
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub title_search: Option<String>,
    pub enabled: Option<bool>,
    pub priority: Option<u32>,
}

impl CategoryUpdate {
    pub fn apply(&self, category: &mut Category) {
        if let Some(name) = &self.name {
            category.name = name.clone();
        }
        if let Some(base_url) = &self.base_url {
            category.base_url = base_url.clone();
        }
        if let Some(title_search) = &self.title_search {
            category.title_search = title_search.clone();
        }
        if let Some(enabled) = self.enabled {
            category.enabled = enabled;
        }
        if let Some(priority) = self.priority {
            category.priority = priority;
        }
    }
}

/// On-disk category document: a bare array or `{ "categories": [...] }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum CategoryDocument {
    Wrapped { categories: Vec<Category> },
    Bare(Vec<Category>),
}

impl CategoryDocument {
    pub(crate) fn into_categories(self) -> Vec<Category> {
        match self {
            Self::Wrapped { categories } => categories,
            Self::Bare(categories) => categories,
        }
    }
}

/// Shape written back to disk
#[derive(Debug, Serialize)]
pub(crate) struct CategoryDocumentRef<'a> {
    pub categories: &'a [Category],
}
