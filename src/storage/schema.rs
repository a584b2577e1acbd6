//! Store record schema
//!
//! A store file `<category>.json` is a JSON array of topic records:
//!
//! ```json
//! {
//!   "id": "topic_6543210",
//!   "topicId": "6543210",
//!   "title": "Final Fantasy X",
//!   "url": "https://rutracker.org/forum/viewtopic.php?t=6543210",
//!   "category": "ps2",
//!   "scrapedAt": "2024-05-01T12:00:00.000Z",
//!   "cover": "https://i.fastpic.org/big/2024/0501/aa/cover.jpg",
//!   "magnet": "magnet:?xt=urn:btih:...",
//!   "size": "4.37 GB"
//! }
//! ```
//!
//! Records whose enrichment failed carry only the stub fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Size value stored when no size token was found
pub const UNKNOWN_SIZE: &str = "N/A";

/// A topic discovered on a listing page, before enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicStub {
    /// Record id, `topic_<topicId>`
    pub id: String,

    /// Numeric topic id taken from the listing link
    pub topic_id: String,

    /// Cleaned title
    pub title: String,

    /// Absolute detail page URL
    pub url: String,

    /// Owning category id
    pub category: String,

    /// When the topic was first seen
    #[serde(with = "timestamp")]
    pub scraped_at: DateTime<Utc>,
}

impl TopicStub {
    pub fn new(
        topic_id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        category: impl Into<String>,
        scraped_at: DateTime<Utc>,
    ) -> Self {
        let topic_id = topic_id.into();
        Self {
            id: format!("topic_{}", topic_id),
            topic_id,
            title: title.into(),
            url: url.into(),
            category: category.into(),
            scraped_at,
        }
    }
}

/// Data taken from a topic's detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDetails {
    pub cover: Option<String>,
    pub magnet: Option<String>,
    pub size: String,
}

impl Default for TopicDetails {
    fn default() -> Self {
        Self {
            cover: None,
            magnet: None,
            size: UNKNOWN_SIZE.to_string(),
        }
    }
}

/// A persisted store record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(flatten)]
    pub stub: TopicStub,

    /// `None` when enrichment failed; the record is then stored as its stub
    #[serde(flatten)]
    pub details: Option<TopicDetails>,
}

impl Topic {
    /// Wraps a stub whose detail page could not be processed
    pub fn unenriched(stub: TopicStub) -> Self {
        Self {
            stub,
            details: None,
        }
    }

    pub fn enriched(stub: TopicStub, details: TopicDetails) -> Self {
        Self {
            stub,
            details: Some(details),
        }
    }

    pub fn topic_id(&self) -> &str {
        &self.stub.topic_id
    }

    pub fn is_enriched(&self) -> bool {
        self.details.is_some()
    }

    pub fn cover(&self) -> Option<&str> {
        self.details.as_ref().and_then(|d| d.cover.as_deref())
    }

    pub fn magnet(&self) -> Option<&str> {
        self.details.as_ref().and_then(|d| d.magnet.as_deref())
    }

    pub fn size(&self) -> Option<&str> {
        self.details.as_ref().map(|d| d.size.as_str())
    }
}

impl From<TopicStub> for Topic {
    fn from(stub: TopicStub) -> Self {
        Self::unenriched(stub)
    }
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix
mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
