use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One aggregated item, ready to be rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Name of the [`crate::models::Subscription`] the post came from.
    pub source: String,
    /// Title the feed gives itself, falls back to `source`.
    pub feed_name: String,
    pub title: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Full content when the feed has it, summary otherwise. HTML.
    pub description: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}
