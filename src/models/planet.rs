use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Post, Subscription};

/// The merged result of one aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Planet {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub feeds: Vec<Subscription>,
    /// Newest first.
    pub posts: Vec<Post>,
}
