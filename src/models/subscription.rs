use serde::{Deserialize, Serialize};

/// A subscribed feed, as listed in the `[[feed]]` tables of the config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Subscription {
    /// Display name of the author or site.
    pub name: String,
    /// Where the feed document is downloaded from.
    pub url: String,
    /// The site the feed belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
}

impl Subscription {
    /// Returns the [`Subscription`]'s home page, or the feed URL when no home
    /// page was configured.
    pub fn home_or_url(&self) -> &str {
        match self.home.as_deref() {
            Some(home) if !home.trim().is_empty() => home,
            _ => &self.url,
        }
    }
}
