//! # Planet configuration
//!
//! A planet is described by a single TOML file:
//!
//! ```toml
//! name = "Planet Example"
//! description = "What the example people write"
//! url = "https://planet.example.org"
//! days = 7
//! date_format = "%F at %T"
//! language = "en"
//!
//! [http]
//! concurrency = 4
//!
//! [[feed]]
//! name = "Alice"
//! url = "https://alice.example.org/atom.xml"
//! home = "https://alice.example.org/"
//!
//! [[output]]
//! kind = "html"
//! path = "public/index.html"
//!
//! [[output]]
//! kind = "rss"
//! path = "public/index.rss"
//! template = "layout/rss.xml"
//! ```

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Subscription;
use crate::render::OutputKind;
use crate::time::{validate_format, DateError, DEFAULT_DATE_FORMAT};
use crate::VERSION;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Couldn't read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Syntax(#[from] toml::de::Error),
    #[error(transparent)]
    DateFormat(#[from] DateError),
    #[error("Feed {name:?} has an empty url")]
    EmptyFeedUrl { name: String },
    #[error("Output #{index} has an empty path")]
    EmptyOutputPath { index: usize },
    #[error("`days` must be positive, leave it out to keep every post")]
    ZeroDays,
    #[error("`http.concurrency` must be positive")]
    ZeroConcurrency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Public URL the outputs are published under, used for self links.
    pub url: String,
    /// Posts older than this many days are left out. No limit when unset.
    #[serde(default)]
    pub days: Option<u32>,
    /// strftime layout for dates in the HTML output.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Language advertised by the RSS channel and the HTML page.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default, rename = "feed")]
    pub feeds: Vec<Subscription>,
    #[serde(default, rename = "output")]
    pub outputs: Vec<Output>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_redirects: usize,
    /// How many feeds are downloaded at the same time.
    pub concurrency: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            connect_timeout_secs: 10,
            timeout_secs: 30,
            user_agent: format!("cplanet/{}", VERSION),
            max_redirects: 10,
            concurrency: 8,
        }
    }
}

/// One generated document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Output {
    #[serde(default)]
    pub kind: OutputKind,
    pub path: PathBuf,
    /// Template file used instead of the built-in one for `kind`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_owned()
}

fn default_language() -> String {
    "en".to_owned()
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::Read {
                path: path.to_owned(),
                source,
            }
        })?;
        Config::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_format(&self.date_format)?;

        if self.days == Some(0) {
            return Err(ConfigError::ZeroDays);
        }
        if self.http.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if let Some(feed) = self.feeds.iter().find(|f| f.url.trim().is_empty()) {
            return Err(ConfigError::EmptyFeedUrl {
                name: feed.name.clone(),
            });
        }
        if let Some(index) = self
            .outputs
            .iter()
            .position(|o| o.path.as_os_str().is_empty())
        {
            return Err(ConfigError::EmptyOutputPath { index });
        }

        Ok(())
    }

    /// Age limit for posts, `None` keeps everything.
    pub fn max_age(&self) -> Option<Duration> {
        self.days.map(|days| Duration::days(i64::from(days)))
    }

    /// The planet URL without its trailing slash, ready for joining paths.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        name = "Planet Example"
        description = "What the example people write"
        url = "https://planet.example.org/"
        days = 7

        [http]
        concurrency = 2

        [[feed]]
        name = "Alice"
        url = "https://alice.example.org/atom.xml"
        home = "https://alice.example.org/"

        [[feed]]
        name = "Bob"
        url = "https://bob.example.org/rss"

        [[output]]
        kind = "html"
        path = "public/index.html"

        [[output]]
        kind = "ATOM"
        path = "public/index.atom"
        template = "layout/atom.xml"
    "#;

    #[test]
    fn parses_sample_config() {
        let config = Config::from_toml(SAMPLE).unwrap();

        assert_eq!(config.name, "Planet Example");
        assert_eq!(config.base_url(), "https://planet.example.org");
        assert_eq!(config.max_age(), Some(Duration::days(7)));
        assert_eq!(config.date_format, DEFAULT_DATE_FORMAT);
        assert_eq!(config.language, "en");
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.feeds[0].home.as_deref(), Some("https://alice.example.org/"));
        assert_eq!(config.feeds[1].home, None);
        assert_eq!(config.outputs[0].kind, OutputKind::Html);
        assert_eq!(config.outputs[1].kind, OutputKind::Atom);
        assert_eq!(config.outputs[0].template, None);
        assert_eq!(
            config.outputs[1].template.as_deref(),
            Some(Path::new("layout/atom.xml"))
        );
    }

    #[test]
    fn http_defaults_fill_missing_keys() {
        let config = Config::from_toml(SAMPLE).unwrap();

        assert_eq!(config.http.concurrency, 2);
        assert_eq!(config.http.connect_timeout_secs, 10);
        assert_eq!(config.http.user_agent, format!("cplanet/{}", VERSION));
    }

    #[test]
    fn days_are_optional() {
        let config =
            Config::from_toml(r#"name = "P"
url = "https://p.example""#)
                .unwrap();

        assert_eq!(config.max_age(), None);
        assert!(config.feeds.is_empty());
        assert!(config.outputs.is_empty());
    }

    #[test]
    fn rejects_zero_days() {
        let err = Config::from_toml(
            r#"name = "P"
url = "https://p.example"
days = 0"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::ZeroDays));
    }

    #[test]
    fn rejects_invalid_date_format() {
        let err = Config::from_toml(
            r#"name = "P"
url = "https://p.example"
date_format = "%Q""#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::DateFormat(_)));
    }

    #[test]
    fn rejects_unknown_output_kind() {
        let err = Config::from_toml(
            r#"name = "P"
url = "https://p.example"

[[output]]
kind = "gopher"
path = "out.txt""#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::Syntax(_)));
    }

    #[test]
    fn rejects_empty_feed_url() {
        let err = Config::from_toml(
            r#"name = "P"
url = "https://p.example"

[[feed]]
name = "Nobody"
url = " ""#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::EmptyFeedUrl { name } if name == "Nobody"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(Path::new("/nonexistent/cplanet.toml")).unwrap_err();

        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
