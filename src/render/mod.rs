//! # Output documents
//!
//! Every configured output is rendered from its own [`RenderContext`]: the
//! same planet, with dates already formatted the way the output kind wants
//! them.
//!
//! | kind | post and generation dates |
//! |------|---------------------------|
//! | html | `date_format`, local time |
//! | rss  | RFC 822, UTC              |
//! | atom | `YYYY-MM-DDTHH:MM:SSZ`    |
//! | opml | RFC 822, UTC              |
//!
//! Outputs render with the templates built into the binary unless they name
//! a `template` file, see [`custom`].

pub mod custom;
mod templates;

use std::path::{Path, PathBuf};

use askama::Template;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::config::{Config, Output};
use crate::error_chain;
use crate::models::{Planet, Post};
use crate::time;

pub use templates::{AtomTemplate, IndexTemplate, OpmlTemplate, RssTemplate};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Couldn't render the {kind:?} template")]
    Template {
        kind: OutputKind,
        #[source]
        source: askama::Error,
    },
    #[error("Couldn't read template {}", path.display())]
    ReadTemplate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Couldn't render template {}", path.display())]
    Custom {
        path: PathBuf,
        #[source]
        source: tera::Error,
    },
    #[error("Couldn't write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    #[serde(alias = "HTML", alias = "Html")]
    Html,
    #[serde(alias = "RSS", alias = "Rss")]
    Rss,
    #[serde(alias = "ATOM", alias = "Atom")]
    Atom,
    #[serde(alias = "OPML", alias = "Opml")]
    Opml,
}

impl OutputKind {
    pub fn label(self) -> &'static str {
        match self {
            OutputKind::Html => "HTML",
            OutputKind::Rss => "RSS 2.0",
            OutputKind::Atom => "Atom 1.0",
            OutputKind::Opml => "OPML",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            OutputKind::Html => "text/html",
            OutputKind::Rss => "application/rss+xml",
            OutputKind::Atom => "application/atom+xml",
            OutputKind::Opml => "text/x-opml",
        }
    }

    /// Formats `date` for this kind of document. `date_format` is only used
    /// by HTML.
    pub fn format_date(self, date: &DateTime<Utc>, date_format: &str) -> String {
        match self {
            OutputKind::Html => time::local(date, date_format),
            OutputKind::Rss | OutputKind::Opml => time::rfc822(date),
            OutputKind::Atom => time::atom(date),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedView {
    pub name: String,
    pub home: String,
    pub url: String,
}

/// A post as the templates see it. Missing optional fields are empty strings.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub feed_name: String,
    pub title: String,
    pub link: String,
    /// Stable identifier: the link, else the permalink, else a `tag:` URI.
    pub id: String,
    pub permalink: String,
    pub author: String,
    pub description: String,
    pub date: String,
    pub tags: Vec<String>,
}

/// Link from one output to another one (e.g. the HTML page to the RSS feed).
#[derive(Debug, Clone, Serialize)]
pub struct Alternate {
    pub href: String,
    pub label: &'static str,
    pub mime: &'static str,
    /// RSS and Atom, advertised in the HTML `<head>`.
    pub syndication: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    pub name: String,
    pub description: String,
    pub url: String,
    pub language: String,
    pub version: String,
    /// Generation date, formatted for the output kind.
    pub generated: String,
    /// Absolute URL of the document being rendered.
    pub self_href: String,
    pub feeds: Vec<FeedView>,
    pub posts: Vec<PostView>,
    pub alternates: Vec<Alternate>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `tag:` URI for posts whose feed gave them no link at all.
fn entry_id(post: &Post, authority: &str) -> String {
    if !post.link.is_empty() {
        return post.link.clone();
    }
    if let Some(permalink) = post.permalink.as_deref().filter(|p| !p.is_empty()) {
        return permalink.to_owned();
    }

    let source: String = post
        .source
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!(
        "tag:{},{}:{}/{}",
        authority,
        post.date.format("%Y-%m-%d"),
        source,
        post.date.timestamp()
    )
}

/// Replaces `]]>` so the value can sit inside a CDATA section.
pub(crate) fn split_cdata(value: &str) -> String {
    value.replace("]]>", "]]]]><![CDATA[>")
}

impl RenderContext {
    /// Builds the context for `output`. Other outputs are linked by file
    /// name, they are expected to be published next to each other.
    pub fn new(planet: &Planet, config: &Config, output: &Output) -> Self {
        let kind = output.kind;
        let format_date =
            |date: &DateTime<Utc>| kind.format_date(date, &config.date_format);

        let feeds = planet
            .feeds
            .iter()
            .map(|feed| FeedView {
                name: feed.name.clone(),
                home: feed.home_or_url().to_owned(),
                url: feed.url.clone(),
            })
            .collect();

        let authority = Url::parse(&planet.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_owned))
            .unwrap_or_else(|| "cplanet".to_owned());

        let posts = planet
            .posts
            .iter()
            .map(|post| PostView {
                feed_name: post.feed_name.clone(),
                title: post.title.clone(),
                link: post.link.clone(),
                id: entry_id(post, &authority),
                permalink: post.permalink.clone().unwrap_or_default(),
                author: post.author.clone().unwrap_or_default(),
                description: post.description.clone(),
                date: format_date(&post.date),
                tags: post.tags.clone(),
            })
            .collect();

        let alternates = config
            .outputs
            .iter()
            .filter(|other| other.kind != OutputKind::Html && other.path != output.path)
            .map(|other| Alternate {
                href: file_name(&other.path),
                label: other.kind.label(),
                mime: other.kind.mime(),
                syndication: matches!(other.kind, OutputKind::Rss | OutputKind::Atom),
            })
            .collect();

        RenderContext {
            name: planet.name.clone(),
            description: planet.description.clone(),
            url: planet.url.clone(),
            language: config.language.clone(),
            version: planet.version.clone(),
            generated: format_date(&planet.generated_at),
            self_href: format!("{}/{}", planet.url, file_name(&output.path)),
            feeds,
            posts,
            alternates,
        }
    }
}

/// Renders one document of the given kind.
pub fn render(kind: OutputKind, context: &RenderContext) -> Result<String, RenderError> {
    let rendered = match kind {
        OutputKind::Html => IndexTemplate { planet: context }.render(),
        OutputKind::Rss => RssTemplate { planet: context }.render(),
        OutputKind::Atom => AtomTemplate { planet: context }.render(),
        OutputKind::Opml => OpmlTemplate { planet: context }.render(),
    };

    rendered.map_err(|source| RenderError::Template { kind, source })
}

/// Renders `output` with its own template file when it has one, with the
/// built-in template for its kind otherwise.
pub fn render_output(output: &Output, context: &RenderContext) -> Result<String, RenderError> {
    match &output.template {
        Some(template) => custom::render_file(template, context),
        None => render(output.kind, context),
    }
}

fn write_document(path: &Path, document: &str) -> Result<(), RenderError> {
    let write_error = |source| RenderError::Write {
        path: path.to_owned(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, document).map_err(write_error)
}

/// Renders and writes every configured output, returning the paths written.
///
/// An output whose template is missing or fails is reported and skipped;
/// failing to write to disk stops the run.
pub fn write_outputs(planet: &Planet, config: &Config) -> Result<Vec<PathBuf>, RenderError> {
    let mut written = Vec::with_capacity(config.outputs.len());

    for output in &config.outputs {
        let context = RenderContext::new(planet, config, output);
        let document = match render_output(output, &context) {
            Ok(document) => document,
            Err(e) => {
                error!(path = %output.path.display(), "{}", error_chain(&e));
                continue;
            }
        };

        write_document(&output.path, &document)?;
        info!(
            path = %output.path.display(),
            kind = ?output.kind,
            posts = planet.posts.len(),
            "Wrote output"
        );
        written.push(output.path.clone());
    }

    Ok(written)
}
