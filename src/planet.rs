//! # Aggregation
//!
//! Downloads every subscribed feed, turns their entries into [`Post`]s and
//! merges them into one [`Planet`]:
//!
//! 1. feeds are fetched concurrently, a broken feed is logged and skipped
//! 2. entries without a usable date are dropped
//! 3. posts older than the configured window are dropped
//! 4. posts are sorted newest first, ties keep the configuration order
//! 5. posts sharing a link are collapsed to the newest one

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Url;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error_chain;
use crate::feeds::{
    parse_feed, FeedKind, FetchError, Fetcher, ParseError, ParsedFeed, RawEntry,
};
use crate::models::{Planet, Post, Subscription};
use crate::time::{parse_feed_date, DateError};
use crate::VERSION;

/// Why a whole feed was left out of the run.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Why a single entry was left out.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("Entry {title:?} has no date")]
    MissingDate { title: String },
    #[error("Entry {title:?} has an unusable date")]
    BadDate {
        title: String,
        #[source]
        source: DateError,
    },
}

/// Fetches, parses and merges every feed of `config`. Never fails: feeds that
/// can't be used are reported and skipped.
pub async fn aggregate(
    config: &Config,
    fetcher: &Fetcher,
    now: DateTime<Utc>,
) -> Planet {
    let sources = fetch_all(config, fetcher).await;
    let posts = collect_posts(sources, now, config.max_age());

    info!(
        feeds = config.feeds.len(),
        posts = posts.len(),
        "Aggregated {}",
        config.name
    );

    Planet {
        name: config.name.clone(),
        description: config.description.clone(),
        url: config.base_url().to_owned(),
        version: VERSION.to_owned(),
        generated_at: now,
        feeds: config.feeds.clone(),
        posts,
    }
}

/// Results come back in configuration order whatever order the downloads
/// finish in.
async fn fetch_all<'c>(
    config: &'c Config,
    fetcher: &Fetcher,
) -> Vec<(&'c Subscription, ParsedFeed)> {
    stream::iter(&config.feeds)
        .map(|sub| async move { (sub, fetch_one(fetcher, sub).await) })
        .buffered(config.http.concurrency)
        .filter_map(|(sub, result)| async move {
            match result {
                Ok(feed) => Some((sub, feed)),
                Err(e) => {
                    warn!(feed = %sub.name, url = %sub.url, "Skipping feed: {}", error_chain(&e));
                    None
                }
            }
        })
        .collect()
        .await
}

async fn fetch_one(
    fetcher: &Fetcher,
    sub: &Subscription,
) -> Result<ParsedFeed, FeedError> {
    let body = fetcher.fetch(&sub.url).await?;
    let feed = parse_feed(&body)?;

    if feed.kind == FeedKind::Unknown {
        warn!(feed = %sub.name, url = %sub.url, "Not an RSS or Atom document");
    } else {
        info!(
            feed = %sub.name,
            kind = ?feed.kind,
            entries = feed.entries.len(),
            "Parsed feed"
        );
    }

    Ok(feed)
}

/// Merges parsed feeds into the list of posts to publish, newest first.
pub fn collect_posts<'a, I>(
    sources: I,
    now: DateTime<Utc>,
    max_age: Option<Duration>,
) -> Vec<Post>
where
    I: IntoIterator<Item = (&'a Subscription, ParsedFeed)>,
{
    let mut posts = Vec::new();

    for (sub, feed) in sources {
        let feed_name = feed
            .title
            .clone()
            .unwrap_or_else(|| sub.name.clone());

        for entry in feed.entries {
            let post = match into_post(entry, sub, &feed_name) {
                Ok(post) => post,
                Err(e) => {
                    warn!(feed = %sub.name, "Dropping entry: {}", error_chain(&e));
                    continue;
                }
            };

            match max_age {
                Some(age) if now - post.date >= age => {
                    debug!(feed = %sub.name, title = %post.title, "Too old, skipped");
                }
                _ => posts.push(post),
            }
        }
    }

    // `sort_by` is stable, equal dates keep feed order.
    posts.sort_by(|a, b| b.date.cmp(&a.date));
    dedup_links(&mut posts);
    posts
}

fn into_post(
    entry: RawEntry,
    sub: &Subscription,
    feed_name: &str,
) -> Result<Post, EntryError> {
    let title = entry.title.unwrap_or_default();
    let date = match entry.date.as_deref() {
        None => return Err(EntryError::MissingDate { title }),
        Some(raw) => match parse_feed_date(raw) {
            Ok(date) => date,
            Err(source) => return Err(EntryError::BadDate { title, source }),
        },
    };

    Ok(Post {
        source: sub.name.clone(),
        feed_name: feed_name.to_owned(),
        title,
        link: entry
            .link
            .map(|link| resolve(&sub.url, &link))
            .unwrap_or_default(),
        permalink: entry.permalink.map(|link| resolve(&sub.url, &link)),
        author: entry.author,
        description: entry.content.or(entry.summary).unwrap_or_default(),
        date,
        tags: entry.tags,
    })
}

/// Makes relative links absolute against the feed URL.
fn resolve(base: &str, link: &str) -> String {
    if Url::parse(link).is_ok() {
        return link.to_owned();
    }
    Url::parse(base)
        .and_then(|base| base.join(link))
        .map(String::from)
        .unwrap_or_else(|_| link.to_owned())
}

fn dedup_links(posts: &mut Vec<Post>) {
    let mut seen = HashSet::new();
    posts.retain(|post| {
        let keep = post.link.is_empty() || seen.insert(post.link.clone());
        if !keep {
            debug!(link = %post.link, source = %post.source, "Duplicate post dropped");
        }
        keep
    });
}
