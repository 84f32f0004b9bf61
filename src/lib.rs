//! # cplanet
//!
//! Planet style feed aggregator: downloads a list of RSS and Atom feeds,
//! merges their recent posts and publishes the result as an HTML page, an RSS
//! 2.0 feed, an Atom 1.0 feed and an OPML subscription list.
//!
//! A run goes [`config::Config::load`] → [`planet::aggregate`] →
//! [`render::write_outputs`].

pub mod config;
pub mod feeds;
pub mod models;
pub mod planet;
pub mod render;
pub mod time;
pub mod tracing;

use thiserror::Error;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Fetch(#[from] feeds::FetchError),
    #[error(transparent)]
    Render(#[from] render::RenderError),
    #[error("Couldn't write to stdout")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Renders an error followed by all of its sources, `outer: inner: root`.
pub fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
