//! # Feed acquisition
//!
//! Downloading subscribed feeds and turning the XML into entries.

pub mod fetch;
pub mod parse;

pub use fetch::{FetchError, Fetcher};
pub use parse::{parse_feed, FeedKind, ParseError, ParsedFeed, RawEntry};
