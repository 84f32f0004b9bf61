//! # Feed parsing
//!
//! A streaming pass over the feed document with `quick-xml`. Elements are
//! tracked by their path from the root (`/rss/channel/item/title`), the root
//! element tells which flavour of feed we are reading and the flavour decides
//! which paths carry which entry field.
//!
//! The document encoding announced in the XML declaration is honored, every
//! string coming out of here is UTF-8.
//!
//! Content fields (`content`, `summary`, `description`, `content:encoded`)
//! may hold markup instead of escaped text, e.g. Atom `type="xhtml"` or a
//! stray `<br/>` inside an RSS description. Child elements of those fields
//! are copied into the value as markup.

use std::sync::OnceLock;

use quick_xml::encoding::Decoder;
use quick_xml::escape::{escape, resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::{Captures, Regex};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },
    #[error("Undecodable text at byte {position}: {message}")]
    Encoding { position: u64, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Undetermined,
    /// RSS 0.9x and 2.0
    Rss,
    /// RSS 1.0
    Rdf,
    /// Atom 1.0
    Atom,
    Unknown,
}

/// Paths of the feed title and of the entry element for one [`FeedKind`].
struct Layout {
    title: &'static str,
    entry: &'static str,
}

impl FeedKind {
    /// The kind is decided by the first element of the document and never
    /// changes afterwards.
    pub fn next(self, element: &str) -> FeedKind {
        match (self, element) {
            (FeedKind::Undetermined, "rss") => FeedKind::Rss,
            (FeedKind::Undetermined, "rdf:RDF") => FeedKind::Rdf,
            (FeedKind::Undetermined, "feed") => FeedKind::Atom,
            (FeedKind::Undetermined, _) => FeedKind::Unknown,
            (kind, _) => kind,
        }
    }

    fn layout(self) -> Option<Layout> {
        match self {
            FeedKind::Rss => Some(Layout {
                title: "/rss/channel/title",
                entry: "/rss/channel/item",
            }),
            FeedKind::Rdf => Some(Layout {
                title: "/rdf:RDF/channel/title",
                entry: "/rdf:RDF/item",
            }),
            FeedKind::Atom => Some(Layout {
                title: "/feed/title",
                entry: "/feed/entry",
            }),
            FeedKind::Undetermined | FeedKind::Unknown => None,
        }
    }
}

/// An entry as found in the document, before any date handling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub permalink: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    /// Full content (`content`, `content:encoded`)
    pub content: Option<String>,
    /// Short form (`summary`, `description`)
    pub summary: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeed {
    pub kind: FeedKind,
    pub title: Option<String>,
    /// In document order.
    pub entries: Vec<RawEntry>,
}

struct FeedParser {
    kind: FeedKind,
    path: String,
    marks: Vec<usize>,
    text: String,
    guid_is_permalink: bool,
    /// Depth of child markup inside the current content field, `None`
    /// outside of one.
    markup_depth: Option<usize>,
    title: Option<String>,
    entries: Vec<RawEntry>,
}

fn entry_child<'p>(path: &'p str, entry: &str) -> Option<&'p str> {
    path.strip_prefix(entry)?.strip_prefix('/')
}

fn set_first(field: &mut Option<String>, value: &str) {
    if field.is_none() {
        *field = Some(value.to_owned());
    }
}

fn entity() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&[^\s&;]+;").expect("entity pattern is valid"))
}

/// Resolves XML and HTML entities one by one. Entities nobody knows are
/// kept verbatim.
fn unescape_lenient(raw: &str) -> String {
    entity()
        .replace_all(raw, |caps: &Captures| {
            let reference = &caps[0];
            match unescape_with(reference, resolve_html5_entity) {
                Ok(value) => value.into_owned(),
                Err(_) => reference.to_owned(),
            }
        })
        .into_owned()
}

fn attribute(decoder: Decoder, start: &BytesStart, key: &[u8]) -> Option<String> {
    let attr = start
        .attributes()
        .with_checks(false)
        .flatten()
        .find(|attr| attr.key.as_ref() == key)?;
    let raw = decoder.decode(&attr.value).ok()?;
    Some(unescape_lenient(&raw))
}

impl FeedParser {
    fn new() -> Self {
        FeedParser {
            kind: FeedKind::Undetermined,
            path: String::new(),
            marks: Vec::new(),
            text: String::new(),
            guid_is_permalink: true,
            markup_depth: None,
            title: None,
            entries: Vec::new(),
        }
    }

    fn open(&mut self, name: &str, start: &BytesStart, decoder: Decoder) {
        self.marks.push(self.path.len());
        self.path.push('/');
        self.path.push_str(name);
        self.text.clear();

        if self.kind == FeedKind::Undetermined {
            self.kind = self.kind.next(name);
            debug!("Detected {:?} feed from root <{}>", self.kind, name);
            return;
        }

        let Some(layout) = self.kind.layout() else {
            return;
        };

        if self.path == layout.entry {
            self.entries.push(RawEntry::default());
            return;
        }

        let Some(child) = entry_child(&self.path, layout.entry) else {
            return;
        };
        let Some(entry) = self.entries.last_mut() else {
            return;
        };

        match (self.kind, child) {
            (FeedKind::Atom, "link") => {
                let rel = attribute(decoder, start, b"rel");
                if matches!(rel.as_deref(), None | Some("alternate")) {
                    if let Some(href) = attribute(decoder, start, b"href") {
                        set_first(&mut entry.link, href.trim());
                    }
                }
            }
            (FeedKind::Atom, "category") => {
                if let Some(term) = attribute(decoder, start, b"term") {
                    let term = term.trim();
                    if !term.is_empty() {
                        entry.tags.push(term.to_owned());
                    }
                }
            }
            (FeedKind::Rss, "guid") => {
                self.guid_is_permalink = attribute(decoder, start, b"isPermaLink")
                    .map_or(true, |v| !v.trim().eq_ignore_ascii_case("false"));
            }
            (FeedKind::Atom, "content" | "summary")
            | (FeedKind::Rss | FeedKind::Rdf, "description" | "content:encoded") => {
                self.markup_depth = Some(0);
            }
            _ => {}
        }
    }

    fn in_markup(&self) -> bool {
        self.markup_depth.is_some()
    }

    /// True between a child start tag and its end tag inside a content field.
    fn in_nested_markup(&self) -> bool {
        matches!(self.markup_depth, Some(depth) if depth > 0)
    }

    /// `tag` is everything between `<` and `>`, attributes included.
    fn markup_open(&mut self, tag: &str) {
        self.text.push('<');
        self.text.push_str(tag);
        self.text.push('>');
        if let Some(depth) = self.markup_depth.as_mut() {
            *depth += 1;
        }
    }

    fn markup_empty(&mut self, tag: &str) {
        self.text.push('<');
        self.text.push_str(tag);
        self.text.push_str("/>");
    }

    fn markup_close(&mut self, name: &str) {
        self.text.push_str("</");
        self.text.push_str(name);
        self.text.push('>');
        if let Some(depth) = self.markup_depth.as_mut() {
            *depth = depth.saturating_sub(1);
        }
    }

    fn text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn close(&mut self) {
        self.markup_depth = None;
        let text = std::mem::take(&mut self.text);
        let value = text.trim();
        if !value.is_empty() {
            self.assign(value);
        }

        let mark = self.marks.pop().unwrap_or(0);
        self.path.truncate(mark);
    }

    fn assign(&mut self, value: &str) {
        let Some(layout) = self.kind.layout() else {
            return;
        };

        if self.path == layout.title {
            set_first(&mut self.title, value);
            return;
        }

        let Some(child) = entry_child(&self.path, layout.entry) else {
            return;
        };
        let Some(entry) = self.entries.last_mut() else {
            return;
        };

        // Preferred sources overwrite, fallbacks only fill the gaps.
        match (self.kind, child) {
            (_, "title") => set_first(&mut entry.title, value),
            (FeedKind::Rss | FeedKind::Rdf, "link") => {
                set_first(&mut entry.link, value)
            }
            (FeedKind::Atom, "author/name")
            | (FeedKind::Rss | FeedKind::Rdf, "dc:creator") => {
                entry.author = Some(value.to_owned())
            }
            (FeedKind::Rss, "author") => set_first(&mut entry.author, value),
            (FeedKind::Atom, "published") | (FeedKind::Rss, "pubDate") => {
                entry.date = Some(value.to_owned())
            }
            (FeedKind::Atom, "updated")
            | (FeedKind::Rss | FeedKind::Rdf, "dc:date") => {
                set_first(&mut entry.date, value)
            }
            (FeedKind::Atom, "content")
            | (FeedKind::Rss | FeedKind::Rdf, "content:encoded") => {
                set_first(&mut entry.content, value)
            }
            (FeedKind::Atom, "summary")
            | (FeedKind::Rss | FeedKind::Rdf, "description") => {
                set_first(&mut entry.summary, value)
            }
            (FeedKind::Rss, "category") | (FeedKind::Rdf, "dc:subject") => {
                entry.tags.push(value.to_owned())
            }
            (FeedKind::Rss, "guid") if self.guid_is_permalink => {
                set_first(&mut entry.permalink, value)
            }
            _ => {}
        }
    }

    fn finish(self) -> ParsedFeed {
        let kind = match self.kind {
            FeedKind::Undetermined => FeedKind::Unknown,
            kind => kind,
        };

        ParsedFeed {
            kind,
            title: self.title,
            entries: self.entries,
        }
    }
}

fn decode(
    decoder: Decoder,
    bytes: &[u8],
    position: u64,
) -> Result<String, ParseError> {
    decoder
        .decode(bytes)
        .map(|text| text.into_owned())
        .map_err(|e| ParseError::Encoding {
            position,
            message: e.to_string(),
        })
}

/// Parses an RSS, RSS 1.0 or Atom document.
///
/// Documents whose root isn't one of those come back as
/// [`FeedKind::Unknown`] without entries.
pub fn parse_feed(xml: &[u8]) -> Result<ParsedFeed, ParseError> {
    let mut reader = Reader::from_reader(xml);
    let mut parser = FeedParser::new();
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf);
        let position = reader.buffer_position() as u64;
        let decoder = reader.decoder();

        match event {
            Ok(Event::Start(e)) if parser.in_markup() => {
                let tag = decode(decoder, &e[..], position)?;
                parser.markup_open(&tag);
            }
            Ok(Event::Start(e)) => {
                let name = decode(decoder, e.name().as_ref(), position)?;
                parser.open(&name, &e, decoder);
            }
            Ok(Event::Empty(e)) if parser.in_markup() => {
                let tag = decode(decoder, &e[..], position)?;
                parser.markup_empty(&tag);
            }
            Ok(Event::Empty(e)) => {
                let name = decode(decoder, e.name().as_ref(), position)?;
                parser.open(&name, &e, decoder);
                parser.close();
            }
            Ok(Event::End(e)) if parser.in_nested_markup() => {
                let name = decode(decoder, e.name().as_ref(), position)?;
                parser.markup_close(&name);
            }
            Ok(Event::End(_)) => parser.close(),
            Ok(Event::Text(e)) => {
                let raw = decode(decoder, &e[..], position)?;
                if parser.in_nested_markup() {
                    parser.text(&raw);
                } else {
                    parser.text(&unescape_lenient(&raw));
                }
            }
            Ok(Event::CData(e)) => {
                let text = decode(decoder, &e[..], position)?;
                if parser.in_nested_markup() {
                    parser.text(&escape(text.as_str()));
                } else {
                    parser.text(&text);
                }
            }
            Ok(Event::Eof) if !parser.marks.is_empty() => {
                return Err(ParseError::Malformed {
                    position,
                    message: format!(
                        "document ends inside <{}>",
                        parser.path.rsplit('/').next().unwrap_or_default()
                    ),
                });
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ParseError::Malformed {
                    position,
                    message: e.to_string(),
                })
            }
        }

        if parser.kind == FeedKind::Unknown {
            break;
        }
        buf.clear();
    }

    Ok(parser.finish())
}
