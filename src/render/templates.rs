use askama::Template;

use crate::render::RenderContext;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub planet: &'a RenderContext,
}

#[derive(Template)]
#[template(path = "rss.xml")]
pub struct RssTemplate<'a> {
    pub planet: &'a RenderContext,
}

#[derive(Template)]
#[template(path = "atom.xml")]
pub struct AtomTemplate<'a> {
    pub planet: &'a RenderContext,
}

#[derive(Template)]
#[template(path = "opml.xml")]
pub struct OpmlTemplate<'a> {
    pub planet: &'a RenderContext,
}

pub mod filters {
    use std::fmt::Display;

    use crate::render::split_cdata;

    /// Makes a value safe to embed in a CDATA section by splitting any `]]>`
    /// across two sections.
    pub fn cdata<T: Display>(s: T) -> ::askama::Result<String> {
        Ok(split_cdata(&s.to_string()))
    }

}
