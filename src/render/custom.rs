//! # Template files
//!
//! An `[[output]]` can name its own template, rendered at run time with
//! tera:
//!
//! ```toml
//! [[output]]
//! kind = "html"
//! path = "public/index.html"
//! template = "layout/index.html"
//! ```
//!
//! The template sees the same `planet` value as the built-in templates,
//! with dates formatted for the output `kind`. Templates whose file name ends
//! in `.html`, `.htm` or `.xml` are auto-escaped; `{{ x | safe }}` opts out
//! and `{{ x | cdata | safe }}` prepares a value for a CDATA section.

use std::collections::HashMap;
use std::path::Path;

use tera::{Context, Tera, Value};

use crate::render::{split_cdata, RenderContext, RenderError};

fn cdata(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("Filter `cdata` expects a string"))?;
    Ok(Value::String(split_cdata(text)))
}

/// Renders the template at `path` against `context`.
pub fn render_file(path: &Path, context: &RenderContext) -> Result<String, RenderError> {
    let source = std::fs::read_to_string(path).map_err(|source| {
        RenderError::ReadTemplate {
            path: path.to_owned(),
            source,
        }
    })?;
    let tera_error = |source| RenderError::Custom {
        path: path.to_owned(),
        source,
    };

    // Named after the file so auto-escaping follows its extension.
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "template".to_owned());

    let mut tera = Tera::default();
    tera.register_filter("cdata", cdata);
    tera.add_raw_template(&name, &source).map_err(tera_error)?;

    let mut tera_context = Context::new();
    tera_context.insert("planet", context);
    tera.render(&name, &tera_context).map_err(tera_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RenderContext {
        RenderContext {
            name: "Planet & Co".to_owned(),
            description: String::new(),
            url: "https://planet.example.org".to_owned(),
            language: "en".to_owned(),
            version: "0.2.0".to_owned(),
            generated: "today".to_owned(),
            self_href: "https://planet.example.org/index.html".to_owned(),
            feeds: vec![],
            posts: vec![crate::render::PostView {
                feed_name: "Alice".to_owned(),
                title: "One".to_owned(),
                link: "https://alice.example.org/1".to_owned(),
                id: "https://alice.example.org/1".to_owned(),
                permalink: String::new(),
                author: String::new(),
                description: "<b>x</b> ]]> y".to_owned(),
                date: "yesterday".to_owned(),
                tags: vec!["a".to_owned(), "b".to_owned()],
            }],
            alternates: vec![],
        }
    }

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn renders_planet_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "list.txt",
            "{{ planet.name }}|{% for post in planet.posts %}{{ post.title }}@{{ post.date }}:{{ post.tags | join(sep=\",\") }}{% endfor %}",
        );

        let rendered = render_file(&path, &context()).unwrap();

        assert_eq!(rendered, "Planet & Co|One@yesterday:a,b");
    }

    #[test]
    fn html_files_are_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "index.html",
            "<h1>{{ planet.name }}</h1>{% for post in planet.posts %}{{ post.description | safe }}{% endfor %}",
        );

        let rendered = render_file(&path, &context()).unwrap();

        assert_eq!(rendered, "<h1>Planet &amp; Co</h1><b>x</b> ]]> y");
    }

    #[test]
    fn cdata_filter_splits_terminator() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "feed.xml",
            "{% for post in planet.posts %}<![CDATA[{{ post.description | cdata | safe }}]]>{% endfor %}",
        );

        let rendered = render_file(&path, &context()).unwrap();

        assert_eq!(rendered, "<![CDATA[<b>x</b> ]]]]><![CDATA[> y]]>");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = render_file(&dir.path().join("nope.html"), &context()).unwrap_err();

        assert!(matches!(err, RenderError::ReadTemplate { .. }));
    }

    #[test]
    fn syntax_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "broken.html", "{% for post in planet.posts %}");

        let err = render_file(&path, &context()).unwrap_err();

        assert!(matches!(err, RenderError::Custom { .. }));
    }
}
