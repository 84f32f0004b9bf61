use chrono::{TimeZone, Utc};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cplanet::config::Config;
use cplanet::feeds::Fetcher;
use cplanet::planet::aggregate;
use cplanet::render::write_outputs;

const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Alice writes</title>
  <entry>
    <title>Borrowing, again</title>
    <link rel="alternate" href="https://alice.example.org/borrowing"/>
    <author><name>Alice</name></author>
    <published>2024-03-09T08:00:00Z</published>
    <category term="rust"/>
    <category term="ownership"/>
    <content type="html">&lt;p&gt;It&amp;apos;s fine.&lt;/p&gt;</content>
  </entry>
  <entry>
    <title>Ancient history</title>
    <link href="https://alice.example.org/ancient"/>
    <updated>2023-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;

const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Bob's log</title>
    <item>
      <title>Release day</title>
      <link>https://bob.example.org/release</link>
      <guid isPermaLink="false">bob-42</guid>
      <pubDate>Sun, 10 Mar 2024 12:00:00 +0000</pubDate>
      <description><![CDATA[<b>shipped</b>]]></description>
    </item>
  </channel>
</rss>"#;

async fn mock_feeds() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alice.atom"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ATOM))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bob.rss"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/down.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn generates_every_output() {
    let server = mock_feeds().await;
    let out = tempfile::tempdir().unwrap();
    let config = Config::from_toml(&format!(
        r#"
        name = "Planet Integration"
        description = "Everything at once"
        url = "https://planet.example.org"
        days = 30

        [[feed]]
        name = "Alice"
        url = "{uri}/alice.atom"
        home = "https://alice.example.org/"

        [[feed]]
        name = "Down"
        url = "{uri}/down.xml"

        [[feed]]
        name = "Bob"
        url = "{uri}/bob.rss"

        [[output]]
        kind = "html"
        path = "{out}/index.html"

        [[output]]
        kind = "rss"
        path = "{out}/index.rss"

        [[output]]
        kind = "atom"
        path = "{out}/index.atom"

        [[output]]
        kind = "opml"
        path = "{out}/cplanet.opml"
        "#,
        uri = server.uri(),
        out = out.path().display(),
    ))
    .unwrap();
    let fetcher = Fetcher::new(&config.http).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap();

    let planet = aggregate(&config, &fetcher, now).await;
    let written = write_outputs(&planet, &config).unwrap();

    assert_eq!(written.len(), 4);
    let titles: Vec<_> = planet.posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Release day", "Borrowing, again"]);
    assert_eq!(planet.posts[0].permalink, None);

    let read = |name: &str| std::fs::read_to_string(out.path().join(name)).unwrap();

    let rss = read("index.rss");
    assert_eq!(rss.matches("<item>").count(), 2);
    assert!(rss.contains("<pubDate>Sun, 10 Mar 2024 12:00:00 +0000</pubDate>"));
    assert!(rss.contains("<description><![CDATA[<b>shipped</b>]]></description>"));
    assert!(rss.contains("<category>rust</category>"));

    let atom = read("index.atom");
    assert_eq!(atom.matches("<entry>").count(), 2);
    assert!(atom.contains("<published>2024-03-09T08:00:00Z</published>"));
    assert!(atom.contains("<author><name>Alice</name></author>"));
    assert!(atom.contains("<updated>2024-03-11T00:00:00Z</updated>"));

    let html = read("index.html");
    assert_eq!(html.matches("class=\"post\"").count(), 2);
    assert!(html.contains("<b>shipped</b>"));
    assert!(!html.contains("Ancient history"));

    let opml = read("cplanet.opml");
    assert_eq!(opml.matches("<outline ").count(), 3, "broken feeds stay subscribed");
}
