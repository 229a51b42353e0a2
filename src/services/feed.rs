//! RSS 2.0 and Atom adapter.
//!
//! Parses with the streaming `quick-xml` reader and matches elements by
//! local name, so `media:description`, `yt:videoId` and friends are picked
//! up regardless of the prefix a feed chose.

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{EXTRA_IMAGE_URL, EXTRA_PDF_URL, EXTRA_VIDEO_ID, RawEntry, SourceConfig};
use crate::utils::http::fetch_text;
use crate::utils::resolve;

use super::SourceFetcher;

/// Feed adapter.
#[derive(Clone)]
pub struct FeedAdapter {
    client: Client,
}

impl FeedAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceFetcher for FeedAdapter {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<RawEntry>> {
        let url = source
            .url
            .as_deref()
            .ok_or_else(|| AppError::config(format!("source '{}' has no url", source.name)))?;
        let body = fetch_text(&self.client, url)
            .await
            .map_err(|e| AppError::fetch(&source.name, e))?;
        let mut entries = parse_feed(&source.name, &body)?;
        for entry in &mut entries {
            if let Some(link) = entry.link.take() {
                entry.link = Some(resolve(url, &link).unwrap_or(link));
            }
        }
        log::debug!("[{}] Parsed {} feed entries", source.name, entries.len());
        Ok(entries)
    }
}

/// Entry being assembled while its element is open.
#[derive(Default)]
struct Pending {
    entry: RawEntry,
    /// Local names of open elements below the entry
    path: Vec<String>,
    text: String,
    updated: Option<String>,
    media_description: Option<String>,
}

impl Pending {
    fn open(&mut self, element: &BytesStart<'_>) {
        let name = local_name(element);
        self.attributes(&name, element);
        self.path.push(name);
        self.text.clear();
    }

    /// Attribute-carried values: Atom links and categories, thumbnails.
    fn attributes(&mut self, name: &str, element: &BytesStart<'_>) {
        match name {
            "link" if self.path.is_empty() => {
                let Some(href) = attribute(element, "href") else { return };
                let is_pdf = attribute(element, "type").as_deref() == Some("application/pdf")
                    || attribute(element, "title").as_deref() == Some("pdf");
                let rel = attribute(element, "rel");
                if is_pdf {
                    self.entry.extras.insert(EXTRA_PDF_URL.to_string(), href);
                } else if rel.as_deref().is_none_or(|r| r == "alternate") && self.entry.link.is_none() {
                    self.entry.link = Some(href);
                }
            }
            "category" if self.path.is_empty() => {
                if let Some(term) = attribute(element, "term") {
                    self.entry.tags.push(term);
                }
            }
            "thumbnail" => {
                if let Some(url) = attribute(element, "url") {
                    self.entry
                        .extras
                        .entry(EXTRA_IMAGE_URL.to_string())
                        .or_insert(url);
                }
            }
            _ => {}
        }
    }

    fn close(&mut self) {
        let Some(name) = self.path.pop() else { return };
        let text = std::mem::take(&mut self.text);
        let value = text.trim();
        if value.is_empty() {
            return;
        }
        let value = value.to_string();
        let direct = self.path.is_empty();
        let entry = &mut self.entry;

        match name.as_str() {
            "guid" | "id" if direct => entry.id = Some(value),
            "link" if direct => {
                entry.link.get_or_insert(value);
            }
            "title" if direct => entry.title = Some(value),
            "pubDate" | "published" if direct => entry.published = Some(value),
            "updated" | "date" if direct => self.updated = Some(value),
            "description" | "summary" | "content" | "encoded" if direct => {
                entry.summary.get_or_insert(value);
            }
            "description" => self.media_description = Some(value),
            "category" if direct => entry.tags.push(value),
            "videoId" => {
                entry
                    .extras
                    .insert(EXTRA_IMAGE_URL.to_string(), thumbnail_for(&value));
                entry.extras.insert(EXTRA_VIDEO_ID.to_string(), value);
            }
            _ => {}
        }
    }

    fn finish(self) -> RawEntry {
        let mut entry = self.entry;
        if entry.published.is_none() {
            entry.published = self.updated;
        }
        if let Some(description) = self.media_description {
            entry.summary = Some(description);
        }
        entry
    }
}

/// Parse an RSS or Atom document into raw entries, in document order.
pub fn parse_feed(source_name: &str, xml: &str) -> Result<Vec<RawEntry>> {
    let mut reader = Reader::from_str(xml);

    let mut entries = Vec::new();
    let mut pending: Option<Pending> = None;
    let mut is_feed = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match pending.as_mut() {
                Some(p) => p.open(&e),
                None => match local_name(&e).as_str() {
                    "rss" | "feed" | "RDF" => is_feed = true,
                    "item" | "entry" => pending = Some(Pending::default()),
                    _ => {}
                },
            },
            Event::Empty(e) => {
                if let Some(p) = &mut pending {
                    p.open(&e);
                    p.close();
                }
            }
            Event::Text(t) => {
                if let Some(p) = &mut pending {
                    let text = t
                        .unescape()
                        .map(|s| s.into_owned())
                        // Feeds often carry HTML entities XML doesn't define.
                        .unwrap_or_else(|_| {
                            html_escape::decode_html_entities(&String::from_utf8_lossy(&t))
                                .into_owned()
                        });
                    p.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(p) = &mut pending {
                    p.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => {
                let closes_entry = matches!(e.local_name().as_ref(), b"item" | b"entry");
                match pending.take() {
                    Some(p) if closes_entry && p.path.is_empty() => entries.push(p.finish()),
                    Some(mut p) => {
                        p.close();
                        pending = Some(p);
                    }
                    None => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !is_feed {
        return Err(AppError::extract(
            source_name,
            "document is not an RSS or Atom feed",
        ));
    }
    Ok(entries)
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn attribute(element: &BytesStart<'_>, key: &str) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn thumbnail_for(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Example Blog</title>
    <link>https://blog.example.com</link>
    <item>
      <title>Second post</title>
      <link>https://blog.example.com/second</link>
      <guid isPermaLink="false">post-2</guid>
      <pubDate>Tue, 10 Jun 2025 09:00:00 GMT</pubDate>
      <description><![CDATA[<p>Hello <b>world</b></p>]]></description>
      <category>rust</category>
    </item>
    <item>
      <title>First &amp; oldest</title>
      <link>https://blog.example.com/first</link>
      <description>caf&eacute; &nbsp;notes</description>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"
      xmlns:yt="http://www.youtube.com/xml/schemas/2015"
      xmlns:media="http://search.yahoo.com/mrss/">
  <title>Channel</title>
  <link rel="alternate" href="https://www.youtube.com/channel/abc"/>
  <entry>
    <id>yt:video:dQw4w9WgXcQ</id>
    <yt:videoId>dQw4w9WgXcQ</yt:videoId>
    <title>Launch video</title>
    <link rel="alternate" href="https://www.youtube.com/watch?v=dQw4w9WgXcQ"/>
    <published>2025-06-01T10:00:00+00:00</published>
    <updated>2025-06-02T10:00:00+00:00</updated>
    <media:group>
      <media:title>Launch video</media:title>
      <media:description>Full launch walkthrough</media:description>
      <media:thumbnail url="https://i1.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg" width="480" height="360"/>
    </media:group>
  </entry>
  <entry>
    <id>urn:post:7</id>
    <title type="html">Only updated</title>
    <link rel="self" href="https://example.com/self"/>
    <link href="https://example.com/posts/7"/>
    <updated>2025-05-01T00:00:00Z</updated>
    <summary>Short summary</summary>
    <category term="news"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss() {
        let entries = parse_feed("blog", RSS).unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.id.as_deref(), Some("post-2"));
        assert_eq!(first.link.as_deref(), Some("https://blog.example.com/second"));
        assert_eq!(first.published.as_deref(), Some("Tue, 10 Jun 2025 09:00:00 GMT"));
        assert_eq!(first.tags, vec!["rust".to_string()]);

        let item = Item::from_raw(first.clone()).unwrap();
        assert_eq!(item.summary, "Hello world");
        assert!(item.timestamp.is_some());

        let second = Item::from_raw(entries[1].clone()).unwrap();
        assert_eq!(second.identity, "https://blog.example.com/first");
        assert_eq!(second.title, "First & oldest");
        assert!(second.summary.starts_with("café"));
        assert!(second.timestamp.is_none());
    }

    #[test]
    fn test_parse_atom_video_feed() {
        let entries = parse_feed("channel", ATOM).unwrap();
        assert_eq!(entries.len(), 2);

        let video = &entries[0];
        assert_eq!(video.id.as_deref(), Some("yt:video:dQw4w9WgXcQ"));
        assert_eq!(video.title.as_deref(), Some("Launch video"));
        assert_eq!(
            video.link.as_deref(),
            Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        );
        assert_eq!(video.published.as_deref(), Some("2025-06-01T10:00:00+00:00"));
        assert_eq!(video.summary.as_deref(), Some("Full launch walkthrough"));
        assert_eq!(
            video.extras.get(EXTRA_VIDEO_ID).map(String::as_str),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            video.extras.get(EXTRA_IMAGE_URL).map(String::as_str),
            Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
        );

        let post = &entries[1];
        assert_eq!(post.link.as_deref(), Some("https://example.com/posts/7"));
        assert_eq!(post.published.as_deref(), Some("2025-05-01T00:00:00Z"));
        assert_eq!(post.tags, vec!["news".to_string()]);
    }

    #[test]
    fn test_non_feed_is_extraction_error() {
        let err = parse_feed("blog", "<html><body>Not here</body></html>").unwrap_err();
        assert_eq!(err.failure_kind(), crate::error::FailureKind::Extraction);
    }

    #[test]
    fn test_malformed_xml_is_error() {
        assert!(parse_feed("blog", "<rss><channel><item></channel></rss>").is_err());
    }
}
