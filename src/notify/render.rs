//! Message rendering.
//!
//! Produces HTML-markup message text, one template per source kind. Every
//! interpolated value is escaped.

use chrono_tz::Tz;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use url::Url;

use crate::models::{EXTRA_IMAGE_URL, EXTRA_PDF_URL, EXTRA_TAG, EXTRA_VIDEO_ID, Item, SourceConfig, SourceKind};
use crate::utils::{date::format_local, truncate_words};

const INSTANT_VIEW_BASE: &str = "https://t.me/iv";

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// HTML message body
    pub text: String,
    /// URL the link preview should show
    pub preview_url: Option<String>,
}

/// Renders items for a chat channel.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    tz: Tz,
    summary_words: usize,
}

impl Renderer {
    pub fn new(tz: Tz, summary_words: usize) -> Self {
        Self { tz, summary_words }
    }

    pub fn render(&self, item: &Item, source: &SourceConfig) -> Message {
        match source.kind {
            SourceKind::Feed => self.feed(item, source),
            SourceKind::Page => self.page(item, source),
            SourceKind::Release => self.release(item, source),
            SourceKind::Search => self.search(item),
        }
    }

    fn feed(&self, item: &Item, source: &SourceConfig) -> Message {
        let video_id = item.extra(EXTRA_VIDEO_ID);
        let link = match &source.instant_view_hash {
            Some(hash) if !item.link.is_empty() && video_id.is_none() => {
                instant_view(&item.link, hash).unwrap_or_else(|| item.link.clone())
            }
            _ => item.link.clone(),
        };
        let icon = if video_id.is_some() { "🎥" } else { "📰" };

        let mut body = format!(
            "{icon} <b>{}</b>\n\n{}\n\n",
            text(&source.name),
            linked_title(&link, &item.title)
        );
        self.push_summary(&mut body, item);
        body.push_str(&format!("📅 {}\n", self.date(item)));

        let preview = match item.extra(EXTRA_IMAGE_URL) {
            Some(thumb) if video_id.is_some() => thumb.to_string(),
            _ => link,
        };
        Message {
            text: body,
            preview_url: non_empty(preview),
        }
    }

    fn page(&self, item: &Item, source: &SourceConfig) -> Message {
        let mut body = format!(
            "🕷 <b>{}</b>\n\n{}\n\n",
            text(&source.name),
            linked_title(&item.link, &item.title)
        );
        if !item.tags.is_empty() {
            body.push_str(&format!("🏷 <i>{}</i>\n\n", text(&item.tags.join(", "))));
        }
        self.push_summary(&mut body, item);
        body.push_str(&format!("📅 {}\n", self.date(item)));

        Message {
            text: body,
            preview_url: non_empty(item.link.clone()),
        }
    }

    fn release(&self, item: &Item, source: &SourceConfig) -> Message {
        let repo = source.repo.as_deref().unwrap_or(&source.name);
        let tag = item.extra(EXTRA_TAG).unwrap_or(&item.identity);

        let mut body = format!(
            "📦 New release for <b>{}</b>\n\n<b>Tag:</b> <code>{}</code>\n📅 {}\n",
            text(repo),
            text(tag),
            self.date(item)
        );
        if !item.link.is_empty() {
            body.push_str(&format!(
                "\n🔗 <a href=\"{}\">View Release</a>",
                attr(&item.link)
            ));
        }
        Message {
            text: body,
            preview_url: non_empty(item.link.clone()),
        }
    }

    fn search(&self, item: &Item) -> Message {
        let mut body = format!("<b>{}</b>\n\n", text(&item.title));
        let summary = truncate_words(&item.summary, self.summary_words);
        if !summary.is_empty() {
            body.push_str(&format!("<i>{}</i>\n\n", text(&summary)));
        }
        if !item.tags.is_empty() {
            let hashtags: Vec<String> = item
                .tags
                .iter()
                .map(|t| format!("#{}", t.replace(' ', "")))
                .collect();
            body.push_str(&format!("🏷 {}\n", text(&hashtags.join(" "))));
        }
        body.push_str(&format!("📅 {}\n", self.date(item)));

        let mut links = Vec::new();
        if !item.link.is_empty() {
            links.push(format!("<a href=\"{}\">Abstract</a>", attr(&item.link)));
        }
        if let Some(pdf) = item.extra(EXTRA_PDF_URL) {
            links.push(format!("<a href=\"{}\">PDF</a>", attr(pdf)));
        }
        if !links.is_empty() {
            body.push_str(&format!("\n🔗 {}", links.join(" | ")));
        }

        Message {
            text: body,
            preview_url: non_empty(item.link.clone()),
        }
    }

    fn push_summary(&self, body: &mut String, item: &Item) {
        let summary = truncate_words(&item.summary, self.summary_words);
        if !summary.is_empty() {
            body.push_str(&text(&summary));
            body.push_str("\n\n");
        }
    }

    fn date(&self, item: &Item) -> String {
        format_local(item.timestamp, self.tz)
    }
}

fn linked_title(link: &str, title: &str) -> String {
    if link.is_empty() {
        format!("<b>{}</b>", text(title))
    } else {
        format!("<a href=\"{}\"><b>{}</b></a>", attr(link), text(title))
    }
}

/// Wrap a link in an Instant View URL.
fn instant_view(link: &str, hash: &str) -> Option<String> {
    Url::parse_with_params(INSTANT_VIEW_BASE, &[("url", link), ("rhash", hash)])
        .ok()
        .map(String::from)
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}
