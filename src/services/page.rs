//! HTML page adapter for Next.js sites.
//!
//! Such pages carry their data as string-encoded JSON chunks pushed through
//! `self.__next_f.push([1, "..."])` inside `<script>` tags. Extraction runs
//! in stages, and any stage failing just moves on to the next chunk:
//!
//! 1. collect script bodies
//! 2. find push fragments
//! 3. unescape the JS string literal
//! 4. strip the `id:` chunk prefix and parse the inner JSON
//! 5. search the tree for an article or publication list

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{EXTRA_IMAGE_URL, ExtractorKind, RawEntry, SourceConfig};
use crate::utils::http::fetch_text;
use crate::utils::resolve;

use super::SourceFetcher;

static PUSH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r#"self\.__next_f\.push\(\[\s*1\s*,\s*"(.*?)"\s*\]\s*\)"#)
        .dot_matches_new_line(true)
        .build()
        .expect("Invalid flight push regex")
});

/// Section types holding record lists, with the key the records sit under.
const RECORD_SECTIONS: &[(&str, &str)] = &[("articleList", "articles"), ("publicationList", "posts")];

/// Page adapter.
#[derive(Clone)]
pub struct PageAdapter {
    client: Client,
}

impl PageAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceFetcher for PageAdapter {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<RawEntry>> {
        let url = source
            .url
            .as_deref()
            .ok_or_else(|| AppError::config(format!("source '{}' has no url", source.name)))?;
        let base_url = source.base_url.as_deref().unwrap_or(url);

        let html = fetch_text(&self.client, url)
            .await
            .map_err(|e| AppError::fetch(&source.name, e))?;

        let entries = match source.extractor {
            ExtractorKind::NextFlight => extract_next_flight(&html, base_url),
        };
        log::debug!("[{}] Extracted {} records", source.name, entries.len());
        Ok(entries)
    }
}

/// Extract records from a Next.js flight-payload page.
///
/// Returns an empty list when no record list is present.
pub fn extract_next_flight(html: &str, base_url: &str) -> Vec<RawEntry> {
    let records = find_records(html).unwrap_or_default();
    records
        .iter()
        .filter_map(|record| record_to_entry(record, base_url))
        .collect()
}

fn find_records(html: &str) -> Option<Vec<Value>> {
    let selector = Selector::parse("script").ok()?;
    let document = Html::parse_document(html);

    for script in document.select(&selector) {
        let body: String = script.text().collect();
        if !mentions_records(&body) {
            continue;
        }
        for capture in PUSH_PATTERN.captures_iter(&body) {
            let Some(raw) = capture.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if !mentions_records(raw) {
                continue;
            }
            if let Some(records) = decode_fragment(raw).and_then(|tree| search_tree(&tree)) {
                return Some(records);
            }
        }
    }
    None
}

fn mentions_records(text: &str) -> bool {
    text.contains("articles") || text.contains("posts")
}

/// Unescape a JS string body, drop the chunk id and parse the JSON behind it.
fn decode_fragment(raw: &str) -> Option<Value> {
    let unescaped: String = serde_json::from_str(&format!("\"{raw}\"")).ok()?;
    let (_, payload) = unescaped.split_once(':')?;
    serde_json::from_str(payload).ok()
}

/// Depth-first search for the first non-empty record list.
fn search_tree(node: &Value) -> Option<Vec<Value>> {
    match node {
        Value::Object(map) => {
            if let Some(kind) = map.get("_type").and_then(Value::as_str) {
                for (section, key) in RECORD_SECTIONS {
                    if kind == *section {
                        if let Some(records) = map.get(*key).and_then(Value::as_array) {
                            if !records.is_empty() {
                                return Some(records.clone());
                            }
                        }
                    }
                }
            }
            map.values().find_map(search_tree)
        }
        Value::Array(items) => items.iter().find_map(search_tree),
        _ => None,
    }
}

fn record_to_entry(record: &Value, base_url: &str) -> Option<RawEntry> {
    let record = record.as_object()?;
    let text = |key: &str| record.get(key).and_then(Value::as_str).map(str::to_string);

    let link = record
        .get("slug")
        .and_then(|s| s.get("current"))
        .and_then(Value::as_str)
        .map(|slug| {
            let kind = record
                .get("_type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_lowercase();
            let section = if kind.contains("research") || kind == "post" {
                "research"
            } else {
                "engineering"
            };
            let path = format!("/{section}/{slug}");
            resolve(base_url, &path).unwrap_or(path)
        });

    let tags = record
        .get("subjects")
        .and_then(Value::as_array)
        .map(|subjects| {
            subjects
                .iter()
                .filter_map(|s| s.get("label").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut entry = RawEntry {
        id: None,
        link,
        title: text("title"),
        published: text("publishedOn"),
        summary: text("summary"),
        tags,
        ..RawEntry::default()
    };
    let image = ["cardImage", "cardPhoto"]
        .iter()
        .find_map(|key| record.get(*key)?.get("url")?.as_str());
    if let Some(image) = image {
        entry
            .extras
            .insert(EXTRA_IMAGE_URL.to_string(), image.to_string());
    }
    Some(entry)
}
