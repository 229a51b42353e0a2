//! Paper search adapter (arXiv Atom API).

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{EXTRA_PDF_URL, RawEntry, SourceConfig};
use crate::utils::http::fetch_text;

use super::SourceFetcher;
use super::feed::parse_feed;

const API_URL: &str = "https://export.arxiv.org/api/query";

/// Search adapter; newest submissions first.
#[derive(Clone)]
pub struct SearchAdapter {
    client: Client,
}

impl SearchAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceFetcher for SearchAdapter {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<RawEntry>> {
        let query = source
            .query
            .as_deref()
            .ok_or_else(|| AppError::config(format!("source '{}' has no query", source.name)))?;
        let url = query_url(query, source.max_results)?;

        let body = fetch_text(&self.client, url.as_str())
            .await
            .map_err(|e| AppError::fetch(&source.name, e))?;
        parse_results(&source.name, &body)
    }
}

/// Build the API query URL.
pub fn query_url(query: &str, max_results: usize) -> Result<Url> {
    let max_results = max_results.to_string();
    Ok(Url::parse_with_params(
        API_URL,
        &[
            ("search_query", query),
            ("sortBy", "submittedDate"),
            ("sortOrder", "descending"),
            ("start", "0"),
            ("max_results", max_results.as_str()),
        ],
    )?)
}

/// Parse an API response. Identities become short paper ids (`2601.01234v1`).
pub fn parse_results(source_name: &str, xml: &str) -> Result<Vec<RawEntry>> {
    let mut entries = parse_feed(source_name, xml)?;
    for entry in &mut entries {
        let abs_url = entry.id.clone().or_else(|| entry.link.clone());
        if let Some(abs_url) = abs_url {
            entry.id = Some(short_id(&abs_url).to_string());
            if entry.link.is_none() {
                entry.link = Some(abs_url.clone());
            }
            if !entry.extras.contains_key(EXTRA_PDF_URL) {
                entry
                    .extras
                    .insert(EXTRA_PDF_URL.to_string(), abs_url.replacen("/abs/", "/pdf/", 1));
            }
        }
    }
    Ok(entries)
}

/// `http://arxiv.org/abs/2601.01234v1` -> `2601.01234v1`;
/// `http://arxiv.org/abs/hep-th/9901001v1` -> `hep-th/9901001v1`.
fn short_id(abs_url: &str) -> &str {
    abs_url
        .split_once("/abs/")
        .map(|(_, id)| id)
        .unwrap_or(abs_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;

    const RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/2601.01234v1</id>
    <updated>2026-01-05T18:00:00Z</updated>
    <published>2026-01-05T18:00:00Z</published>
    <title>Sparse Attention
      for Long Contexts</title>
    <summary>  We study sparse
      attention.</summary>
    <author><name>A. Author</name></author>
    <link href="http://arxiv.org/abs/2601.01234v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2601.01234v1" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/hep-th/9901001v2</id>
    <published>1999-01-01T00:00:00Z</published>
    <title>Old style id</title>
  </entry>
</feed>"#;

    #[test]
    fn test_query_url() {
        let url = query_url("cat:cs.CL AND all:attention", 50).unwrap();
        let query = url.query().unwrap();
        assert!(url.as_str().starts_with(API_URL));
        assert!(query.contains("search_query=cat%3Acs.CL+AND+all%3Aattention"));
        assert!(query.contains("sortBy=submittedDate"));
        assert!(query.contains("max_results=50"));
    }

    #[test]
    fn test_parse_results() {
        let entries = parse_results("arxiv", RESPONSE).unwrap();
        assert_eq!(entries.len(), 2);

        let paper = Item::from_raw(entries[0].clone()).unwrap();
        assert_eq!(paper.identity, "2601.01234v1");
        assert_eq!(paper.title, "Sparse Attention for Long Contexts");
        assert_eq!(paper.summary, "We study sparse attention.");
        assert_eq!(paper.link, "http://arxiv.org/abs/2601.01234v1");
        assert_eq!(paper.extra(EXTRA_PDF_URL), Some("http://arxiv.org/pdf/2601.01234v1"));

        let old = Item::from_raw(entries[1].clone()).unwrap();
        assert_eq!(old.identity, "hep-th/9901001v2");
        assert_eq!(old.link, "http://arxiv.org/abs/hep-th/9901001v2");
        assert_eq!(old.extra(EXTRA_PDF_URL), Some("http://arxiv.org/pdf/hep-th/9901001v2"));
    }
}
