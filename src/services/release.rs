//! Latest-release adapter (GitHub REST API).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{EXTRA_TAG, RawEntry, SourceConfig};

use super::SourceFetcher;

const API_BASE: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    name: Option<String>,
    html_url: Option<String>,
    published_at: Option<String>,
    body: Option<String>,
}

impl From<Release> for RawEntry {
    fn from(release: Release) -> Self {
        let mut entry = RawEntry {
            id: Some(release.tag_name.clone()),
            link: release.html_url,
            title: release
                .name
                .filter(|n| !n.trim().is_empty())
                .or_else(|| Some(release.tag_name.clone())),
            published: release.published_at,
            summary: release.body,
            ..RawEntry::default()
        };
        entry.extras.insert(EXTRA_TAG.to_string(), release.tag_name);
        entry
    }
}

/// Release adapter; one entry per repository, for its latest release.
#[derive(Clone)]
pub struct ReleaseAdapter {
    client: Client,
    token: Option<String>,
}

impl ReleaseAdapter {
    pub fn new(client: Client, token: Option<String>) -> Self {
        Self { client, token }
    }
}

#[async_trait]
impl SourceFetcher for ReleaseAdapter {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<RawEntry>> {
        let repo = source
            .repo
            .as_deref()
            .ok_or_else(|| AppError::config(format!("source '{}' has no repo", source.name)))?;
        let url = format!("{API_BASE}/repos/{repo}/releases/latest");

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::fetch(&source.name, e))?;
        if response.status() == StatusCode::NOT_FOUND {
            log::info!("[{}] {} has no releases", source.name, repo);
            return Ok(Vec::new());
        }
        let body = response
            .error_for_status()
            .map_err(|e| AppError::fetch(&source.name, e))?
            .text()
            .await
            .map_err(|e| AppError::fetch(&source.name, e))?;

        Ok(vec![parse_release(&source.name, &body)?])
    }
}

/// Parse a "latest release" response body.
pub fn parse_release(source_name: &str, json: &str) -> Result<RawEntry> {
    let release: Release = serde_json::from_str(json)
        .map_err(|e| AppError::extract(source_name, format!("unexpected release payload: {e}")))?;
    Ok(release.into())
}
