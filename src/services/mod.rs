//! Source adapters.
//!
//! One adapter per `SourceKind`:
//! - `FeedAdapter`: RSS 2.0 / Atom feeds
//! - `PageAdapter`: HTML pages with embedded Next.js data
//! - `ReleaseAdapter`: latest repository release
//! - `SearchAdapter`: arXiv paper search

mod feed;
mod page;
mod release;
mod search;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::{RawEntry, SourceConfig, SourceKind};

pub use feed::{FeedAdapter, parse_feed};
pub use page::{PageAdapter, extract_next_flight};
pub use release::{ReleaseAdapter, parse_release};
pub use search::{SearchAdapter, parse_results, query_url};

/// Fetch and extract raw entries for one source.
///
/// Any error means "skip this source for this run".
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<RawEntry>>;
}

/// The full adapter set, selected by source kind.
pub struct AdapterSet {
    feed: FeedAdapter,
    page: PageAdapter,
    release: ReleaseAdapter,
    search: SearchAdapter,
}

impl AdapterSet {
    /// Build every adapter on a shared client. `github_token` raises the
    /// release API rate limit.
    pub fn new(client: Client, github_token: Option<String>) -> Self {
        Self {
            feed: FeedAdapter::new(client.clone()),
            page: PageAdapter::new(client.clone()),
            release: ReleaseAdapter::new(client.clone(), github_token),
            search: SearchAdapter::new(client),
        }
    }

    fn adapter(&self, kind: SourceKind) -> &dyn SourceFetcher {
        match kind {
            SourceKind::Feed => &self.feed,
            SourceKind::Page => &self.page,
            SourceKind::Release => &self.release,
            SourceKind::Search => &self.search,
        }
    }
}

#[async_trait]
impl SourceFetcher for AdapterSet {
    async fn fetch(&self, source: &SourceConfig) -> Result<Vec<RawEntry>> {
        log::debug!("[{}] Fetching ({})", source.name, source.kind);
        self.adapter(source.kind).fetch(source).await
    }
}
