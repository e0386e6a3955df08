//! Release channel resolution
//!
//! A channel feed maps symbolic names (`stable`, `latest`, `v1.29`) to the
//! newest release on that channel.

use airhaul_repo::HttpClient;
use serde::Deserialize;

use crate::error::{CollectionError, Result};

/// One channel of the feed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelRecord {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub latest: String,
}

#[derive(Debug, Deserialize)]
struct ChannelFeed {
    #[serde(default)]
    data: Vec<ChannelRecord>,
}

/// Resolves channel names against a JSON channel feed
#[derive(Debug, Clone)]
pub struct ChannelResolver {
    http: HttpClient,
    url: String,
}

impl ChannelResolver {
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    /// Fetch every channel in the feed
    pub async fn fetch(&self) -> Result<Vec<ChannelRecord>> {
        let feed: ChannelFeed = self.http.get_json(&self.url).await?;
        Ok(feed.data)
    }

    /// Latest version on `channel`
    pub async fn lookup(&self, channel: &str) -> Result<String> {
        self.fetch()
            .await?
            .into_iter()
            .find(|record| record.name == channel)
            .map(|record| record.latest)
            .ok_or_else(|| CollectionError::ChannelNotFound {
                channel: channel.to_string(),
            })
    }

    /// Resolve `version` if it names a channel, otherwise return it unchanged
    ///
    /// Never fails: an unreachable or undecodable feed keeps the literal version.
    pub async fn resolve(&self, version: &str) -> String {
        match self.lookup(version).await {
            Ok(latest) => {
                tracing::debug!(channel = version, version = %latest, "resolved release channel");
                latest
            }
            Err(e) => {
                tracing::debug!(version, "using version as given: {}", e);
                version.to_string()
            }
        }
    }
}
