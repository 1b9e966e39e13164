use crate::platform::Platform;
use crate::version::Version;
use serde::Deserialize;
use thiserror::Error;

/// GitHub releases listing for the Core Tools. One page is plenty: the
/// newest usable release is always near the top.
pub const DEFAULT_FEED_URL: &str =
    "https://api.github.com/repos/Azure/azure-functions-core-tools/releases";

const PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("release feed request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("release feed returned {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedRelease {
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub assets: Vec<FeedAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedAsset {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub browser_download_url: Option<String>,
}

/// A fetchable release artifact: version, file name, prerelease flag, URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAsset {
    pub version: String,
    pub file_name: String,
    pub prerelease: bool,
    pub download_url: String,
}

pub struct ReleaseFeed {
    endpoint: String,
    platform: Platform,
    client: reqwest::Client,
}

impl ReleaseFeed {
    pub fn new(endpoint: impl Into<String>, platform: Platform) -> Self {
        Self {
            endpoint: endpoint.into(),
            platform,
            client: reqwest::Client::new(),
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Newest release carrying a downloadable asset for this platform.
    ///
    /// Releases without a usable tag are dropped; prereleases are dropped
    /// unless `allow_prerelease`. The highest-versioned release that offers a
    /// matching asset wins; once it does, lower releases are not considered.
    /// Network and decoding failures are logged and come back as `None`.
    pub async fn resolve_latest(&self, allow_prerelease: bool) -> Option<RemoteAsset> {
        let releases = match self.fetch_releases().await {
            Ok(releases) => releases,
            Err(e) => {
                tracing::error!("Could not query the release feed: {}", e);
                return None;
            }
        };

        let mut ordered: Vec<(Version, FeedRelease)> = releases
            .into_iter()
            .filter_map(|release| {
                let tag = release.tag_name.as_deref().unwrap_or("");
                if tag.is_empty() {
                    return None;
                }
                if release.prerelease && !allow_prerelease {
                    return None;
                }
                let version = Version::parse(tag.trim_start_matches('v'))?;
                Some((version, release))
            })
            .collect();
        ordered.sort_by(|a, b| b.0.cmp(&a.0));

        for (version, release) in ordered {
            for asset in &release.assets {
                let (Some(name), Some(url)) =
                    (asset.name.as_deref(), asset.browser_download_url.as_deref())
                else {
                    continue;
                };
                if self.platform.matches_asset(name) {
                    tracing::debug!("Resolved {} via asset {}", version, name);
                    return Some(RemoteAsset {
                        version: version.as_str().to_string(),
                        file_name: name.to_string(),
                        prerelease: release.prerelease,
                        download_url: url.to_string(),
                    });
                }
            }
        }

        tracing::error!(
            "No release in the feed offers a {:?} asset",
            self.platform
        );
        None
    }

    async fn fetch_releases(&self) -> Result<Vec<FeedRelease>, FeedError> {
        tracing::debug!("Fetching release feed from {}", self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("per_page", PAGE_SIZE)])
            .header("Accept", "application/vnd.github.v3+json")
            .header(
                "User-Agent",
                concat!("funcup/", env!("CARGO_PKG_VERSION")),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status()));
        }

        Ok(response.json().await?)
    }
}
