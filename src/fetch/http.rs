//! HTTP-backed fetch capabilities.
//!
//! Talks to a JSON service exposing the user, their comments and their
//! friends. Each request races the call's cancellation context so an
//! aggregation that is cancelled or times out stops waiting on the network.

use crate::error::FetchError;
use crate::fetch::{CommentsFetcher, FriendsFetcher, UserFetcher};
use crate::models::{Comment, UserDetails};
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    pub base_url: String,
    pub request_timeout_seconds: u64,
    /// Path of the current user's details.
    pub user_path: String,
    /// Path template of a user's comments; `{id}` is substituted.
    pub comments_path: String,
    /// Path template of a user's friends; `{id}` is substituted.
    pub friends_path: String,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self::from(&crate::config::HttpConfig::default())
    }
}

/// Fetcher implementing all three capabilities over HTTP.
pub struct HttpFetcher {
    config: HttpFetcherConfig,
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a new fetcher for the given service.
    pub fn new(config: HttpFetcherConfig) -> Result<Self, FetchError> {
        info!("Initializing HTTP fetcher for {}", config.base_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| FetchError::unavailable("http client", e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Build the absolute URL for a path template. The user id is
    /// percent-encoded as path segment content.
    fn url_for(&self, template: &str, user_id: Option<&str>) -> Result<Url, FetchError> {
        let base_url = &self.config.base_url;
        let mut url =
            Url::parse(base_url).map_err(|e| FetchError::unavailable(base_url, e.to_string()))?;

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| FetchError::unavailable(base_url, "base URL cannot carry a path"))?;
            segments.pop_if_empty();
            for segment in template.split('/').filter(|segment| !segment.is_empty()) {
                match user_id {
                    Some(id) => segments.push(&segment.replace("{id}", id)),
                    None => segments.push(segment),
                };
            }
        }

        Ok(url)
    }

    /// GET a JSON document, giving up as soon as `ctx` is cancelled.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        ctx: &CancellationToken,
    ) -> Result<T, FetchError> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                debug!("Request to {} interrupted", url);
                Err(FetchError::Interrupted)
            }
            result = self.send(&url) => result,
        }
    }

    async fn send<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        debug!("GET {}", url);

        let response = self.http_client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else if e.is_connect() {
                FetchError::Connect {
                    url: url.to_string(),
                }
            } else {
                FetchError::unavailable(url.as_str(), e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                what: url.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        // Timeouts can also fire while the body is still streaming.
        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Decode {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }
}

#[async_trait]
impl UserFetcher for HttpFetcher {
    async fn fetch_user_details(
        &self,
        ctx: &CancellationToken,
    ) -> Result<UserDetails, FetchError> {
        let url = self.url_for(&self.config.user_path, None)?;
        self.get_json(url, ctx).await
    }
}

#[async_trait]
impl CommentsFetcher for HttpFetcher {
    async fn fetch_comments(
        &self,
        user_id: &str,
        ctx: &CancellationToken,
    ) -> Result<Vec<Comment>, FetchError> {
        let url = self.url_for(&self.config.comments_path, Some(user_id))?;
        self.get_json(url, ctx).await
    }
}

#[async_trait]
impl FriendsFetcher for HttpFetcher {
    async fn fetch_friends(
        &self,
        user_id: &str,
        ctx: &CancellationToken,
    ) -> Result<Vec<UserDetails>, FetchError> {
        let url = self.url_for(&self.config.friends_path, Some(user_id))?;
        self.get_json(url, ctx).await
    }
}
