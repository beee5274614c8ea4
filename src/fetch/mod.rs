//! Fetch capabilities injected into the aggregator.
//!
//! Each capability receives the cancellation context of its call so that
//! implementations can stop cooperatively once the context is cancelled.

pub mod http;
pub mod scripted;

pub use http::{HttpFetcher, HttpFetcherConfig};
pub use scripted::{Script, ScriptedFetcher};

use crate::error::FetchError;
use crate::models::{Comment, UserDetails};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Loads the details of the current user (the primary fetch).
#[async_trait]
pub trait UserFetcher: Send + Sync {
    async fn fetch_user_details(&self, ctx: &CancellationToken)
        -> Result<UserDetails, FetchError>;
}

/// Loads the comments written by a user.
#[async_trait]
pub trait CommentsFetcher: Send + Sync {
    async fn fetch_comments(
        &self,
        user_id: &str,
        ctx: &CancellationToken,
    ) -> Result<Vec<Comment>, FetchError>;
}

/// Loads the friends of a user.
#[async_trait]
pub trait FriendsFetcher: Send + Sync {
    async fn fetch_friends(
        &self,
        user_id: &str,
        ctx: &CancellationToken,
    ) -> Result<Vec<UserDetails>, FetchError>;
}
