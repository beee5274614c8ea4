//! Aggregation of a user's details, comments and friends.
//!
//! The primary fetch runs first; comments and friends are then fetched
//! concurrently, each guarded by a timeout that degrades to an empty list.
//!
//! Cancellation forms a tree: the aggregator owns a long-lived scope, every
//! call derives a child of it and additionally observes the caller's
//! context, and every dependent fetch derives its own child of the call.
//! [`Aggregator::close`] cancels the scope for good, so in-flight calls fail
//! with [`AggregateError::Cancelled`] and later calls fail immediately.
//! Cancelling a caller's context only aborts that caller's call.

use crate::aggregator::guarded::{guarded, FallbackReason, Guarded, DEFAULT_DEPENDENT_TIMEOUT};
use crate::error::AggregateError;
use crate::fetch::{CommentsFetcher, FriendsFetcher, UserFetcher};
use crate::models::{AggregatedResult, Comment, UserDetails};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a dependent fetch settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Fetched,
    Degraded(FallbackReason),
}

impl Settlement {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Settlement::Degraded(_))
    }
}

impl fmt::Display for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Settlement::Fetched => write!(f, "fetched"),
            Settlement::Degraded(reason) => write!(f, "{}", reason),
        }
    }
}

/// A successful aggregation together with how each dependent settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub result: AggregatedResult,
    pub comments: Settlement,
    pub friends: Settlement,
}

/// Orchestrates the primary fetch and the two guarded dependent fetches.
pub struct Aggregator {
    users: Arc<dyn UserFetcher>,
    comments: Arc<dyn CommentsFetcher>,
    friends: Arc<dyn FriendsFetcher>,
    dependent_timeout: Duration,
    scope: CancellationToken,
}

impl Aggregator {
    /// Create an aggregator over the given capabilities.
    pub fn new(
        users: Arc<dyn UserFetcher>,
        comments: Arc<dyn CommentsFetcher>,
        friends: Arc<dyn FriendsFetcher>,
    ) -> Self {
        Self {
            users,
            comments,
            friends,
            dependent_timeout: DEFAULT_DEPENDENT_TIMEOUT,
            scope: CancellationToken::new(),
        }
    }

    /// Override the time budget of each dependent fetch.
    pub fn with_dependent_timeout(mut self, timeout: Duration) -> Self {
        self.dependent_timeout = timeout;
        self
    }

    pub fn dependent_timeout(&self) -> Duration {
        self.dependent_timeout
    }

    /// Aggregate the current user's details, comments and friends.
    pub async fn aggregate(
        &self,
        ctx: &CancellationToken,
    ) -> Result<AggregatedResult, AggregateError> {
        self.aggregate_with_outcome(ctx)
            .await
            .map(|aggregation| aggregation.result)
    }

    /// Like [`Aggregator::aggregate`], also reporting how each dependent settled.
    pub async fn aggregate_with_outcome(
        &self,
        ctx: &CancellationToken,
    ) -> Result<Aggregation, AggregateError> {
        let call = self.scope.child_token();
        // Anything still running under this call is told to stop once we return.
        let _stop = call.clone().drop_guard();

        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                info!("Aggregation cancelled by caller");
                Err(AggregateError::Cancelled)
            }
            outcome = self.run(ctx, &call) => outcome,
        }
    }

    /// Cancel the aggregator's scope. Irreversible.
    pub fn close(&self) {
        if !self.scope.is_cancelled() {
            info!("Closing aggregator scope");
        }
        self.scope.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.scope.is_cancelled()
    }

    async fn run(
        &self,
        ctx: &CancellationToken,
        call: &CancellationToken,
    ) -> Result<Aggregation, AggregateError> {
        let cancelled = || ctx.is_cancelled() || call.is_cancelled();

        if cancelled() {
            debug!("Aggregation cancelled before loading user details");
            return Err(AggregateError::Cancelled);
        }

        let user_details = tokio::select! {
            biased;
            _ = call.cancelled() => {
                info!("Aggregation cancelled while loading user details");
                return Err(AggregateError::Cancelled);
            }
            loaded = self.users.fetch_user_details(call) => loaded?,
        };

        // Cancellation may have raced with the primary fetch completing.
        if cancelled() {
            info!("Aggregation cancelled after loading user details");
            return Err(AggregateError::Cancelled);
        }

        info!("Loaded user details for {}", user_details);
        let user_id = user_details.id.as_str();

        let comments = guarded(call, self.dependent_timeout, Vec::new(), |fetch_ctx| async move {
            self.comments.fetch_comments(user_id, &fetch_ctx).await
        });
        let friends = guarded(call, self.dependent_timeout, Vec::new(), |fetch_ctx| async move {
            self.friends.fetch_friends(user_id, &fetch_ctx).await
        });
        let (comments, friends) = futures::future::join(comments, friends).await;

        if cancelled() || comments.is_cancelled() || friends.is_cancelled() {
            info!("Aggregation cancelled while loading comments and friends");
            return Err(AggregateError::Cancelled);
        }

        let (comments, comments_settlement) = settle::<Comment>("comments", user_id, comments)?;
        let (friends, friends_settlement) = settle::<UserDetails>("friends", user_id, friends)?;

        debug!(
            "Aggregated {} comments and {} friends for user {}",
            comments.len(),
            friends.len(),
            user_id
        );

        Ok(Aggregation {
            result: AggregatedResult::new(user_details, comments, friends),
            comments: comments_settlement,
            friends: friends_settlement,
        })
    }
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregator")
            .field("dependent_timeout", &self.dependent_timeout)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Turn a guarded outcome into its list and settlement, logging degradation.
fn settle<T>(
    what: &str,
    user_id: &str,
    outcome: Guarded<Vec<T>>,
) -> Result<(Vec<T>, Settlement), AggregateError> {
    match outcome {
        Guarded::Fetched(items) => Ok((items, Settlement::Fetched)),
        Guarded::Fallback { value, reason } => {
            warn!("Loading {} for user {} {}; using empty list", what, user_id, reason);
            Ok((value, Settlement::Degraded(reason)))
        }
        Guarded::Cancelled => Err(AggregateError::Cancelled),
    }
}
