//! Deterministic fetcher driven by a script.
//!
//! A script describes, per source, the value to return, an artificial
//! delay and an optional failure. Scripts can be built in code or loaded
//! from a TOML fixture file, which is how the CLI runs without a server.

use crate::error::FetchError;
use crate::fetch::{CommentsFetcher, FriendsFetcher, UserFetcher};
use crate::models::{Comment, UserDetails};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Behaviour of one scripted source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step<T> {
    /// Value returned on success.
    pub value: Option<T>,

    /// Artificial latency before answering.
    #[serde(default)]
    pub delay_ms: u64,

    /// When set, the source fails with this message after the delay.
    #[serde(default)]
    pub fail: Option<String>,
}

impl<T> Default for Step<T> {
    fn default() -> Self {
        Self {
            value: None,
            delay_ms: 0,
            fail: None,
        }
    }
}

impl<T> Step<T> {
    pub fn returning(value: T) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn after(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// Full script for the three sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub user: Step<UserDetails>,
    #[serde(default)]
    pub comments: Step<Vec<Comment>>,
    #[serde(default)]
    pub friends: Step<Vec<UserDetails>>,
}

impl Script {
    /// Load a script from a TOML fixture file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse fixture file: {}", path.display()))
    }
}

/// Fetcher that plays back a [`Script`] and counts invocations.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    script: Script,
    user_calls: AtomicUsize,
    comments_calls: AtomicUsize,
    friends_calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    pub fn user_calls(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }

    pub fn comments_calls(&self) -> usize {
        self.comments_calls.load(Ordering::SeqCst)
    }

    pub fn friends_calls(&self) -> usize {
        self.friends_calls.load(Ordering::SeqCst)
    }
}

/// Play one step: wait out its delay (unless cancelled), then answer.
async fn play<T: Clone>(
    source_name: &str,
    step: &Step<T>,
    empty: impl FnOnce() -> Result<T, FetchError>,
    ctx: &CancellationToken,
) -> Result<T, FetchError> {
    if step.delay_ms > 0 {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                debug!("Scripted {} fetch interrupted", source_name);
                return Err(FetchError::Interrupted);
            }
            _ = tokio::time::sleep(Duration::from_millis(step.delay_ms)) => {}
        }
    }

    if let Some(ref message) = step.fail {
        return Err(FetchError::unavailable(source_name, message.clone()));
    }

    match step.value {
        Some(ref value) => Ok(value.clone()),
        None => empty(),
    }
}

#[async_trait]
impl UserFetcher for ScriptedFetcher {
    async fn fetch_user_details(
        &self,
        ctx: &CancellationToken,
    ) -> Result<UserDetails, FetchError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        play(
            "user",
            &self.script.user,
            || {
                Err(FetchError::NotFound {
                    what: "user".to_string(),
                })
            },
            ctx,
        )
        .await
    }
}

#[async_trait]
impl CommentsFetcher for ScriptedFetcher {
    async fn fetch_comments(
        &self,
        user_id: &str,
        ctx: &CancellationToken,
    ) -> Result<Vec<Comment>, FetchError> {
        self.comments_calls.fetch_add(1, Ordering::SeqCst);
        debug!("Scripted comments fetch for user {}", user_id);
        play("comments", &self.script.comments, || Ok(Vec::new()), ctx).await
    }
}

#[async_trait]
impl FriendsFetcher for ScriptedFetcher {
    async fn fetch_friends(
        &self,
        user_id: &str,
        ctx: &CancellationToken,
    ) -> Result<Vec<UserDetails>, FetchError> {
        self.friends_calls.fetch_add(1, Ordering::SeqCst);
        debug!("Scripted friends fetch for user {}", user_id);
        play("friends", &self.script.friends, || Ok(Vec::new()), ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_parse_fixture() {
        let fixture = r#"
[user]
value = { id = "1", username = "james" }
delay_ms = 100

[comments]
value = [
    { id = "2", text = "Comment 1" },
    { id = "3", text = "Comment 2" },
]

[friends]
fail = "friends service down"
"#;

        let script: Script = toml::from_str(fixture).unwrap();
        assert_eq!(script.user.value, Some(UserDetails::new("1", "james")));
        assert_eq!(script.user.delay_ms, 100);
        assert_eq!(script.comments.value.as_ref().map(Vec::len), Some(2));
        assert_eq!(script.friends.fail.as_deref(), Some("friends service down"));
    }

    #[test]
    fn test_load_missing_fixture_fails() {
        let err = Script::load(Path::new("/nonexistent/fixture.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read fixture file"));
    }

    #[test]
    fn test_load_fixture_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[user]\nvalue = {{ id = \"7\", username = \"ada\" }}").unwrap();

        let script = Script::load(file.path()).unwrap();
        assert_eq!(script.user.value, Some(UserDetails::new("7", "ada")));
        assert!(script.comments.value.is_none());
    }

    #[test]
    fn test_load_shipped_fixture_without_value() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/degraded.toml");
        let script = assert_ok!(Script::load(&path));

        assert!(script.comments.value.is_none());
        assert_eq!(
            script.comments.fail.as_deref(),
            Some("comments service unavailable")
        );
        assert_eq!(script.friends.delay_ms, 3000);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let fetcher = ScriptedFetcher::new(Script::default());
        let ctx = CancellationToken::new();

        let err = assert_err!(fetcher.fetch_user_details(&ctx).await);
        assert_eq!(
            err,
            FetchError::NotFound {
                what: "user".to_string()
            }
        );
        assert_eq!(fetcher.user_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_lists_are_empty() {
        let fetcher = ScriptedFetcher::new(Script::default());
        let ctx = CancellationToken::new();

        let comments = assert_ok!(fetcher.fetch_comments("1", &ctx).await);
        let friends = assert_ok!(fetcher.fetch_friends("1", &ctx).await);
        assert!(comments.is_empty());
        assert!(friends.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_observes_cancellation() {
        let script = Script {
            comments: Step::returning(vec![Comment::new("2", "Comment 1")]).after(5_000),
            ..Script::default()
        };
        let fetcher = ScriptedFetcher::new(script);
        let ctx = CancellationToken::new();

        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = assert_err!(fetcher.fetch_comments("1", &ctx).await);
        assert_eq!(err, FetchError::Interrupted);
    }

    #[tokio::test]
    async fn test_failure_reports_source() {
        let script = Script {
            friends: Step::failing("boom"),
            ..Script::default()
        };
        let fetcher = ScriptedFetcher::new(script);

        let err = assert_err!(fetcher.fetch_friends("1", &CancellationToken::new()).await);
        assert_eq!(err, FetchError::unavailable("friends", "boom"));
        assert_eq!(fetcher.friends_calls(), 1);
        assert_eq!(fetcher.comments_calls(), 0);
    }
}
