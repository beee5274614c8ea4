//! Data models for the aggregator.
//!
//! This module contains the value objects exchanged with the fetch
//! capabilities and the combined result handed back to callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a user, as returned by the primary fetch.
pub type UserId = String;

/// A user's own details.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserDetails {
    /// Stable identifier used to key the dependent fetches.
    pub id: UserId,
    /// Display name.
    pub username: String,
}

impl UserDetails {
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

impl fmt::Display for UserDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.username, self.id)
    }
}

/// A comment written by a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
}

impl Comment {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// The combined view of a user produced by one successful aggregation.
///
/// `comments` and `friends` are always present. When a dependent fetch
/// failed or timed out the corresponding list is empty, never partial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub user_details: UserDetails,
    pub comments: Vec<Comment>,
    pub friends: Vec<UserDetails>,
}

impl AggregatedResult {
    pub fn new(
        user_details: UserDetails,
        comments: Vec<Comment>,
        friends: Vec<UserDetails>,
    ) -> Self {
        Self {
            user_details,
            comments,
            friends,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_display() {
        let user = UserDetails::new("1", "james");
        assert_eq!(user.to_string(), "james (#1)");
    }

    #[test]
    fn test_result_serializes_empty_lists() {
        let result = AggregatedResult::new(UserDetails::new("1", "james"), vec![], vec![]);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["user_details"]["username"], "james");
        assert_eq!(json["comments"], serde_json::json!([]));
        assert_eq!(json["friends"], serde_json::json!([]));
    }

    #[test]
    fn test_comment_deserialize() {
        let comment: Comment = serde_json::from_str(r#"{"id":"2","text":"Comment 1"}"#).unwrap();
        assert_eq!(comment, Comment::new("2", "Comment 1"));
    }
}
