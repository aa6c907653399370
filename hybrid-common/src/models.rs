//! Data model for rows and documents read from either store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Post row from the relational store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Timeline row: a post joined to its author's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_name: String,
}

/// Like count for one post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementMetric {
    pub post_id: i64,
    pub content: String,
    pub total_likes: i64,
    pub author_name: String,
}

/// Kind of an activity event
///
/// Unknown kinds are kept verbatim so the document store can grow new
/// event types without breaking readers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityKind {
    PostCreated,
    PostLiked,
    PostCommented,
    UserFollowed,
    Other(String),
}

impl ActivityKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActivityKind::PostCreated => "post_created",
            ActivityKind::PostLiked => "post_liked",
            ActivityKind::PostCommented => "post_commented",
            ActivityKind::UserFollowed => "user_followed",
            ActivityKind::Other(kind) => kind,
        }
    }
}

impl From<String> for ActivityKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "post_created" => ActivityKind::PostCreated,
            "post_liked" => ActivityKind::PostLiked,
            "post_commented" => ActivityKind::PostCommented,
            "user_followed" => ActivityKind::UserFollowed,
            _ => ActivityKind::Other(value),
        }
    }
}

impl From<&str> for ActivityKind {
    fn from(value: &str) -> Self {
        ActivityKind::from(value.to_string())
    }
}

impl From<ActivityKind> for String {
    fn from(kind: ActivityKind) -> Self {
        match kind {
            ActivityKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity event document from the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Store-assigned document id (hex), when projected
    pub id: Option<String>,
    pub user_id: i64,
    pub kind: ActivityKind,
    /// Correlation key to a post or other entity; documents may omit it
    pub reference_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Nested preference map of a user preference document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub notifications: BTreeMap<String, bool>,
    #[serde(default)]
    pub privacy: BTreeMap<String, String>,
}

/// User preference document (one per user)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_id: i64,
    pub preferences: Preferences,
    /// Absent when the read projected it away
    pub updated_at: Option<DateTime<Utc>>,
}

/// One denormalized feed row: a post plus the activity that references it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedFeedItem {
    pub post_id: i64,
    /// Content preview, truncated and marked when longer than the preview limit
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub activity_count: usize,
    /// Activity kinds in event order, comma-joined, duplicates kept
    pub activity_types: String,
}
