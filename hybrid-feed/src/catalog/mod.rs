//! Query catalog: named reads against each store
//!
//! Translators from request parameters to store-native queries (SQL text for
//! the relational store, filters and pipelines for the document store), plus
//! the mapping from returned documents to the shared data model. Nothing here
//! performs I/O.

pub mod documents;
pub mod sql;

/// Posts fed into the hybrid feed
pub const DEFAULT_FEED_LIMIT: u32 = 5;
/// Rows shown by the timeline and activity feed
pub const DEFAULT_LIST_LIMIT: u32 = 20;
/// User whose timeline is reported
pub const DEFAULT_TIMELINE_USER: i64 = 1;
/// Users whose activity feed is reported
pub const DEFAULT_ACTIVITY_USERS: [i64; 2] = [1, 2];
/// Theme searched for in user preferences
pub const DEFAULT_THEME: &str = "dark";
