//! Fixture documents for initializing the document store
//!
//! `hybrid-feed seed` clears both collections and repopulates them with these
//! documents, then (re)creates the indexes the catalog reads rely on.

use bson::{doc, Document};
use chrono::{DateTime, Utc};

/// Index key specs for the `ActivityFeed` collection
pub fn activity_indexes() -> Vec<Document> {
    vec![
        doc! { "user_id": 1, "timestamp": -1 },
        doc! { "activity_type": 1 },
    ]
}

/// Index key specs for the `UserPreferences` collection
pub fn preference_indexes() -> Vec<Document> {
    vec![
        doc! { "preferences.theme": "text", "preferences.language": "text" },
        doc! { "user_id": 1 },
    ]
}

/// Activity events for the sample users, all stamped `now`
pub fn activity_fixtures(now: DateTime<Utc>) -> Vec<Document> {
    let ts = bson::DateTime::from_chrono(now);
    vec![
        doc! {
            "user_id": 1_i64,
            "activity_type": "post_created",
            "reference_id": 1_i64,
            "timestamp": ts,
            "metadata": { "content_preview": "Hello world! This is my first post." },
        },
        doc! {
            "user_id": 2_i64,
            "activity_type": "post_liked",
            "reference_id": 1_i64,
            "timestamp": ts,
            "metadata": { "liked_user_id": 1_i64 },
        },
        doc! {
            "user_id": 2_i64,
            "activity_type": "post_created",
            "reference_id": 2_i64,
            "timestamp": ts,
            "metadata": { "content_preview": "Welcome to my social media profile." },
        },
    ]
}

/// One preference document per sample user
pub fn preference_fixtures(now: DateTime<Utc>) -> Vec<Document> {
    let ts = bson::DateTime::from_chrono(now);
    vec![
        doc! {
            "user_id": 1_i64,
            "preferences": {
                "theme": "dark",
                "language": "en",
                "notifications": { "likes": true, "comments": true, "follows": false },
                "privacy": { "profile_visibility": "public", "activity_visibility": "friends" },
            },
            "updated_at": ts,
        },
        doc! {
            "user_id": 2_i64,
            "preferences": {
                "theme": "light",
                "language": "es",
                "notifications": { "likes": false, "comments": true, "follows": true },
                "privacy": { "profile_visibility": "private", "activity_visibility": "private" },
            },
            "updated_at": ts,
        },
    ]
}

/// Documents written by one seeding run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub activities: usize,
    pub preferences: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_counts() {
        let now = Utc::now();
        assert_eq!(activity_fixtures(now).len(), 3);
        assert_eq!(preference_fixtures(now).len(), 2);
    }

    #[test]
    fn test_every_activity_references_a_post() {
        for doc in activity_fixtures(Utc::now()) {
            assert!(doc.get_i64("reference_id").is_ok());
            assert!(doc.get_str("activity_type").is_ok());
        }
    }

    #[test]
    fn test_one_preference_document_per_user() {
        let users: Vec<i64> = preference_fixtures(Utc::now())
            .iter()
            .map(|d| d.get_i64("user_id").unwrap())
            .collect();
        assert_eq!(users, vec![1, 2]);
    }

    #[test]
    fn test_index_specs() {
        assert_eq!(activity_indexes().len(), 2);
        let text = &preference_indexes()[0];
        assert_eq!(text.get_str("preferences.theme").unwrap(), "text");
    }
}
