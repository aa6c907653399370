//! Filters, pipelines and document mappers for the document catalog

use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use hybrid_common::models::Preferences;
use hybrid_common::{ActivityEvent, ActivityKind, Error, Result, StoreKind, UserPreference};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

pub const ACTIVITY_COLLECTION: &str = "ActivityFeed";
pub const PREFERENCES_COLLECTION: &str = "UserPreferences";

/// Events whose `reference_id` is one of `ids`
pub fn reference_filter(ids: &BTreeSet<i64>) -> Document {
    let ids: Vec<Bson> = ids.iter().map(|id| Bson::Int64(*id)).collect();
    doc! { "reference_id": { "$in": ids } }
}

/// Latest activity of `user_ids`, newest first, with a trimmed metadata map
pub fn activity_feed_pipeline(user_ids: &[i64], limit: u32) -> Vec<Document> {
    let users: Vec<Bson> = user_ids.iter().map(|id| Bson::Int64(*id)).collect();
    vec![
        doc! { "$match": { "user_id": { "$in": users } } },
        doc! { "$sort": { "timestamp": -1 } },
        doc! { "$limit": i64::from(limit) },
        doc! {
            "$project": {
                "user_id": 1,
                "activity_type": 1,
                "reference_id": 1,
                "timestamp": 1,
                "metadata.content_preview": 1,
            }
        },
    ]
}

/// Preference documents whose theme equals `theme`
pub fn theme_filter(theme: &str) -> Document {
    doc! { "preferences.theme": theme }
}

/// Fields returned by the theme search
pub fn preference_projection() -> Document {
    doc! {
        "user_id": 1,
        "preferences.theme": 1,
        "preferences.language": 1,
        "preferences.notifications": 1,
    }
}

/// Map an `ActivityFeed` document to an event
///
/// A missing `reference_id` is kept as `None`; the federation engine decides
/// whether that is acceptable. Missing identity fields are a query error.
pub fn activity_from_document(doc: Document, operation: &'static str) -> Result<ActivityEvent> {
    let user_id = require_int(&doc, "user_id", operation)?;
    let kind = match doc.get("activity_type") {
        Some(Bson::String(kind)) => ActivityKind::from(kind.as_str()),
        _ => return Err(mapping_error(operation, "activity_type", "a string")),
    };
    let reference_id = match doc.get("reference_id") {
        None | Some(Bson::Null) => None,
        Some(_) => Some(require_int(&doc, "reference_id", operation)?),
    };
    let timestamp = match doc.get("timestamp") {
        Some(Bson::DateTime(ts)) => ts.to_chrono(),
        _ => return Err(mapping_error(operation, "timestamp", "a date")),
    };
    let metadata = match doc.get("metadata") {
        None | Some(Bson::Null) => Map::new(),
        Some(Bson::Document(meta)) => match Bson::Document(meta.clone()).into_relaxed_extjson() {
            Value::Object(map) => map,
            _ => Map::new(),
        },
        Some(_) => return Err(mapping_error(operation, "metadata", "a document")),
    };

    Ok(ActivityEvent {
        id: doc.get_object_id("_id").ok().map(|oid| oid.to_hex()),
        user_id,
        kind,
        reference_id,
        timestamp,
        metadata,
    })
}

/// Map a `UserPreferences` document to a preference record
pub fn preference_from_document(doc: Document, operation: &'static str) -> Result<UserPreference> {
    let user_id = require_int(&doc, "user_id", operation)?;
    let preferences = match doc.get("preferences") {
        None | Some(Bson::Null) => Preferences::default(),
        Some(Bson::Document(prefs)) => Preferences {
            theme: prefs.get_str("theme").ok().map(str::to_string),
            language: prefs.get_str("language").ok().map(str::to_string),
            notifications: prefs
                .get_document("notifications")
                .map(|n| {
                    n.iter()
                        .filter_map(|(k, v)| v.as_bool().map(|b| (k.clone(), b)))
                        .collect()
                })
                .unwrap_or_default(),
            privacy: prefs
                .get_document("privacy")
                .map(|p| {
                    p.iter()
                        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                        .collect::<BTreeMap<_, _>>()
                })
                .unwrap_or_default(),
        },
        Some(_) => return Err(mapping_error(operation, "preferences", "a document")),
    };
    let updated_at: Option<DateTime<Utc>> = match doc.get("updated_at") {
        Some(Bson::DateTime(ts)) => Some(ts.to_chrono()),
        _ => None,
    };

    Ok(UserPreference {
        user_id,
        preferences,
        updated_at,
    })
}

/// Integer field stored as int32, int64 or an integral double
fn require_int(doc: &Document, field: &'static str, operation: &'static str) -> Result<i64> {
    match doc.get(field) {
        Some(Bson::Int32(v)) => Ok(i64::from(*v)),
        Some(Bson::Int64(v)) => Ok(*v),
        Some(Bson::Double(v)) if v.fract() == 0.0 && v.is_finite() => Ok(*v as i64),
        _ => Err(mapping_error(operation, field, "an integer")),
    }
}

fn mapping_error(operation: &'static str, field: &str, expected: &str) -> Error {
    Error::query(
        StoreKind::Document,
        operation,
        format!("field '{}' missing or not {}", field, expected),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    fn event_doc() -> Document {
        doc! {
            "_id": ObjectId::new(),
            "user_id": 2_i32,
            "activity_type": "post_liked",
            "reference_id": 1_i32,
            "timestamp": bson::DateTime::from_millis(1_700_000_000_000),
            "metadata": { "liked_user_id": 1_i32 },
        }
    }

    #[test]
    fn test_reference_filter_uses_in() {
        let ids: BTreeSet<i64> = [3, 1, 2].into_iter().collect();
        let filter = reference_filter(&ids);
        let inner = filter.get_document("reference_id").unwrap();
        let values = inner.get_array("$in").unwrap();
        assert_eq!(values, &vec![Bson::Int64(1), Bson::Int64(2), Bson::Int64(3)]);
    }

    #[test]
    fn test_activity_pipeline_stages_in_order() {
        let pipeline = activity_feed_pipeline(&[1, 2], 20);
        let stages: Vec<&str> = pipeline
            .iter()
            .map(|stage| stage.keys().next().unwrap().as_str())
            .collect();
        assert_eq!(stages, vec!["$match", "$sort", "$limit", "$project"]);
        let sort = pipeline[1].get_document("$sort").unwrap();
        assert_eq!(sort.get_i32("timestamp").unwrap(), -1);
        assert_eq!(pipeline[2].get_i64("$limit").unwrap(), 20);
    }

    #[test]
    fn test_theme_filter_and_projection() {
        assert_eq!(theme_filter("dark"), doc! { "preferences.theme": "dark" });
        let projection = preference_projection();
        assert!(projection.contains_key("preferences.notifications"));
        assert!(!projection.contains_key("preferences.privacy"));
    }

    #[test]
    fn test_activity_mapping() {
        let event = activity_from_document(event_doc(), "test").unwrap();
        assert_eq!(event.user_id, 2);
        assert_eq!(event.kind, ActivityKind::PostLiked);
        assert_eq!(event.reference_id, Some(1));
        assert_eq!(event.timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(event.metadata.get("liked_user_id"), Some(&Value::from(1)));
        assert!(event.id.is_some());
    }

    #[test]
    fn test_missing_reference_id_maps_to_none() {
        let mut doc = event_doc();
        doc.remove("reference_id");
        let event = activity_from_document(doc, "test").unwrap();
        assert_eq!(event.reference_id, None);
    }

    #[test]
    fn test_missing_user_id_is_query_error() {
        let mut doc = event_doc();
        doc.remove("user_id");
        let err = activity_from_document(doc, "activity_feed").unwrap_err();
        assert!(matches!(
            err,
            Error::Query { store: StoreKind::Document, operation: "activity_feed", .. }
        ));
    }

    #[test]
    fn test_string_reference_id_is_query_error() {
        let mut doc = event_doc();
        doc.insert("reference_id", "1");
        assert!(activity_from_document(doc, "test").is_err());
    }

    #[test]
    fn test_preference_mapping_projected() {
        let doc = doc! {
            "user_id": 1_i32,
            "preferences": {
                "theme": "dark",
                "language": "en",
                "notifications": { "likes": true, "comments": true, "follows": false },
            },
        };
        let pref = preference_from_document(doc, "test").unwrap();
        assert_eq!(pref.user_id, 1);
        assert_eq!(pref.preferences.theme.as_deref(), Some("dark"));
        assert_eq!(pref.preferences.notifications.get("follows"), Some(&false));
        assert!(pref.preferences.privacy.is_empty());
        assert!(pref.updated_at.is_none());
    }
}
