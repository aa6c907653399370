use chrono::{Duration, TimeZone, Utc};
use hybrid_common::{ActivityEvent, ActivityKind, Post};
use hybrid_feed::federation::{CONTENT_PREVIEW_CHARS, TRUNCATION_MARKER};
use hybrid_feed::{federate, truncate_content};
use proptest::prelude::*;
use serde_json::Map;
use std::collections::BTreeSet;

fn posts_from(ids: &BTreeSet<i64>, content: &str) -> Vec<Post> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    // Newest first, as the relational store returns them
    ids.iter()
        .rev()
        .map(|&id| Post {
            id,
            author_id: 1,
            content: content.to_string(),
            created_at: base + Duration::seconds(id),
        })
        .collect()
}

fn events_from(refs: &[(i64, u8)]) -> Vec<ActivityEvent> {
    let kinds = ["post_created", "post_liked", "post_commented", "user_followed"];
    refs.iter()
        .map(|&(reference_id, kind)| ActivityEvent {
            id: None,
            user_id: 1,
            kind: ActivityKind::from(kinds[kind as usize % kinds.len()]),
            reference_id: Some(reference_id),
            timestamp: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            metadata: Map::new(),
        })
        .collect()
}

proptest! {
    #[test]
    fn one_item_per_post_in_input_order(
        ids in prop::collection::btree_set(1i64..40, 0..12),
        refs in prop::collection::vec((1i64..60, any::<u8>()), 0..40),
    ) {
        let posts = posts_from(&ids, "body");
        let feed = federate(&posts, &events_from(&refs)).unwrap();

        let expected: Vec<i64> = posts.iter().map(|p| p.id).collect();
        let actual: Vec<i64> = feed.iter().map(|item| item.post_id).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn counts_match_referencing_events(
        ids in prop::collection::btree_set(1i64..40, 1..12),
        refs in prop::collection::vec((1i64..60, any::<u8>()), 0..40),
    ) {
        let posts = posts_from(&ids, "body");
        let feed = federate(&posts, &events_from(&refs)).unwrap();

        for item in &feed {
            let expected = refs.iter().filter(|(r, _)| *r == item.post_id).count();
            prop_assert_eq!(item.activity_count, expected);
            let listed = if item.activity_types.is_empty() {
                0
            } else {
                item.activity_types.split(", ").count()
            };
            prop_assert_eq!(listed, expected);
        }

        // Events for unknown posts never surface
        let joined: usize = feed.iter().map(|item| item.activity_count).sum();
        let matching = refs.iter().filter(|(r, _)| ids.contains(r)).count();
        prop_assert_eq!(joined, matching);
    }

    #[test]
    fn truncation_is_bounded_and_idempotent(s in "\\PC{0,120}") {
        let once = truncate_content(&s).into_owned();
        prop_assert!(once.chars().count() <= CONTENT_PREVIEW_CHARS + TRUNCATION_MARKER.len());
        prop_assert_eq!(truncate_content(&once).into_owned(), once.clone());

        if s.chars().count() <= CONTENT_PREVIEW_CHARS {
            prop_assert_eq!(once, s);
        } else {
            prop_assert!(once.ends_with(TRUNCATION_MARKER));
        }
    }
}
