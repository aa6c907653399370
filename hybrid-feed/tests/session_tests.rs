//! Integration tests for sessions, the report runner and rendering
//!
//! Tests cover:
//! - Full report over the sample stores
//! - Teardown after a read fails mid-report
//! - Handle conservation across every injected fault
//! - Live stores (skipped unless HYBRID_FEED_LIVE_TESTS is set)

use chrono::Utc;
use hybrid_common::config::{DocumentConfig, RelationalConfig};
use hybrid_common::{Error, StoreKind};
use hybrid_feed::render::render_report;
use hybrid_feed::store::{
    DocumentFixture, HandleLedger, MongoConnector, MySqlConnector, RelationalFixture,
    SimConnector, SimFaults,
};
use hybrid_feed::{hybrid_feed, run_report, with_session, ReportOptions, Session};
use proptest::prelude::*;
use std::sync::Arc;

/// Test helper: both sample stores sharing one ledger
fn sample_connectors(
    rel_faults: SimFaults,
    doc_faults: SimFaults,
) -> (
    SimConnector<RelationalFixture>,
    SimConnector<DocumentFixture>,
    Arc<HandleLedger>,
) {
    let ledger = HandleLedger::new();
    let documents = DocumentFixture::sample(Utc::now()).expect("Should build document fixture");
    let rel = SimConnector::new(RelationalFixture::sample())
        .with_faults(rel_faults)
        .with_ledger(ledger.clone());
    let doc = SimConnector::new(documents)
        .with_faults(doc_faults)
        .with_ledger(ledger.clone());
    (rel, doc, ledger)
}

// =============================================================================
// Report
// =============================================================================

#[tokio::test]
async fn test_full_report_over_sample_stores() {
    let (rel, doc, ledger) = sample_connectors(SimFaults::default(), SimFaults::default());
    let options = ReportOptions::default();

    let report = with_session(&rel, &doc, move |session| {
        Box::pin(async move { run_report(session, &options).await })
    })
    .await
    .expect("Report should succeed");

    let timeline: Vec<i64> = report.timeline.iter().map(|t| t.id).collect();
    assert_eq!(timeline, vec![5, 4, 2, 1]);

    assert_eq!(report.engagement.len(), 5);
    assert_eq!(report.engagement[0].post_id, 1);
    assert_eq!(report.engagement[0].total_likes, 2);

    assert_eq!(report.activity.len(), 3);
    assert_eq!(report.themed_preferences.len(), 1);
    assert_eq!(report.themed_preferences[0].user_id, 1);

    let feed: Vec<(i64, usize)> = report
        .feed
        .iter()
        .map(|item| (item.post_id, item.activity_count))
        .collect();
    assert_eq!(feed, vec![(5, 0), (4, 0), (3, 0), (2, 1), (1, 2)]);
    assert_eq!(report.feed[4].activity_types, "post_created, post_liked");
    assert_eq!(report.feed[3].activity_types, "post_created");
    assert!(report.feed[2].content.ends_with("..."));

    assert_eq!(ledger.live(), 0);
    assert_eq!(ledger.released(), 2);
}

#[tokio::test]
async fn test_report_renders_every_section() {
    let (rel, doc, _ledger) = sample_connectors(SimFaults::default(), SimFaults::default());
    let options = ReportOptions::default();
    let report = with_session(&rel, &doc, move |session| {
        Box::pin(async move { run_report(session, &options).await })
    })
    .await
    .expect("Report should succeed");

    let mut out = Vec::new();
    render_report(&report, &mut out).expect("Should render");
    let text = String::from_utf8(out).expect("Should be UTF-8");

    assert!(text.contains("User Timeline"));
    assert!(text.contains("Post Engagement Metrics"));
    assert!(text.contains("User Activity Feed"));
    assert!(text.contains("Users with Theme Preference"));
    assert!(text.contains("Hybrid Feed"));
    assert!(text.contains("post_created, post_liked"));
}

#[tokio::test]
async fn test_report_aborts_and_tears_down_on_document_failure() {
    let fail = SimFaults {
        fail_query: Some("preferences_by_theme"),
        ..Default::default()
    };
    let (rel, doc, ledger) = sample_connectors(SimFaults::default(), fail);
    let options = ReportOptions::default();

    let err = with_session(&rel, &doc, move |session| {
        Box::pin(async move { run_report(session, &options).await })
    })
    .await
    .expect_err("Report should fail");

    assert!(matches!(
        err,
        Error::Query { store: StoreKind::Document, operation: "preferences_by_theme", .. }
    ));
    assert_eq!(ledger.live(), 0);
    // The hybrid feed never ran
    assert!(!ledger.calls().iter().any(|c| c == "relational.recent_posts"));
}

#[tokio::test]
async fn test_hybrid_feed_skips_document_store_without_posts() {
    let (_, doc, ledger) = sample_connectors(SimFaults::default(), SimFaults::default());
    let rel = SimConnector::new(RelationalFixture::default()).with_ledger(ledger.clone());

    let mut session = Session::establish(&rel, &doc).await.expect("Should establish");
    let feed = hybrid_feed(&mut session, 5).await.expect("Feed should succeed");
    assert!(feed.is_empty());
    assert!(!ledger.calls().iter().any(|c| c == "document.events_for_references"));

    let report = session.teardown().await;
    assert!(report.is_clean());
}

// =============================================================================
// Handle conservation
// =============================================================================

fn fault_strategy() -> impl Strategy<Value = SimFaults> {
    (
        any::<bool>(),
        any::<bool>(),
        prop::sample::select(vec![
            None,
            Some("recent_posts"),
            Some("user_timeline"),
            Some("engagement_metrics"),
            Some("events_for_references"),
            Some("activity_feed"),
            Some("preferences_by_theme"),
        ]),
    )
        .prop_map(|(fail_open, fail_release, fail_query)| SimFaults {
            fail_open,
            fail_release,
            fail_query,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn no_handle_outlives_a_session(rel_faults in fault_strategy(), doc_faults in fault_strategy()) {
        let runtime = tokio::runtime::Runtime::new().expect("Should build runtime");
        let (rel, doc, ledger) = sample_connectors(rel_faults.clone(), doc_faults.clone());
        let options = ReportOptions::default();

        let result = runtime.block_on(with_session(&rel, &doc, move |session| {
            Box::pin(async move { run_report(session, &options).await })
        }));

        prop_assert_eq!(ledger.live(), 0);
        prop_assert_eq!(ledger.opened(), ledger.released());

        let clean = !rel_faults.fail_open
            && !doc_faults.fail_open
            && rel_faults.fail_query.is_none()
            && doc_faults.fail_query.is_none();
        // Release failures are logged, never surfaced
        prop_assert_eq!(result.is_ok(), clean);
    }
}

// =============================================================================
// Live stores
// =============================================================================

fn live_tests_enabled() -> bool {
    std::env::var("HYBRID_FEED_LIVE_TESTS").is_ok()
}

#[tokio::test]
async fn test_live_report() {
    if !live_tests_enabled() {
        eprintln!("Skipping test: HYBRID_FEED_LIVE_TESTS not set");
        return;
    }

    let document = DocumentConfig {
        username: std::env::var("MONGO_INITDB_ROOT_USERNAME").ok(),
        password: std::env::var("MONGO_INITDB_ROOT_PASSWORD").ok(),
        ..DocumentConfig::default()
    };
    let rel = MySqlConnector::new(RelationalConfig::default());
    let doc = MongoConnector::new(document);
    let options = ReportOptions::default();

    let report = with_session(&rel, &doc, move |session| {
        Box::pin(async move { run_report(session, &options).await })
    })
    .await
    .expect("Live report should succeed");

    assert!(report.feed.len() <= 5);
    for item in &report.feed {
        assert!(item.content.chars().count() <= 53);
    }
}
