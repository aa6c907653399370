//! In-memory stores for testing
//!
//! Both simulated stores answer the catalog with the same semantics as the
//! real queries, and support fault injection on open, release and individual
//! catalog operations. A shared `HandleLedger` records every open and release
//! so tests can check that no handle outlives its session.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hybrid_common::{
    ActivityEvent, EngagementMetric, Error, Post, Result, StoreKind, TimelineEntry,
    UserPreference,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::{DocumentCatalog, RelationalCatalog, StoreConnector, StoreHandle};
use crate::catalog::documents::{activity_from_document, preference_from_document};
use crate::seed::{activity_fixtures, preference_fixtures};

// =============================================================================
// Ledger and faults
// =============================================================================

/// Open/release bookkeeping shared by simulated connectors and their handles
#[derive(Debug, Default)]
pub struct HandleLedger {
    opened: AtomicUsize,
    released: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl HandleLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Handles successfully opened so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Release calls so far (failed releases included: the handle is gone either way)
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Handles currently live
    pub fn live(&self) -> usize {
        self.opened() - self.released()
    }

    /// Every open, query and release in program order, as `store.operation`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, kind: StoreKind, operation: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(format!("{}.{}", kind, operation));
        }
    }
}

/// Faults a simulated store injects
#[derive(Debug, Clone, Default)]
pub struct SimFaults {
    /// `open` fails with a connection error
    pub fail_open: bool,
    /// `release` fails (the handle is still consumed)
    pub fail_release: bool,
    /// Named catalog operation fails with a query error
    pub fail_query: Option<&'static str>,
}

// =============================================================================
// Fixtures
// =============================================================================

/// Backing data of a simulated store
pub trait Fixture: Send + Sync + 'static {
    const KIND: StoreKind;
}

/// Relational tables: users, posts, follows and likes
#[derive(Debug, Clone, Default)]
pub struct RelationalFixture {
    /// (id, name)
    pub users: Vec<(i64, String)>,
    pub posts: Vec<Post>,
    /// (follower_id, followee_id)
    pub follows: Vec<(i64, i64)>,
    /// (user_id, post_id)
    pub likes: Vec<(i64, i64)>,
}

impl Fixture for RelationalFixture {
    const KIND: StoreKind = StoreKind::Relational;
}

impl RelationalFixture {
    /// Small social graph: three users, Alice follows Bob, five posts
    pub fn sample() -> Self {
        // 2024-01-01 12:00:00 UTC
        let base = Utc.timestamp_opt(1_704_110_400, 0).single().unwrap_or_default();
        let post = |id: i64, author_id: i64, minutes: i64, content: &str| Post {
            id,
            author_id,
            content: content.to_string(),
            created_at: base + Duration::minutes(minutes),
        };

        Self {
            users: vec![
                (1, "Alice".to_string()),
                (2, "Bob".to_string()),
                (3, "Carol".to_string()),
            ],
            posts: vec![
                post(1, 1, 0, "Hello world! This is my first post."),
                post(2, 2, 10, "Welcome to my social media profile."),
                post(
                    3,
                    3,
                    20,
                    "Carol here, writing a much longer post that will not fit into a feed preview.",
                ),
                post(4, 1, 30, "Coffee first, then code."),
                post(5, 2, 40, "Bob's weekend hiking photos are up."),
            ],
            follows: vec![(1, 2), (2, 1), (3, 1)],
            likes: vec![(2, 1), (3, 1), (1, 2), (3, 4)],
        }
    }

    fn author_name(&self, user_id: i64) -> Option<&str> {
        self.users
            .iter()
            .find(|(id, _)| *id == user_id)
            .map(|(_, name)| name.as_str())
    }

    fn newest_first(&self) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self.posts.iter().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        posts
    }
}

/// Document collections: activity events and user preferences
#[derive(Debug, Clone, Default)]
pub struct DocumentFixture {
    pub events: Vec<ActivityEvent>,
    pub preferences: Vec<UserPreference>,
}

impl Fixture for DocumentFixture {
    const KIND: StoreKind = StoreKind::Document;
}

impl DocumentFixture {
    /// The seeded collections, read back through the document mappers
    pub fn sample(now: DateTime<Utc>) -> Result<Self> {
        let events = activity_fixtures(now)
            .into_iter()
            .map(|doc| activity_from_document(doc, "fixture"))
            .collect::<Result<Vec<_>>>()?;
        let preferences = preference_fixtures(now)
            .into_iter()
            .map(|doc| preference_from_document(doc, "fixture"))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            events,
            preferences,
        })
    }
}

// =============================================================================
// Connector and handle
// =============================================================================

/// Connector for a simulated store
#[derive(Debug, Clone)]
pub struct SimConnector<F: Fixture> {
    fixture: Arc<F>,
    faults: SimFaults,
    ledger: Arc<HandleLedger>,
}

impl<F: Fixture> SimConnector<F> {
    pub fn new(fixture: F) -> Self {
        Self {
            fixture: Arc::new(fixture),
            faults: SimFaults::default(),
            ledger: HandleLedger::new(),
        }
    }

    #[must_use]
    pub fn with_faults(mut self, faults: SimFaults) -> Self {
        self.faults = faults;
        self
    }

    /// Share a ledger with another connector so one log covers both stores
    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<HandleLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn ledger(&self) -> Arc<HandleLedger> {
        Arc::clone(&self.ledger)
    }
}

/// Live handle to a simulated store
#[derive(Debug)]
pub struct SimStore<F: Fixture> {
    fixture: Arc<F>,
    faults: SimFaults,
    ledger: Arc<HandleLedger>,
}

pub type SimRelationalStore = SimStore<RelationalFixture>;
pub type SimDocumentStore = SimStore<DocumentFixture>;

impl<F: Fixture> SimStore<F> {
    fn begin(&self, operation: &'static str) -> Result<()> {
        self.ledger.record(F::KIND, operation);
        if self.faults.fail_query == Some(operation) {
            return Err(Error::query(F::KIND, operation, "simulated query failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl<F: Fixture> StoreConnector for SimConnector<F> {
    type Handle = SimStore<F>;

    fn kind(&self) -> StoreKind {
        F::KIND
    }

    fn endpoint(&self) -> String {
        format!("sim://{}", F::KIND)
    }

    async fn open(&self) -> Result<Self::Handle> {
        self.ledger.record(F::KIND, "open");
        if self.faults.fail_open {
            return Err(Error::connection(F::KIND, "simulated connection refused"));
        }
        self.ledger.opened.fetch_add(1, Ordering::SeqCst);
        Ok(SimStore {
            fixture: Arc::clone(&self.fixture),
            faults: self.faults.clone(),
            ledger: Arc::clone(&self.ledger),
        })
    }
}

#[async_trait]
impl<F: Fixture> StoreHandle for SimStore<F> {
    fn kind(&self) -> StoreKind {
        F::KIND
    }

    async fn release(self) -> Result<()> {
        self.ledger.record(F::KIND, "release");
        self.ledger.released.fetch_add(1, Ordering::SeqCst);
        if self.faults.fail_release {
            return Err(Error::connection(F::KIND, "simulated release failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl RelationalCatalog for SimStore<RelationalFixture> {
    async fn recent_posts(&mut self, limit: u32) -> Result<Vec<Post>> {
        self.begin("recent_posts")?;
        Ok(self
            .fixture
            .newest_first()
            .into_iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn user_timeline(&mut self, user_id: i64, limit: u32) -> Result<Vec<TimelineEntry>> {
        self.begin("user_timeline")?;
        let fixture = &self.fixture;
        let mut authors: BTreeSet<i64> = fixture
            .follows
            .iter()
            .filter(|(follower, _)| *follower == user_id)
            .map(|(_, followee)| *followee)
            .collect();
        authors.insert(user_id);

        Ok(fixture
            .newest_first()
            .into_iter()
            .filter(|post| authors.contains(&post.author_id))
            .filter_map(|post| {
                fixture.author_name(post.author_id).map(|name| TimelineEntry {
                    id: post.id,
                    content: post.content.clone(),
                    created_at: post.created_at,
                    author_name: name.to_string(),
                })
            })
            .take(limit as usize)
            .collect())
    }

    async fn engagement_metrics(&mut self) -> Result<Vec<EngagementMetric>> {
        self.begin("engagement_metrics")?;
        let fixture = &self.fixture;
        let mut like_counts: HashMap<i64, i64> = HashMap::new();
        for (_, post_id) in &fixture.likes {
            *like_counts.entry(*post_id).or_default() += 1;
        }

        let mut metrics: Vec<EngagementMetric> = fixture
            .posts
            .iter()
            .filter_map(|post| {
                fixture.author_name(post.author_id).map(|name| EngagementMetric {
                    post_id: post.id,
                    content: post.content.clone(),
                    total_likes: like_counts.get(&post.id).copied().unwrap_or(0),
                    author_name: name.to_string(),
                })
            })
            .collect();
        metrics.sort_by(|a, b| b.total_likes.cmp(&a.total_likes).then(a.post_id.cmp(&b.post_id)));
        Ok(metrics)
    }
}

#[async_trait]
impl DocumentCatalog for SimStore<DocumentFixture> {
    async fn events_for_references(
        &mut self,
        reference_ids: &BTreeSet<i64>,
    ) -> Result<Vec<ActivityEvent>> {
        self.begin("events_for_references")?;
        let events: Vec<ActivityEvent> = self
            .fixture
            .events
            .iter()
            .filter(|e| e.reference_id.map_or(false, |id| reference_ids.contains(&id)))
            .cloned()
            .collect();
        debug!("sim: {} events for {} references", events.len(), reference_ids.len());
        Ok(events)
    }

    async fn activity_feed(&mut self, user_ids: &[i64], limit: u32) -> Result<Vec<ActivityEvent>> {
        self.begin("activity_feed")?;
        let mut events: Vec<ActivityEvent> = self
            .fixture
            .events
            .iter()
            .filter(|e| user_ids.contains(&e.user_id))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events.truncate(limit as usize);
        for event in &mut events {
            event.metadata.retain(|key, _| key == "content_preview");
        }
        Ok(events)
    }

    async fn preferences_by_theme(&mut self, theme: &str) -> Result<Vec<UserPreference>> {
        self.begin("preferences_by_theme")?;
        Ok(self
            .fixture
            .preferences
            .iter()
            .filter(|p| p.preferences.theme.as_deref() == Some(theme))
            .map(|p| {
                let mut projected = p.clone();
                projected.preferences.privacy.clear();
                projected.updated_at = None;
                projected
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relational() -> SimConnector<RelationalFixture> {
        SimConnector::new(RelationalFixture::sample())
    }

    #[tokio::test]
    async fn test_recent_posts_newest_first_with_limit() {
        let mut store = relational().open().await.unwrap();
        let posts = store.recent_posts(3).await.unwrap();
        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }

    #[tokio::test]
    async fn test_timeline_includes_followees_and_self() {
        let mut store = relational().open().await.unwrap();
        let timeline = store.user_timeline(1, 20).await.unwrap();
        let ids: Vec<i64> = timeline.iter().map(|t| t.id).collect();
        // Alice (1) follows Bob (2); Carol's post is excluded
        assert_eq!(ids, vec![5, 4, 2, 1]);
        assert_eq!(timeline[0].author_name, "Bob");
    }

    #[tokio::test]
    async fn test_engagement_most_liked_first() {
        let mut store = relational().open().await.unwrap();
        let metrics = store.engagement_metrics().await.unwrap();
        assert_eq!(metrics.len(), 5);
        assert_eq!(metrics[0].post_id, 1);
        assert_eq!(metrics[0].total_likes, 2);
        assert!(metrics.windows(2).all(|w| w[0].total_likes >= w[1].total_likes));
        let unliked = metrics.iter().find(|m| m.post_id == 5).unwrap();
        assert_eq!(unliked.total_likes, 0);
    }

    #[tokio::test]
    async fn test_ledger_tracks_open_and_release() {
        let connector = relational();
        let ledger = connector.ledger();
        let store = connector.open().await.unwrap();
        assert_eq!(ledger.live(), 1);
        store.release().await.unwrap();
        assert_eq!(ledger.live(), 0);
        assert_eq!(ledger.calls(), vec!["relational.open", "relational.release"]);
    }

    #[tokio::test]
    async fn test_injected_query_fault() {
        let connector = relational().with_faults(SimFaults {
            fail_query: Some("engagement_metrics"),
            ..Default::default()
        });
        let mut store = connector.open().await.unwrap();
        assert!(store.recent_posts(1).await.is_ok());
        let err = store.engagement_metrics().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Query { store: StoreKind::Relational, operation: "engagement_metrics", .. }
        ));
    }

    #[tokio::test]
    async fn test_document_sample_matches_seed() {
        let fixture = DocumentFixture::sample(Utc::now()).unwrap();
        assert_eq!(fixture.events.len(), 3);
        assert_eq!(fixture.preferences.len(), 2);

        let mut store = SimConnector::new(fixture).open().await.unwrap();
        let refs: BTreeSet<i64> = [1].into_iter().collect();
        let events = store.events_for_references(&refs).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.reference_id == Some(1)));

        let dark = store.preferences_by_theme("dark").await.unwrap();
        assert_eq!(dark.len(), 1);
        assert_eq!(dark[0].user_id, 1);
        assert!(dark[0].preferences.privacy.is_empty());
    }
}
