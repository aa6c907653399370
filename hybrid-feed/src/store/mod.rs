//! Store seams consumed by the session manager and the federation engine
//!
//! Each backing store is reached through a connector (opens a handle) and a
//! handle (runs catalog reads, then is released exactly once). Catalog reads
//! take `&mut self`: a handle is single-owner and single-flight.

use async_trait::async_trait;
use hybrid_common::{
    ActivityEvent, EngagementMetric, Post, Result, StoreKind, TimelineEntry, UserPreference,
};
use std::collections::BTreeSet;

pub mod mongo;
pub mod mysql;
pub mod sim;

pub use mongo::{MongoConnector, MongoStore};
pub use mysql::{MySqlConnector, MySqlStore};
pub use sim::{DocumentFixture, HandleLedger, RelationalFixture, SimConnector, SimDocumentStore, SimFaults, SimRelationalStore};

/// Live connection to one backing store
#[async_trait]
pub trait StoreHandle: Send + Sized {
    /// Store this handle talks to
    fn kind(&self) -> StoreKind;

    /// Release the underlying connection
    ///
    /// Consumes the handle: whatever the outcome, it cannot be used again.
    async fn release(self) -> Result<()>;
}

/// Opens handles to one backing store
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Handle: StoreHandle;

    /// Store this connector opens
    fn kind(&self) -> StoreKind;

    /// Credential-free address for log lines
    fn endpoint(&self) -> String;

    /// Open a live handle, or fail with `Error::Connection`
    async fn open(&self) -> Result<Self::Handle>;
}

/// Read operations against the relational store
#[async_trait]
pub trait RelationalCatalog: StoreHandle {
    /// Most recent posts, newest first
    async fn recent_posts(&mut self, limit: u32) -> Result<Vec<Post>>;

    /// Posts by the user and everyone the user follows, newest first
    async fn user_timeline(&mut self, user_id: i64, limit: u32) -> Result<Vec<TimelineEntry>>;

    /// Every post with its like count, most liked first
    async fn engagement_metrics(&mut self) -> Result<Vec<EngagementMetric>>;
}

/// Read operations against the document store
#[async_trait]
pub trait DocumentCatalog: StoreHandle {
    /// Exactly the events whose reference id is in `reference_ids`, unordered
    async fn events_for_references(
        &mut self,
        reference_ids: &BTreeSet<i64>,
    ) -> Result<Vec<ActivityEvent>>;

    /// Latest activity of the given users, newest first
    async fn activity_feed(&mut self, user_ids: &[i64], limit: u32) -> Result<Vec<ActivityEvent>>;

    /// Users whose preferred theme equals `theme`
    async fn preferences_by_theme(&mut self, theme: &str) -> Result<Vec<UserPreference>>;
}
