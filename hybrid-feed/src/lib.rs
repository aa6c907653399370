//! hybrid-feed library - federated reads across a relational and a document store
//!
//! A session pairs one live handle to each store. Catalog reads run against
//! those handles, and the federation engine joins recent posts with the
//! activity events that reference them into one denormalized feed.

pub mod catalog;
pub mod federation;
pub mod render;
pub mod report;
pub mod seed;
pub mod session;
pub mod store;

pub use federation::{federate, hybrid_feed, truncate_content};
pub use report::{run_report, HybridReport, ReportOptions};
pub use session::{with_session, Session, SessionState, TeardownReport};
