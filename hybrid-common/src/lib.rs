//! # Hybrid Common Library
//!
//! Shared code for the hybrid social feed:
//! - Error taxonomy shared by both stores and the federation engine
//! - Connection configuration for the relational and document stores
//! - Data model for rows and documents read from either store
//! - Time helpers

pub mod config;
pub mod error;
pub mod models;
pub mod time;

pub use error::{BoxError, Error, Result, StoreKind};
pub use models::{
    ActivityEvent, ActivityKind, EngagementMetric, FederatedFeedItem, Post, TimelineEntry,
    UserPreference,
};
