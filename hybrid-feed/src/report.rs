//! Report runner: every catalog read plus the hybrid feed, in program order

use hybrid_common::{
    ActivityEvent, EngagementMetric, FederatedFeedItem, Result, TimelineEntry, UserPreference,
};
use serde::Serialize;
use tracing::info;

use crate::catalog::{
    DEFAULT_ACTIVITY_USERS, DEFAULT_FEED_LIMIT, DEFAULT_LIST_LIMIT, DEFAULT_THEME,
    DEFAULT_TIMELINE_USER,
};
use crate::federation::hybrid_feed;
use crate::session::Session;
use crate::store::{DocumentCatalog, RelationalCatalog};

/// Parameters of one report run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    pub timeline_user: i64,
    pub timeline_limit: u32,
    pub activity_users: Vec<i64>,
    pub activity_limit: u32,
    pub theme: String,
    pub feed_limit: u32,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            timeline_user: DEFAULT_TIMELINE_USER,
            timeline_limit: DEFAULT_LIST_LIMIT,
            activity_users: DEFAULT_ACTIVITY_USERS.to_vec(),
            activity_limit: DEFAULT_LIST_LIMIT,
            theme: DEFAULT_THEME.to_string(),
            feed_limit: DEFAULT_FEED_LIMIT,
        }
    }
}

/// Results of one report run
#[derive(Debug, Clone, Serialize)]
pub struct HybridReport {
    pub timeline: Vec<TimelineEntry>,
    pub engagement: Vec<EngagementMetric>,
    pub activity: Vec<ActivityEvent>,
    pub themed_preferences: Vec<UserPreference>,
    pub feed: Vec<FederatedFeedItem>,
}

/// Run every read of the report against an established session
///
/// All-or-nothing: the first failing read aborts the run and sections
/// already read are discarded.
pub async fn run_report<R, D>(session: &mut Session<R, D>, options: &ReportOptions) -> Result<HybridReport>
where
    R: RelationalCatalog,
    D: DocumentCatalog,
{
    info!("Executing hybrid database queries");

    let timeline = session
        .relational()?
        .user_timeline(options.timeline_user, options.timeline_limit)
        .await?;
    let engagement = session.relational()?.engagement_metrics().await?;
    let activity = session
        .document()?
        .activity_feed(&options.activity_users, options.activity_limit)
        .await?;
    let themed_preferences = session
        .document()?
        .preferences_by_theme(&options.theme)
        .await?;
    let feed = hybrid_feed(session, options.feed_limit).await?;

    info!(
        "Report complete: {} timeline, {} engagement, {} activity, {} preference, {} feed rows",
        timeline.len(),
        engagement.len(),
        activity.len(),
        themed_preferences.len(),
        feed.len()
    );

    Ok(HybridReport {
        timeline,
        engagement,
        activity,
        themed_preferences,
        feed,
    })
}
