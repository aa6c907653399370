//! Federation engine: joins relational posts with document-store activity
//!
//! The join is post-driven. Every post yields exactly one feed item, in the
//! order the posts were given (newest first). Events are grouped once by
//! reference id; an event whose reference id matches no post is left out of
//! the output. Nothing here performs I/O except `hybrid_feed`, which gathers
//! both inputs from a live session before joining them.

use hybrid_common::{ActivityEvent, Error, FederatedFeedItem, Post, Result};
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::session::Session;
use crate::store::{DocumentCatalog, RelationalCatalog};

/// Characters of post content kept in a feed item
pub const CONTENT_PREVIEW_CHARS: usize = 50;
/// Appended to content cut at the preview limit
pub const TRUNCATION_MARKER: &str = "...";
/// Joins activity kinds within one feed item
pub const ACTIVITY_TYPE_SEPARATOR: &str = ", ";

/// Cut content to the preview limit, marking it when anything was removed
///
/// Counts characters, not bytes. Content at or under the limit comes back
/// borrowed and unmarked, and truncating an already truncated preview
/// returns it unchanged.
pub fn truncate_content(content: &str) -> Cow<'_, str> {
    match content.char_indices().nth(CONTENT_PREVIEW_CHARS) {
        None => Cow::Borrowed(content),
        Some((cut, _)) => Cow::Owned(format!("{}{}", &content[..cut], TRUNCATION_MARKER)),
    }
}

/// Group events by reference id, keeping their given order within a group
fn group_by_reference(events: &[ActivityEvent]) -> Result<HashMap<i64, Vec<&ActivityEvent>>> {
    let mut groups: HashMap<i64, Vec<&ActivityEvent>> = HashMap::new();
    for (position, event) in events.iter().enumerate() {
        let reference_id = event.reference_id.ok_or_else(|| {
            Error::Validation(format!(
                "activity event at position {} ({}, user {}) has no reference_id",
                position, event.kind, event.user_id
            ))
        })?;
        groups.entry(reference_id).or_default().push(event);
    }
    Ok(groups)
}

/// Join posts with the events that reference them
///
/// Fails with `Error::Validation` when an event has no reference id or when
/// a post id appears twice (either would make the per-post count ambiguous).
pub fn federate(posts: &[Post], events: &[ActivityEvent]) -> Result<Vec<FederatedFeedItem>> {
    let groups = group_by_reference(events)?;
    let mut seen = HashSet::with_capacity(posts.len());

    let items = posts
        .iter()
        .map(|post| {
            if !seen.insert(post.id) {
                return Err(Error::Validation(format!(
                    "post {} appears more than once in the federation input",
                    post.id
                )));
            }
            let group = groups.get(&post.id).map(Vec::as_slice).unwrap_or(&[]);
            Ok(FederatedFeedItem {
                post_id: post.id,
                content: truncate_content(&post.content).into_owned(),
                created_at: post.created_at,
                activity_count: group.len(),
                activity_types: group
                    .iter()
                    .map(|event| event.kind.as_str())
                    .collect::<Vec<_>>()
                    .join(ACTIVITY_TYPE_SEPARATOR),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Federated {} posts with {} events ({} reference groups)",
        posts.len(),
        events.len(),
        groups.len()
    );
    Ok(items)
}

/// Recent posts from the relational store joined with their activity
///
/// Both inputs are fully read before the join. With no posts the document
/// store is not queried.
pub async fn hybrid_feed<R, D>(session: &mut Session<R, D>, limit: u32) -> Result<Vec<FederatedFeedItem>>
where
    R: RelationalCatalog,
    D: DocumentCatalog,
{
    let posts = session.relational()?.recent_posts(limit).await?;
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let reference_ids: BTreeSet<i64> = posts.iter().map(|post| post.id).collect();
    let events = session
        .document()?
        .events_for_references(&reference_ids)
        .await?;

    federate(&posts, &events)
}
