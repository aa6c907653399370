//! SQL text for the relational catalog
//!
//! Ids and counts are cast to `SIGNED` so they always decode as 64-bit
//! integers regardless of the column width chosen by the schema.

/// Timeline of a user: own posts plus posts of everyone they follow
///
/// Binds: follower id, own id, limit.
pub const TIMELINE_SQL: &str = r#"
    SELECT CAST(p.id AS SIGNED) AS id, p.content, p.created_at, u.name AS author_name
    FROM Post p
    JOIN User u ON p.user_id = u.id
    WHERE p.user_id IN (
        SELECT followee_id FROM Follow WHERE follower_id = ?
        UNION SELECT ?
    )
    ORDER BY p.created_at DESC
    LIMIT ?
"#;

/// Like count per post, most liked first
pub const ENGAGEMENT_SQL: &str = r#"
    SELECT CAST(p.id AS SIGNED) AS post_id, p.content,
           CAST(COUNT(pl.post_id) AS SIGNED) AS total_likes, u.name AS author_name
    FROM Post p
    LEFT JOIN PostLike pl ON p.id = pl.post_id
    JOIN User u ON p.user_id = u.id
    GROUP BY p.id, p.content, u.name
    ORDER BY total_likes DESC
"#;

/// Most recent posts
///
/// Binds: limit.
pub const RECENT_POSTS_SQL: &str = r#"
    SELECT CAST(id AS SIGNED) AS id, content, CAST(user_id AS SIGNED) AS user_id, created_at
    FROM Post
    ORDER BY created_at DESC
    LIMIT ?
"#;

/// Number of `?` placeholders in a statement
pub fn placeholder_count(sql: &str) -> usize {
    sql.matches('?').count()
}
