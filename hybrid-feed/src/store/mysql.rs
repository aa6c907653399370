//! Relational store backed by one MySQL connection

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hybrid_common::config::RelationalConfig;
use hybrid_common::{EngagementMetric, Error, Post, Result, StoreKind, TimelineEntry};
use sqlx::mysql::{MySqlConnectOptions, MySqlRow};
use sqlx::{Connection, MySqlConnection, Row};

use super::{RelationalCatalog, StoreConnector, StoreHandle};
use crate::catalog::sql::{ENGAGEMENT_SQL, RECENT_POSTS_SQL, TIMELINE_SQL};

/// Opens MySQL connections from a `RelationalConfig`
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    config: RelationalConfig,
}

impl MySqlConnector {
    pub fn new(config: RelationalConfig) -> Self {
        Self { config }
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.config.password)
            .database(&self.config.database)
    }
}

#[async_trait]
impl StoreConnector for MySqlConnector {
    type Handle = MySqlStore;

    fn kind(&self) -> StoreKind {
        StoreKind::Relational
    }

    fn endpoint(&self) -> String {
        format!("mysql://{}", self.config.endpoint())
    }

    async fn open(&self) -> Result<MySqlStore> {
        let conn = MySqlConnection::connect_with(&self.connect_options())
            .await
            .map_err(|e| Error::connection(StoreKind::Relational, e))?;
        Ok(MySqlStore { conn })
    }
}

/// Live MySQL handle
#[derive(Debug)]
pub struct MySqlStore {
    conn: MySqlConnection,
}

#[async_trait]
impl StoreHandle for MySqlStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Relational
    }

    async fn release(self) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| Error::connection(StoreKind::Relational, e))
    }
}

#[async_trait]
impl RelationalCatalog for MySqlStore {
    async fn recent_posts(&mut self, limit: u32) -> Result<Vec<Post>> {
        let rows = sqlx::query(RECENT_POSTS_SQL)
            .bind(limit)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| Error::query(StoreKind::Relational, "recent_posts", e))?;

        rows.iter()
            .map(post_from_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::query(StoreKind::Relational, "recent_posts", e))
    }

    async fn user_timeline(&mut self, user_id: i64, limit: u32) -> Result<Vec<TimelineEntry>> {
        let rows = sqlx::query(TIMELINE_SQL)
            .bind(user_id)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| Error::query(StoreKind::Relational, "user_timeline", e))?;

        rows.iter()
            .map(timeline_from_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::query(StoreKind::Relational, "user_timeline", e))
    }

    async fn engagement_metrics(&mut self) -> Result<Vec<EngagementMetric>> {
        let rows = sqlx::query(ENGAGEMENT_SQL)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| Error::query(StoreKind::Relational, "engagement_metrics", e))?;

        rows.iter()
            .map(engagement_from_row)
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::query(StoreKind::Relational, "engagement_metrics", e))
    }
}

fn post_from_row(row: &MySqlRow) -> std::result::Result<Post, sqlx::Error> {
    Ok(Post {
        id: row.try_get("id")?,
        author_id: row.try_get("user_id")?,
        content: row.try_get("content")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn timeline_from_row(row: &MySqlRow) -> std::result::Result<TimelineEntry, sqlx::Error> {
    Ok(TimelineEntry {
        id: row.try_get("id")?,
        content: row.try_get("content")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        author_name: row.try_get("author_name")?,
    })
}

fn engagement_from_row(row: &MySqlRow) -> std::result::Result<EngagementMetric, sqlx::Error> {
    Ok(EngagementMetric {
        post_id: row.try_get("post_id")?,
        content: row.try_get("content")?,
        total_likes: row.try_get("total_likes")?,
        author_name: row.try_get("author_name")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybrid_common::config::FederationConfig;

    fn live_config() -> Option<RelationalConfig> {
        std::env::var("HYBRID_FEED_LIVE_TESTS").ok()?;
        let mut config = FederationConfig::default().relational;
        if let Ok(host) = std::env::var("MYSQL_HOST") {
            config.host = host;
        }
        if let Ok(password) = std::env::var("MYSQL_ROOT_PASSWORD") {
            config.password = password;
        }
        Some(config)
    }

    #[test]
    fn test_endpoint_hides_password() {
        let connector = MySqlConnector::new(RelationalConfig::default());
        assert_eq!(connector.endpoint(), "mysql://mysql:3306/social_hybrid");
    }

    #[tokio::test]
    async fn test_live_recent_posts() {
        // Requires a running MySQL with the social_hybrid schema
        let Some(config) = live_config() else {
            eprintln!("Skipping test: HYBRID_FEED_LIVE_TESTS not set");
            return;
        };

        let mut store = MySqlConnector::new(config)
            .open()
            .await
            .expect("Should connect to MySQL");
        let posts = store.recent_posts(5).await.expect("Should read posts");
        assert!(posts.len() <= 5);
        assert!(posts.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        store.release().await.expect("Should close connection");
    }
}
