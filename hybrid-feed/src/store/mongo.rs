//! Document store backed by a MongoDB client

use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use hybrid_common::config::DocumentConfig;
use hybrid_common::{ActivityEvent, Error, Result, StoreKind, UserPreference};
use mongodb::options::{ClientOptions, Credential, FindOptions, ServerAddress};
use mongodb::{Client, Collection, Database, IndexModel};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info};

use super::{DocumentCatalog, StoreConnector, StoreHandle};
use crate::catalog::documents::{
    activity_feed_pipeline, activity_from_document, preference_from_document,
    preference_projection, reference_filter, theme_filter, ACTIVITY_COLLECTION,
    PREFERENCES_COLLECTION,
};
use crate::seed::{
    activity_fixtures, activity_indexes, preference_fixtures, preference_indexes, SeedSummary,
};

/// Upper bound on server selection while opening a handle
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens MongoDB clients from a `DocumentConfig`
#[derive(Debug, Clone)]
pub struct MongoConnector {
    config: DocumentConfig,
}

impl MongoConnector {
    pub fn new(config: DocumentConfig) -> Self {
        Self { config }
    }

    fn client_options(&self) -> ClientOptions {
        let config = &self.config;
        let mut options = ClientOptions::default();
        options.hosts = vec![ServerAddress::Tcp {
            host: config.host.clone(),
            port: Some(config.port),
        }];
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        if config.auth_enabled {
            let mut credential = Credential::default();
            credential.username = config.username.clone();
            credential.password = config.password.clone();
            credential.source = Some(config.auth_source.clone());
            options.credential = Some(credential);
        }
        options
    }
}

#[async_trait]
impl StoreConnector for MongoConnector {
    type Handle = MongoStore;

    fn kind(&self) -> StoreKind {
        StoreKind::Document
    }

    fn endpoint(&self) -> String {
        format!("mongodb://{}", self.config.endpoint())
    }

    async fn open(&self) -> Result<MongoStore> {
        let client = Client::with_options(self.client_options())
            .map_err(|e| Error::connection(StoreKind::Document, e))?;
        let db = client.database(&self.config.database);

        // The driver connects lazily; a ping surfaces unreachable hosts and
        // rejected credentials here instead of on the first catalog read.
        if let Err(e) = db.run_command(doc! { "ping": 1 }, None).await {
            client.shutdown().await;
            return Err(Error::connection(StoreKind::Document, e));
        }

        Ok(MongoStore { client, db })
    }
}

/// Live MongoDB handle
#[derive(Debug)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }

    async fn find_all(
        &self,
        collection: &str,
        filter: Document,
        options: Option<FindOptions>,
        operation: &'static str,
    ) -> Result<Vec<Document>> {
        let cursor = self
            .collection(collection)
            .find(filter, options)
            .await
            .map_err(|e| Error::query(StoreKind::Document, operation, e))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| Error::query(StoreKind::Document, operation, e))
    }

    /// Clear and repopulate both collections, then create their indexes
    pub async fn seed(&mut self) -> Result<SeedSummary> {
        let now = hybrid_common::time::now();
        let activities =
            reset_collection(&self.collection(ACTIVITY_COLLECTION), activity_fixtures(now)).await?;
        for keys in activity_indexes() {
            create_index(&self.collection(ACTIVITY_COLLECTION), keys).await?;
        }
        info!("ActivityFeed initialized with {} documents", activities);

        let preferences = reset_collection(
            &self.collection(PREFERENCES_COLLECTION),
            preference_fixtures(now),
        )
        .await?;
        for keys in preference_indexes() {
            create_index(&self.collection(PREFERENCES_COLLECTION), keys).await?;
        }
        info!("UserPreferences initialized with {} documents", preferences);

        Ok(SeedSummary {
            activities,
            preferences,
        })
    }
}

async fn reset_collection(collection: &Collection<Document>, docs: Vec<Document>) -> Result<usize> {
    let deleted = collection
        .delete_many(doc! {}, None)
        .await
        .map_err(|e| Error::query(StoreKind::Document, "seed", e))?;
    debug!(
        "Cleared {} documents from {}",
        deleted.deleted_count,
        collection.name()
    );

    let inserted = collection
        .insert_many(docs, None)
        .await
        .map_err(|e| Error::query(StoreKind::Document, "seed", e))?;
    Ok(inserted.inserted_ids.len())
}

async fn create_index(collection: &Collection<Document>, keys: Document) -> Result<()> {
    let model = IndexModel::builder().keys(keys).build();
    collection
        .create_index(model, None)
        .await
        .map_err(|e| Error::query(StoreKind::Document, "seed", e))?;
    Ok(())
}

#[async_trait]
impl StoreHandle for MongoStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Document
    }

    async fn release(self) -> Result<()> {
        self.client.shutdown().await;
        Ok(())
    }
}

#[async_trait]
impl DocumentCatalog for MongoStore {
    async fn events_for_references(
        &mut self,
        reference_ids: &BTreeSet<i64>,
    ) -> Result<Vec<ActivityEvent>> {
        const OP: &str = "events_for_references";
        if reference_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_all(ACTIVITY_COLLECTION, reference_filter(reference_ids), None, OP)
            .await?
            .into_iter()
            .map(|doc| activity_from_document(doc, OP))
            .collect()
    }

    async fn activity_feed(&mut self, user_ids: &[i64], limit: u32) -> Result<Vec<ActivityEvent>> {
        const OP: &str = "activity_feed";
        let cursor = self
            .collection(ACTIVITY_COLLECTION)
            .aggregate(activity_feed_pipeline(user_ids, limit), None)
            .await
            .map_err(|e| Error::query(StoreKind::Document, OP, e))?;
        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| Error::query(StoreKind::Document, OP, e))?;
        docs.into_iter()
            .map(|doc| activity_from_document(doc, OP))
            .collect()
    }

    async fn preferences_by_theme(&mut self, theme: &str) -> Result<Vec<UserPreference>> {
        const OP: &str = "preferences_by_theme";
        let mut options = FindOptions::default();
        options.projection = Some(preference_projection());
        self.find_all(PREFERENCES_COLLECTION, theme_filter(theme), Some(options), OP)
            .await?
            .into_iter()
            .map(|doc| preference_from_document(doc, OP))
            .collect()
    }
}
