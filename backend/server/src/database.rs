//! # MongoDB
//!
//! Document store for waitlist signups.
//!
//! Core purpose is to persist one document per unique email and hand the whole
//! collection back to the admin listing.
//!
//! ## Requirements
//!
//! - Low request volume, one logical collection (`waitlist`)
//! - Lazy connection, nothing is dialed until the first request needs it
//! - One client per process, reused by every request
//!
//! ## Implementation
//!
//! - [`ConnectionProvider`] memoizes a single [`Client`] behind an async mutex
//! - Dialing is a [`Connect`] impl. [`MongoConnector`] parses the URI, builds the
//!   client and pings `admin` before the provider caches it
//! - The driver keeps its own pool, bounded by `MONGODB_MAX_POOL_SIZE`
//! - Failed connects are not cached, so the next request tries again
//! - Documents: `{ email, timestamp, userAgent, ip, source }`, `timestamp` is a BSON date
//!
//! ## Notes
//!
//! No unique index on `email`. Deduplication is the join handler's lookup, which
//! is not atomic with the insert.

use std::future::Future;

use futures_util::TryStreamExt;
use mongodb::{
    Client, Collection,
    bson::{Document, doc},
    options::ClientOptions,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    models::{WAITLIST_COLLECTION, WaitlistEntry},
    store::{StoreError, WaitlistStore},
};

const APP_NAME: &str = "waitlist";

/// Dials the document store once. [`ConnectionProvider`] decides when.
pub trait Connect: Send + Sync + 'static {
    type Connection: Clone + Send + Sync + 'static;

    fn connect(
        &self,
        uri: &str,
    ) -> impl Future<Output = Result<Self::Connection, StoreError>> + Send;

    fn close(&self, connection: Self::Connection) -> impl Future<Output = ()> + Send;
}

pub struct MongoConnector {
    pub max_pool_size: u32,
}

impl Connect for MongoConnector {
    type Connection = Client;

    async fn connect(&self, uri: &str) -> Result<Client, StoreError> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(StoreError::Connection)?;
        options.app_name = Some(APP_NAME.to_string());
        options.max_pool_size = Some(self.max_pool_size);

        let client = Client::with_options(options).map_err(StoreError::Connection)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| {
                warn!("MongoDB ping failed: {e}");
                StoreError::Connection(e)
            })?;

        Ok(client)
    }

    async fn close(&self, client: Client) {
        client.shutdown().await;
    }
}

pub struct ConnectionProvider<C: Connect = MongoConnector> {
    uri: Option<String>,
    connector: C,
    connection: Mutex<Option<C::Connection>>,
}

impl ConnectionProvider {
    pub fn new(uri: Option<String>, max_pool_size: u32) -> Self {
        Self::with_connector(uri, MongoConnector { max_pool_size })
    }
}

impl<C: Connect> ConnectionProvider<C> {
    pub fn with_connector(uri: Option<String>, connector: C) -> Self {
        Self {
            uri,
            connector,
            connection: Mutex::new(None),
        }
    }

    /// The lock is held while dialing, so concurrent first callers share one connect.
    pub async fn client(&self) -> Result<C::Connection, StoreError> {
        let mut slot = self.connection.lock().await;

        if let Some(connection) = slot.as_ref() {
            return Ok(connection.clone());
        }

        let uri = self.uri.as_deref().ok_or(StoreError::NotConfigured)?;

        info!("Connecting to MongoDB...");
        let connection = self.connector.connect(uri).await?;
        info!("MongoDB connection established");

        *slot = Some(connection.clone());

        Ok(connection)
    }

    #[cfg(any(test, feature = "test-util"))]
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// Drops the memoized connection. The next [`ConnectionProvider::client`] call reconnects.
    pub async fn disconnect(&self) {
        let connection = self.connection.lock().await.take();

        if let Some(connection) = connection {
            info!("Closing MongoDB connection");
            self.connector.close(connection).await;
        }
    }
}

pub struct MongoStore {
    provider: ConnectionProvider,
    database: String,
}

impl MongoStore {
    pub fn new(provider: ConnectionProvider, database: impl Into<String>) -> Self {
        Self {
            provider,
            database: database.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ConnectionProvider::new(config.mongodb_uri.clone(), config.max_pool_size),
            config.mongodb_db.clone(),
        )
    }

    pub fn provider(&self) -> &ConnectionProvider {
        &self.provider
    }

    async fn collection(&self) -> Result<Collection<WaitlistEntry>, StoreError> {
        let client = self.provider.client().await?;

        Ok(client
            .database(&self.database)
            .collection(WAITLIST_COLLECTION))
    }
}

impl WaitlistStore for MongoStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<WaitlistEntry>, StoreError> {
        let collection = self.collection().await?;

        Ok(collection.find_one(doc! { "email": email }).await?)
    }

    async fn insert(&self, entry: &WaitlistEntry) -> Result<String, StoreError> {
        let collection = self.collection().await?;
        let result = collection.insert_one(entry).await?;

        let id = match result.inserted_id.as_object_id() {
            Some(oid) => oid.to_hex(),
            None => result.inserted_id.to_string(),
        };
        debug!("Inserted waitlist entry {id}");

        Ok(id)
    }

    async fn list_newest_first(&self) -> Result<Vec<WaitlistEntry>, StoreError> {
        let collection = self.collection().await?;

        let cursor = collection
            .find(Document::new())
            .sort(doc! { "timestamp": -1 })
            .await?;

        Ok(cursor.try_collect::<Vec<_>>().await?)
    }

    async fn ping(&self) -> Result<Vec<String>, StoreError> {
        let client = self.provider.client().await?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        Ok(client.list_database_names().await?)
    }
}
