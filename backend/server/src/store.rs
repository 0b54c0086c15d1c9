//! # Store
//!
//! Everything the handlers need from persistence, behind [`WaitlistStore`].
//!
//! - [`crate::database::MongoStore`] is the production implementation
//! - `MemoryStore` (tests and the `test-util` feature) keeps entries in a `Vec`
//!   and counts accesses, so tests can check that a request never reached the store
//!
//! There is no uniqueness constraint at this layer. `find_by_email` followed by
//! `insert` is a plain check-then-act and two racing joins for the same email
//! can both insert.
use std::future::Future;

use thiserror::Error;

use crate::models::WaitlistEntry;

#[cfg(any(test, feature = "test-util"))]
mod memory;

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database endpoint is not configured")]
    NotConfigured,

    #[error("Database connection failed: {0}")]
    Connection(#[source] mongodb::error::Error),

    #[error("Database query failed: {0}")]
    Query(#[from] mongodb::error::Error),

    #[error("Database unavailable: {0}")]
    Unavailable(String),
}

pub trait WaitlistStore: Send + Sync + 'static {
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<WaitlistEntry>, StoreError>> + Send;

    /// Returns the identifier assigned by the store.
    fn insert(
        &self,
        entry: &WaitlistEntry,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    fn list_newest_first(
        &self,
    ) -> impl Future<Output = Result<Vec<WaitlistEntry>, StoreError>> + Send;

    /// Liveness check, returning the database names visible to the connection.
    fn ping(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}
