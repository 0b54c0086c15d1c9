//! In-memory [`WaitlistStore`] for tests.
use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use super::{StoreError, WaitlistStore};
use crate::models::WaitlistEntry;

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<WaitlistEntry>>,
    accesses: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<WaitlistEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ..Self::default()
        }
    }

    /// Number of store operations attempted so far, failed ones included.
    pub fn accesses(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_email(&self, email: &str) -> usize {
        self.lock()
            .iter()
            .filter(|entry| entry.email.eq_ignore_ascii_case(email))
            .count()
    }

    /// Makes every following operation fail with [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WaitlistEntry>> {
        // a panicked test thread must not hide the entries from the others
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn access(&self) -> Result<(), StoreError> {
        self.accesses.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store set to fail".to_string()));
        }

        Ok(())
    }
}

impl WaitlistStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<WaitlistEntry>, StoreError> {
        self.access()?;

        Ok(self.lock().iter().find(|entry| entry.email == email).cloned())
    }

    async fn insert(&self, entry: &WaitlistEntry) -> Result<String, StoreError> {
        self.access()?;

        let mut entries = self.lock();
        entries.push(entry.clone());

        Ok(format!("{:024x}", entries.len()))
    }

    async fn list_newest_first(&self) -> Result<Vec<WaitlistEntry>, StoreError> {
        self.access()?;

        let mut entries = self.lock().clone();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(entries)
    }

    async fn ping(&self) -> Result<Vec<String>, StoreError> {
        self.access()?;

        Ok(vec!["memory".to_string()])
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::models::DEFAULT_SOURCE;

    fn entry(email: &str, age: Duration) -> WaitlistEntry {
        WaitlistEntry {
            email: email.to_string(),
            timestamp: Utc::now() - age,
            user_agent: "test".to_string(),
            ip: "127.0.0.1".to_string(),
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let store = MemoryStore::with_entries(vec![
            entry("old@example.com", Duration::days(3)),
            entry("new@example.com", Duration::zero()),
            entry("mid@example.com", Duration::days(1)),
        ]);

        let emails: Vec<String> = store
            .list_newest_first()
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.email)
            .collect();

        assert_eq!(
            emails,
            ["new@example.com", "mid@example.com", "old@example.com"]
        );
    }

    #[tokio::test]
    async fn counts_every_access() {
        let store = MemoryStore::new();

        assert!(store.find_by_email("a@b.co").await.unwrap().is_none());
        store.insert(&entry("a@b.co", Duration::zero())).await.unwrap();
        assert!(store.find_by_email("a@b.co").await.unwrap().is_some());

        assert_eq!(store.accesses(), 3);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn failing_store_still_counts_access() {
        let store = MemoryStore::new();
        store.set_failing(true);

        let err = store.list_newest_first().await.unwrap_err();

        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.accesses(), 1);
    }
}
