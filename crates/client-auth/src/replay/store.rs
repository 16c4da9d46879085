//! Durable tier of the replay registry.

use crate::errors::JtiStoreError;
use crate::models::JtiRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Durable JTI storage.
///
/// `insert` must be atomic insert-if-absent: a concurrent insert of the same
/// JTI yields [`JtiStoreError::DuplicateJti`] for all but one caller. Strict
/// replay prevention relies on it.
#[async_trait]
pub trait JtiStore: Send + Sync {
    async fn exists(&self, jti: &str) -> Result<bool, JtiStoreError>;

    async fn get(&self, jti: &str) -> Result<Option<JtiRecord>, JtiStoreError>;

    /// Insert a new record, failing with `DuplicateJti` if one exists.
    async fn insert(&self, record: &JtiRecord) -> Result<(), JtiStoreError>;

    /// Insert or overwrite. Only used once a prior record was found stale.
    async fn upsert(&self, record: &JtiRecord) -> Result<(), JtiStoreError>;

    /// Remove records that expired before `before`. Returns the number removed.
    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, JtiStoreError>;
}

/// In-process durable tier for single-node deployments and tests.
#[derive(Default)]
pub struct InMemoryJtiStore {
    records: RwLock<HashMap<String, JtiRecord>>,
}

impl InMemoryJtiStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl JtiStore for InMemoryJtiStore {
    async fn exists(&self, jti: &str) -> Result<bool, JtiStoreError> {
        Ok(self.records.read().await.contains_key(jti))
    }

    async fn get(&self, jti: &str) -> Result<Option<JtiRecord>, JtiStoreError> {
        Ok(self.records.read().await.get(jti).cloned())
    }

    async fn insert(&self, record: &JtiRecord) -> Result<(), JtiStoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.jti) {
            return Err(JtiStoreError::DuplicateJti);
        }
        records.insert(record.jti.clone(), record.clone());
        Ok(())
    }

    async fn upsert(&self, record: &JtiRecord) -> Result<(), JtiStoreError> {
        self.records
            .write()
            .await
            .insert(record.jti.clone(), record.clone());
        Ok(())
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, JtiStoreError> {
        let mut records = self.records.write().await;
        let original = records.len();
        records.retain(|_, record| record.expires_at >= before);
        Ok((original - records.len()) as u64)
    }
}

/// Store doubles for exercising failure paths.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose every operation fails with a database error.
    #[derive(Default)]
    pub struct FailingJtiStore {
        call_count: AtomicUsize,
    }

    impl FailingJtiStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        fn fail<T>(&self) -> Result<T, JtiStoreError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Err(JtiStoreError::Database(
                "Mock JTI store error".to_string(),
            ))
        }
    }

    #[async_trait]
    impl JtiStore for FailingJtiStore {
        async fn exists(&self, _jti: &str) -> Result<bool, JtiStoreError> {
            self.fail()
        }

        async fn get(&self, _jti: &str) -> Result<Option<JtiRecord>, JtiStoreError> {
            self.fail()
        }

        async fn insert(&self, _record: &JtiRecord) -> Result<(), JtiStoreError> {
            self.fail()
        }

        async fn upsert(&self, _record: &JtiRecord) -> Result<(), JtiStoreError> {
            self.fail()
        }

        async fn delete_expired(&self, _before: DateTime<Utc>) -> Result<u64, JtiStoreError> {
            self.fail()
        }
    }
}
