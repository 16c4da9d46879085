//! PostgreSQL durable tier for the replay registry (jwt_jti_entries table).

use crate::errors::JtiStoreError;
use crate::models::JtiRecord;
use crate::observability::metrics::record_jti_store_query;
use crate::replay::JtiStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Instant;

/// Insert a JTI if absent.
///
/// Returns `Ok(false)` when a record already exists. A unique violation from
/// a concurrent writer is reported the same way.
pub async fn insert_if_absent(pool: &PgPool, record: &JtiRecord) -> Result<bool, JtiStoreError> {
    let result = sqlx::query_scalar::<_, String>(
        r#"
        INSERT INTO jwt_jti_entries (jti, expires_at, issued_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (jti) DO NOTHING
        RETURNING jti
        "#,
    )
    .bind(&record.jti)
    .bind(record.expires_at)
    .bind(record.issued_at)
    .fetch_optional(pool)
    .await;

    match result {
        Ok(inserted) => Ok(inserted.is_some()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(false),
        Err(e) => Err(JtiStoreError::Database(format!(
            "Failed to insert JTI entry: {}",
            e
        ))),
    }
}

/// Insert a JTI or overwrite its existing record.
pub async fn upsert(pool: &PgPool, record: &JtiRecord) -> Result<(), JtiStoreError> {
    sqlx::query(
        r#"
        INSERT INTO jwt_jti_entries (jti, expires_at, issued_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (jti) DO UPDATE
        SET expires_at = EXCLUDED.expires_at,
            issued_at = EXCLUDED.issued_at,
            recorded_at = NOW()
        "#,
    )
    .bind(&record.jti)
    .bind(record.expires_at)
    .bind(record.issued_at)
    .execute(pool)
    .await
    .map_err(|e| JtiStoreError::Database(format!("Failed to upsert JTI entry: {}", e)))?;

    Ok(())
}

/// Get the record for a JTI.
pub async fn get_by_jti(pool: &PgPool, jti: &str) -> Result<Option<JtiRecord>, JtiStoreError> {
    let record = sqlx::query_as::<_, JtiRecord>(
        r#"
        SELECT jti, expires_at, issued_at
        FROM jwt_jti_entries
        WHERE jti = $1
        "#,
    )
    .bind(jti)
    .fetch_optional(pool)
    .await
    .map_err(|e| JtiStoreError::Database(format!("Failed to fetch JTI entry: {}", e)))?;

    Ok(record)
}

/// Check whether a JTI has been recorded.
pub async fn exists(pool: &PgPool, jti: &str) -> Result<bool, JtiStoreError> {
    let found = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(SELECT 1 FROM jwt_jti_entries WHERE jti = $1)
        "#,
    )
    .bind(jti)
    .fetch_one(pool)
    .await
    .map_err(|e| JtiStoreError::Database(format!("Failed to check JTI entry: {}", e)))?;

    Ok(found)
}

/// Delete records whose expiry is before `before`.
pub async fn delete_expired(pool: &PgPool, before: DateTime<Utc>) -> Result<u64, JtiStoreError> {
    let result = sqlx::query(
        r#"
        DELETE FROM jwt_jti_entries
        WHERE expires_at < $1
        "#,
    )
    .bind(before)
    .execute(pool)
    .await
    .map_err(|e| JtiStoreError::Database(format!("Failed to delete expired JTI entries: {}", e)))?;

    Ok(result.rows_affected())
}

/// [`JtiStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgJtiStore {
    pool: PgPool,
}

impl PgJtiStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn observe<T>(operation: &str, start: Instant, result: &Result<T, JtiStoreError>) {
    let status = match result {
        Ok(_) | Err(JtiStoreError::DuplicateJti) => "success",
        Err(JtiStoreError::Database(_)) => "error",
    };
    record_jti_store_query(operation, status, start.elapsed());
}

#[async_trait]
impl JtiStore for PgJtiStore {
    async fn exists(&self, jti: &str) -> Result<bool, JtiStoreError> {
        let start = Instant::now();
        let result = exists(&self.pool, jti).await;
        observe("exists", start, &result);
        result
    }

    async fn get(&self, jti: &str) -> Result<Option<JtiRecord>, JtiStoreError> {
        let start = Instant::now();
        let result = get_by_jti(&self.pool, jti).await;
        observe("get", start, &result);
        result
    }

    async fn insert(&self, record: &JtiRecord) -> Result<(), JtiStoreError> {
        let start = Instant::now();
        let result = match insert_if_absent(&self.pool, record).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(JtiStoreError::DuplicateJti),
            Err(e) => Err(e),
        };
        observe("insert", start, &result);
        result
    }

    async fn upsert(&self, record: &JtiRecord) -> Result<(), JtiStoreError> {
        let start = Instant::now();
        let result = upsert(&self.pool, record).await;
        observe("upsert", start, &result);
        result
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, JtiStoreError> {
        let start = Instant::now();
        let result = delete_expired(&self.pool, before).await;
        observe("delete_expired", start, &result);
        result
    }
}
