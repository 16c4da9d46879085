//! Replay registry: decides whether a JTI is fresh or a replay.
//!
//! Two tiers are consulted in order. The cache tier ([`JtiCache`]) is a
//! latency optimization and may be disabled. The durable tier ([`JtiStore`])
//! is consulted on every call and is the source of truth; in strict mode its
//! atomic insert-if-absent is the backstop for concurrent presentations of the
//! same JTI.
//!
//! Policy:
//! - strict (`prevent_token_reuse = true`): any recorded JTI is a replay
//! - reuse-tolerant: a recorded JTI may be reused only once `now + skew` has
//!   passed the recorded expiry

pub mod cache;
pub mod store;

pub use cache::{CachedAssertion, JtiCache};
pub use store::{InMemoryJtiStore, JtiStore};

use crate::config::ValidationPolicy;
use crate::errors::{AuthenticationError, JtiStoreError, RejectionReason};
use crate::models::JtiRecord;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_jti_cache_lookup;
use crate::validators::check_reuse_window;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;

pub struct ReplayRegistry {
    prevent_token_reuse: bool,
    cache: Option<JtiCache>,
    store: Arc<dyn JtiStore>,
}

impl ReplayRegistry {
    /// Build a registry. Pass `None` for `cache` to disable the cache tier.
    pub fn new(
        prevent_token_reuse: bool,
        cache: Option<JtiCache>,
        store: Arc<dyn JtiStore>,
    ) -> Self {
        Self {
            prevent_token_reuse,
            cache,
            store,
        }
    }

    /// Build a registry whose mode and cache tier follow the validation policy.
    pub fn from_policy(policy: &ValidationPolicy, store: Arc<dyn JtiStore>) -> Self {
        let cache = policy
            .enable_jti_cache
            .then(|| JtiCache::new(policy.jti_cache_capacity));
        Self::new(policy.prevent_token_reuse, cache, store)
    }

    pub fn prevent_token_reuse(&self) -> bool {
        self.prevent_token_reuse
    }

    pub fn cache(&self) -> Option<&JtiCache> {
        self.cache.as_ref()
    }

    /// Check a JTI against both tiers and record it.
    ///
    /// On acceptance the JTI is written to the durable tier, then to the cache
    /// tier. A rejected call leaves both tiers untouched.
    ///
    /// # Errors
    ///
    /// - `Replayed` - the JTI was seen and reuse is not allowed
    /// - `Internal` - the durable tier failed; detail is logged, not returned
    pub async fn check_and_record(
        &self,
        jti: &str,
        now: DateTime<Utc>,
        skew: TimeDelta,
        expires_at: DateTime<Utc>,
        issued_at: Option<DateTime<Utc>>,
    ) -> Result<(), AuthenticationError> {
        let jti_hash = hash_for_correlation(jti);

        if let Some(cache) = &self.cache {
            self.check_cache(cache, jti, &jti_hash, now, skew).await?;
        }

        let stale_record_found = self.check_store(jti, &jti_hash, now, skew).await?;

        let record = JtiRecord {
            jti: jti.to_string(),
            expires_at,
            issued_at,
        };

        let persisted = if stale_record_found {
            self.store.upsert(&record).await
        } else {
            self.store.insert(&record).await
        };

        match persisted {
            Ok(()) => {
                if let Some(cache) = &self.cache {
                    cache
                        .insert(
                            jti,
                            CachedAssertion {
                                expires_at,
                                issued_at,
                            },
                        )
                        .await;
                }
                tracing::debug!(target: "client_auth.replay", jti_hash = %jti_hash, "JTI recorded");
                Ok(())
            }
            Err(JtiStoreError::DuplicateJti) => {
                tracing::debug!(
                    target: "client_auth.replay",
                    jti_hash = %jti_hash,
                    "Concurrent presentation of JTI lost the insert race"
                );
                Err(replayed())
            }
            Err(e) => Err(store_failure(&jti_hash, &e)),
        }
    }

    /// Read-only: the cache is written only once the durable tier accepts.
    async fn check_cache(
        &self,
        cache: &JtiCache,
        jti: &str,
        jti_hash: &str,
        now: DateTime<Utc>,
        skew: TimeDelta,
    ) -> Result<(), AuthenticationError> {
        match cache.get(jti).await {
            None => {
                record_jti_cache_lookup("miss");
                Ok(())
            }
            Some(_) if self.prevent_token_reuse => {
                record_jti_cache_lookup("hit");
                tracing::debug!(target: "client_auth.replay", jti_hash = %jti_hash, "JTI found in cache");
                Err(replayed())
            }
            Some(cached) => {
                if let Err(e) = check_reuse_window(cached.expires_at, now, skew) {
                    record_jti_cache_lookup("hit");
                    tracing::debug!(
                        target: "client_auth.replay",
                        jti_hash = %jti_hash,
                        "JTI reused in cache before the recorded expiry"
                    );
                    return Err(e);
                }
                record_jti_cache_lookup("stale");
                Ok(())
            }
        }
    }

    /// Returns whether a stale prior record exists (reuse-tolerant mode only).
    async fn check_store(
        &self,
        jti: &str,
        jti_hash: &str,
        now: DateTime<Utc>,
        skew: TimeDelta,
    ) -> Result<bool, AuthenticationError> {
        if self.prevent_token_reuse {
            let exists = self
                .store
                .exists(jti)
                .await
                .map_err(|e| store_failure(jti_hash, &e))?;
            if exists {
                tracing::debug!(target: "client_auth.replay", jti_hash = %jti_hash, "JTI found in durable store");
                return Err(replayed());
            }
            return Ok(false);
        }

        let prior = self
            .store
            .get(jti)
            .await
            .map_err(|e| store_failure(jti_hash, &e))?;

        match prior {
            None => Ok(false),
            Some(record) => {
                check_reuse_window(record.expires_at, now, skew).inspect_err(|_| {
                    tracing::debug!(
                        target: "client_auth.replay",
                        jti_hash = %jti_hash,
                        "JTI reused before the recorded expiry"
                    );
                })?;
                tracing::debug!(
                    target: "client_auth.replay",
                    jti_hash = %jti_hash,
                    "JTI reused after the recorded expiry"
                );
                Ok(true)
            }
        }
    }
}

fn replayed() -> AuthenticationError {
    AuthenticationError::new(RejectionReason::Replayed, "JWT Token has been replayed.")
}

fn store_failure(jti_hash: &str, error: &JtiStoreError) -> AuthenticationError {
    tracing::debug!(target: "client_auth.replay", jti_hash = %jti_hash, error = %error, "JTI store failure");
    AuthenticationError::new(RejectionReason::Internal, "JTI validation failed.")
}
