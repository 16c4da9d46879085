//! Metrics for client assertion validation.
//!
//! All metrics follow Prometheus naming conventions:
//! - `client_auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: 2 values (success, error)
//! - `reason`: bounded by [`RejectionReason`](crate::errors::RejectionReason), plus `none`
//! - `result`: 3 values (miss, hit, stale)
//! - `operation`: bounded by code (exists, get, insert, upsert, delete_expired)

use metrics::{counter, histogram};
use std::time::Duration;

/// Record the outcome of one assertion validation.
///
/// Metrics: `client_auth_assertion_validations_total`,
/// `client_auth_assertion_validation_duration_seconds`
/// Labels: `status`, `reason`
pub fn record_assertion_validation(status: &str, reason: Option<&str>, duration: Duration) {
    let reason = reason.unwrap_or("none");

    counter!("client_auth_assertion_validations_total", "status" => status.to_string(), "reason" => reason.to_string())
        .increment(1);

    histogram!("client_auth_assertion_validation_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());
}

/// Record a replay cache lookup.
///
/// Metric: `client_auth_jti_cache_lookups_total`
/// Labels: `result` (miss, hit, stale)
pub fn record_jti_cache_lookup(result: &str) {
    counter!("client_auth_jti_cache_lookups_total", "result" => result.to_string()).increment(1);
}

/// Record a durable JTI store query.
///
/// Metrics: `client_auth_jti_store_queries_total`,
/// `client_auth_jti_store_query_duration_seconds`
/// Labels: `operation`, `status`
pub fn record_jti_store_query(operation: &str, status: &str, duration: Duration) {
    histogram!("client_auth_jti_store_query_duration_seconds", "operation" => operation.to_string())
        .record(duration.as_secs_f64());

    counter!("client_auth_jti_store_queries_total", "operation" => operation.to_string(), "status" => status.to_string())
        .increment(1);
}
