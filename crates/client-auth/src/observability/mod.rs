//! Observability for client assertion validation.
//!
//! # Privacy by Default
//!
//! Validation entry points use `#[instrument(skip_all)]` and log only an
//! explicit allow-list of fields:
//! - **SAFE**: rejection reasons, algorithm names, cache and store outcomes
//! - **HASHED**: client identifiers (`iss`, `sub`, consumer key) and JTIs,
//!   via [`hash_for_correlation`]
//! - **NEVER**: the raw assertion, signatures, key material

pub mod metrics;

use sha2::{Digest, Sha256};

/// Hash a field value for correlation in logs (SHA-256, first 8 hex chars).
///
/// Used for client identifiers and JTIs, which need correlation across log
/// entries but should not be written in plaintext. This is a one-way hash for
/// correlation only, not a secret-grade construction.
pub fn hash_for_correlation(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(digest.get(..4).unwrap_or_default())
}
