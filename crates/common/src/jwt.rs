//! JWT utilities shared across the client authentication crates.
//!
//! This module provides common JWT handling utilities including:
//! - Size limits for DoS prevention
//! - Clock skew constants for time-based claim validation
//! - Compact serialization splitting (`header.payload.signature`)
//! - base64url JSON segment decoding
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE any decoding (DoS prevention)
//! - Nothing in this module verifies signatures; callers MUST verify the
//!   signature before trusting any decoded value
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{decode_json_segment, split_compact};
//!
//! let parts = split_compact(token)?;
//! let header = decode_json_segment(parts.header)?;
//! let claims = decode_json_segment(parts.payload)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Client assertions larger than this are rejected BEFORE base64 decoding,
/// JSON parsing or any cryptographic operation.
///
/// # Rationale
///
/// - Typical RS256 client assertions are 600-900 bytes
/// - 8KB leaves room for large `x5c` headers and custom claims
///
/// Per OWASP API Security Top 10 - API4:2023 (Unrestricted Resource Consumption)
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance (5 minutes).
///
/// This tolerance accounts for clock drift between the client that minted an
/// assertion and this server.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
///
/// This prevents misconfiguration that could weaken security by allowing
/// excessively large clock skew tolerance.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while taking a JWT apart.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The JWT exceeds the maximum allowed size")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWS compact serialization).
    #[error("The JWT is malformed")]
    MalformedToken,

    /// A segment decoded correctly but is not a JSON object.
    #[error("The JWT segment is not a JSON object")]
    NotJsonObject,
}

// =============================================================================
// Compact Serialization
// =============================================================================

/// The three segments of a JWS compact serialization, borrowed from the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactParts<'a> {
    /// base64url-encoded protected header.
    pub header: &'a str,

    /// base64url-encoded payload (the claim set).
    pub payload: &'a str,

    /// base64url-encoded signature. May be empty for unsecured JWTs.
    pub signature: &'a str,

    /// `header.payload`, the exact bytes covered by the signature.
    pub signing_input: &'a str,
}

/// Split a JWT into its header, payload and signature segments.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing (denial-of-service prevention)
/// - This function does NOT validate the token signature
///
/// # Errors
///
/// Returns `JwtValidationError` variants:
/// - `TokenTooLarge` - Token exceeds size limit (denial-of-service protection)
/// - `MalformedToken` - Token does not have exactly three segments, or the
///   header or payload segment is empty
pub fn split_compact(token: &str) -> Result<CompactParts<'_>, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        tracing::debug!(
            target: "common.jwt",
            parts = token.split('.').count(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    };

    if header.is_empty() || payload.is_empty() {
        tracing::debug!(target: "common.jwt", "Token rejected: empty header or payload segment");
        return Err(JwtValidationError::MalformedToken);
    }

    let signing_input = token
        .get(..header.len() + 1 + payload.len())
        .ok_or(JwtValidationError::MalformedToken)?;

    Ok(CompactParts {
        header,
        payload,
        signature,
        signing_input,
    })
}

/// Decode a base64url segment and parse it as a JSON object.
///
/// Trailing `=` padding is tolerated even though RFC 7515 forbids it, since
/// some client libraries emit it.
///
/// # Errors
///
/// - `MalformedToken` - The segment is not base64url or not valid JSON
/// - `NotJsonObject` - The segment is valid JSON but not an object
pub fn decode_json_segment(segment: &str) -> Result<Map<String, Value>, JwtValidationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT segment base64");
            JwtValidationError::MalformedToken
        })?;

    let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT segment JSON");
        JwtValidationError::MalformedToken
    })?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(JwtValidationError::NotJsonObject),
    }
}

// =============================================================================
// Tests
// =============================================================================
