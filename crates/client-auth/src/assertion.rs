//! Parsed client assertions (RFC 7523 section 2.2).
//!
//! A [`SignedAssertion`] is the JWS compact serialization taken apart: the
//! protected header is decoded eagerly, the claim set lazily through
//! [`SignedAssertion::claim_set`], so a malformed payload is reported at the
//! point the validation pipeline first needs claims.
//!
//! Nothing here verifies the signature.

use crate::errors::{AuthenticationError, RejectionReason};
use chrono::{DateTime, Utc};
use common::jwt::{decode_json_segment, split_compact, JwtValidationError};
use serde_json::{Map, Value};
use std::fmt;

/// Registered claim names used by the validation pipeline.
pub mod claim_names {
    pub const ISSUER: &str = "iss";
    pub const SUBJECT: &str = "sub";
    pub const AUDIENCE: &str = "aud";
    pub const EXPIRATION_TIME: &str = "exp";
    pub const NOT_BEFORE: &str = "nbf";
    pub const ISSUED_AT: &str = "iat";
    pub const JWT_ID: &str = "jti";
}

/// JOSE header of a client assertion.
///
/// `alg` is kept as the raw string so that unsupported or missing algorithms
/// reach the signature verifier instead of failing at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionHeader {
    pub alg: Option<String>,
    pub kid: Option<String>,
    pub typ: Option<String>,
}

/// A JWS compact serialized client assertion.
#[derive(Debug, Clone)]
pub struct SignedAssertion {
    header: AssertionHeader,
    payload: String,
    signature: String,
    signing_input: String,
}

impl SignedAssertion {
    /// Parse a `client_assertion` parameter value.
    ///
    /// Rejects oversized tokens, tokens without exactly three segments and
    /// tokens whose header is not a JSON object. The payload is only split
    /// off here; it is decoded by [`SignedAssertion::claim_set`].
    pub fn parse(token: &str) -> Result<Self, AuthenticationError> {
        let parts = split_compact(token).map_err(|e| {
            tracing::debug!(target: "client_auth.assertion", error = %e, "Assertion rejected at parse");
            match e {
                JwtValidationError::TokenTooLarge => AuthenticationError::new(
                    RejectionReason::MalformedAssertion,
                    "The JWT assertion exceeds the maximum allowed size.",
                ),
                _ => AuthenticationError::new(
                    RejectionReason::MalformedAssertion,
                    "Error while parsing the JWT assertion.",
                ),
            }
        })?;

        let header_map = decode_json_segment(parts.header).map_err(|e| {
            tracing::debug!(target: "client_auth.assertion", error = %e, "Invalid assertion header");
            AuthenticationError::new(
                RejectionReason::MalformedAssertion,
                "Error while parsing the JWT assertion.",
            )
        })?;

        let header = AssertionHeader {
            alg: header_string(&header_map, "alg")?,
            kid: header_string(&header_map, "kid")?,
            typ: header_string(&header_map, "typ")?,
        };

        Ok(Self {
            header,
            payload: parts.payload.to_string(),
            signature: parts.signature.to_string(),
            signing_input: parts.signing_input.to_string(),
        })
    }

    pub fn header(&self) -> &AssertionHeader {
        &self.header
    }

    /// `header.payload` as transmitted; the bytes covered by the signature.
    pub fn signing_input(&self) -> &str {
        &self.signing_input
    }

    /// base64url-encoded signature segment.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Decode and parse the claim set.
    ///
    /// Fails when the payload is not a base64url JSON object, when the object
    /// is empty, or when a registered claim has the wrong JSON type.
    pub fn claim_set(&self) -> Result<ClaimSet, AuthenticationError> {
        let map = decode_json_segment(&self.payload).map_err(|e| {
            tracing::debug!(target: "client_auth.assertion", error = %e, "Invalid assertion payload");
            AuthenticationError::new(
                RejectionReason::MalformedAssertion,
                "Error when trying to retrieve claimsSet from the JWT.",
            )
        })?;

        if map.is_empty() {
            return Err(AuthenticationError::new(
                RejectionReason::MalformedAssertion,
                "Claim values are empty in the given JSON Web Token.",
            ));
        }

        ClaimSet::from_map(map)
    }
}

fn header_string(
    header: &Map<String, Value>,
    name: &str,
) -> Result<Option<String>, AuthenticationError> {
    match header.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => {
            tracing::debug!(target: "client_auth.assertion", header = name, "Header parameter is not a string");
            Err(AuthenticationError::new(
                RejectionReason::MalformedAssertion,
                "Error while parsing the JWT assertion.",
            ))
        }
    }
}

/// The claim set of a client assertion.
///
/// Registered claims are exposed typed; every claim (registered or not) is
/// also reachable by name through [`ClaimSet::claim`].
#[derive(Clone)]
pub struct ClaimSet {
    issuer: Option<String>,
    subject: Option<String>,
    audience: Vec<String>,
    expiration_time: Option<DateTime<Utc>>,
    not_before: Option<DateTime<Utc>>,
    issued_at: Option<DateTime<Utc>>,
    jwt_id: Option<String>,
    all_claims: Map<String, Value>,
}

/// Custom Debug implementation that redacts `iss` and `sub`.
///
/// Both carry the client identifier, which is only ever logged hashed.
impl fmt::Debug for ClaimSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimSet")
            .field("issuer", &"[REDACTED]")
            .field("subject", &"[REDACTED]")
            .field("audience", &self.audience)
            .field("expiration_time", &self.expiration_time)
            .field("not_before", &self.not_before)
            .field("issued_at", &self.issued_at)
            .field("jwt_id", &self.jwt_id)
            .finish()
    }
}

impl ClaimSet {
    /// Build a claim set from a decoded JSON object.
    pub fn from_map(all_claims: Map<String, Value>) -> Result<Self, AuthenticationError> {
        use claim_names::*;

        Ok(Self {
            issuer: string_claim(&all_claims, ISSUER)?,
            subject: string_claim(&all_claims, SUBJECT)?,
            audience: audience_claim(&all_claims)?,
            expiration_time: numeric_date_claim(&all_claims, EXPIRATION_TIME)?,
            not_before: numeric_date_claim(&all_claims, NOT_BEFORE)?,
            issued_at: numeric_date_claim(&all_claims, ISSUED_AT)?,
            jwt_id: string_claim(&all_claims, JWT_ID)?,
            all_claims,
        })
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Audience values in the order they appear in the assertion. A single
    /// string `aud` becomes a one-element list.
    pub fn audience(&self) -> &[String] {
        &self.audience
    }

    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.expiration_time
    }

    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.not_before
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn jwt_id(&self) -> Option<&str> {
        self.jwt_id.as_deref()
    }

    /// Look up any claim by name. A claim present with a JSON `null` value is
    /// reported as absent.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.all_claims.get(name).filter(|v| !v.is_null())
    }

    pub fn all_claims(&self) -> &Map<String, Value> {
        &self.all_claims
    }
}

fn unparsable_claim(name: &str) -> AuthenticationError {
    tracing::debug!(target: "client_auth.assertion", claim = name, "Registered claim has an unexpected type");
    AuthenticationError::new(
        RejectionReason::MalformedAssertion,
        "Error when trying to retrieve claimsSet from the JWT.",
    )
}

fn string_claim(
    claims: &Map<String, Value>,
    name: &str,
) -> Result<Option<String>, AuthenticationError> {
    match claims.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(unparsable_claim(name)),
    }
}

fn audience_claim(claims: &Map<String, Value>) -> Result<Vec<String>, AuthenticationError> {
    match claims.get(claim_names::AUDIENCE) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| {
                v.as_str()
                    .map(ToString::to_string)
                    .ok_or_else(|| unparsable_claim(claim_names::AUDIENCE))
            })
            .collect(),
        Some(_) => Err(unparsable_claim(claim_names::AUDIENCE)),
    }
}

/// RFC 7519 NumericDate: seconds since the epoch, fractions allowed.
fn numeric_date_claim(
    claims: &Map<String, Value>,
    name: &str,
) -> Result<Option<DateTime<Utc>>, AuthenticationError> {
    let number = match claims.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n,
        Some(_) => return Err(unparsable_claim(name)),
    };

    let instant = if let Some(secs) = number.as_i64() {
        DateTime::from_timestamp(secs, 0)
    } else {
        number
            .as_f64()
            .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64 / 1000.0)
            .and_then(|f| DateTime::from_timestamp_millis((f * 1000.0).round() as i64))
    };

    instant.map(Some).ok_or_else(|| unparsable_claim(name))
}
