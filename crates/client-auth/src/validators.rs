//! Claim validators.
//!
//! Each validator is a pure check over already-resolved policy values and
//! assertion claims. Time checks take `now` and `skew` explicitly; the skew is
//! always added to the `now` side of the comparison, never to the claim.

use crate::assertion::ClaimSet;
use crate::errors::{AuthenticationError, RejectionReason};
use chrono::{DateTime, TimeDelta, Utc};

/// `iss` must equal the issuer override when one is configured, otherwise the
/// registered client's consumer key.
pub fn validate_issuer(
    issuer: Option<&str>,
    consumer_key: &str,
    issuer_override: Option<&str>,
) -> Result<(), AuthenticationError> {
    let expected = issuer_override.unwrap_or(consumer_key);

    if issuer == Some(expected) {
        return Ok(());
    }

    tracing::debug!(
        target: "client_auth.validator",
        override_configured = issuer_override.is_some(),
        "Issuer does not match the expected value"
    );
    Err(AuthenticationError::new(
        RejectionReason::IssuerMismatch,
        "The issuer of the assertion is invalid.",
    ))
}

/// `sub` must equal the registered client's consumer key.
pub fn validate_subject(subject: Option<&str>, consumer_key: &str) -> Result<(), AuthenticationError> {
    if subject == Some(consumer_key) {
        return Ok(());
    }

    tracing::debug!(target: "client_auth.validator", "Subject does not match the consumer key");
    Err(AuthenticationError::new(
        RejectionReason::SubjectMismatch,
        "The subject of the assertion is invalid.",
    ))
}

/// Every configured mandatory claim must be present and non-null.
pub fn validate_mandatory_claims(
    claims: &ClaimSet,
    mandatory_claims: &[String],
) -> Result<(), AuthenticationError> {
    if let Some(missing) = mandatory_claims
        .iter()
        .find(|name| claims.claim(name).is_none())
    {
        tracing::debug!(target: "client_auth.validator", claim = %missing, "Mandatory claim missing");
        return Err(AuthenticationError::new(
            RejectionReason::MissingMandatoryClaim,
            "Mandatory field/fields (Issuer, Subject, Expiration time, JWT ID or Audience) are missing in the JWT assertion",
        ));
    }
    Ok(())
}

/// At least one audience value must exactly equal the expected audience.
pub fn validate_audience(audience: &[String], expected: &str) -> Result<(), AuthenticationError> {
    if audience.iter().any(|aud| aud == expected) {
        return Ok(());
    }

    tracing::debug!(
        target: "client_auth.validator",
        audience_count = audience.len(),
        "No audience value matched the token endpoint"
    );
    Err(AuthenticationError::new(
        RejectionReason::AudienceMismatch,
        format!("None of the audience values matched the token endpoint alias: {expected}"),
    ))
}

/// Reject when `now + skew > exp`. A missing `exp` is rejected outright.
///
/// Returns the validated expiry.
pub fn validate_expiration(
    expiration_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    skew: TimeDelta,
) -> Result<DateTime<Utc>, AuthenticationError> {
    let Some(exp) = expiration_time else {
        tracing::debug!(target: "client_auth.validator", "Expiration time missing");
        return Err(AuthenticationError::new(
            RejectionReason::MissingExpiration,
            "Expiration time is missing in the JWT assertion.",
        ));
    };

    if now + skew > exp {
        tracing::debug!(
            target: "client_auth.validator",
            exp = exp.timestamp_millis(),
            now = now.timestamp_millis(),
            skew_ms = skew.num_milliseconds(),
            "Assertion expired"
        );
        return Err(AuthenticationError::new(
            RejectionReason::Expired,
            format!("JWT Token is expired. Expired Time: {}", exp.to_rfc3339()),
        ));
    }
    Ok(exp)
}

/// Reject when `now + skew - nbf <= 0`. Absent `nbf` passes.
pub fn validate_not_before(
    not_before: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    skew: TimeDelta,
) -> Result<(), AuthenticationError> {
    let Some(nbf) = not_before else {
        return Ok(());
    };

    if now + skew - nbf <= TimeDelta::zero() {
        tracing::debug!(
            target: "client_auth.validator",
            nbf = nbf.timestamp_millis(),
            now = now.timestamp_millis(),
            "Assertion used before its nbf claim value"
        );
        return Err(AuthenticationError::new(
            RejectionReason::NotYetValid,
            "The token is used before the nbf claim value.",
        ));
    }
    Ok(())
}

/// Reject when `now + skew - iat > reject_before_minutes`.
///
/// Absent `iat` or `reject_before_minutes == 0` passes.
pub fn validate_issuance_age(
    issued_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    skew: TimeDelta,
    reject_before_minutes: u32,
) -> Result<(), AuthenticationError> {
    let Some(iat) = issued_at else {
        return Ok(());
    };
    if reject_before_minutes == 0 {
        return Ok(());
    }

    let limit = TimeDelta::minutes(i64::from(reject_before_minutes));
    if now + skew - iat > limit {
        tracing::debug!(
            target: "client_auth.validator",
            iat = iat.timestamp_millis(),
            reject_before_ms = limit.num_milliseconds(),
            skew_ms = skew.num_milliseconds(),
            now = now.timestamp_millis(),
            "Assertion issued before the allowed time"
        );
        return Err(AuthenticationError::new(
            RejectionReason::IssuedTooLongAgo,
            "The jwt is too old to use.",
        ));
    }
    Ok(())
}

/// Reuse-tolerant replay rule: a recorded JTI may be reused only once
/// `now + skew` has passed its recorded expiry.
pub fn check_reuse_window(
    recorded_expiry: DateTime<Utc>,
    now: DateTime<Utc>,
    skew: TimeDelta,
) -> Result<(), AuthenticationError> {
    if now + skew > recorded_expiry {
        return Ok(());
    }

    Err(AuthenticationError::new(
        RejectionReason::Replayed,
        format!(
            "JWT Token has been replayed before the allowed expiry time: {}",
            recorded_expiry.to_rfc3339()
        ),
    ))
}
