//! Claim validation through the full pipeline
//!
//! Covers the accepted path, issuer/subject binding, mandatory claims,
//! audience resolution and the time-based checks.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{Duration, Utc};
use client_auth::config::ValidationPolicy;
use client_auth::errors::INVALID_REQUEST;
use client_auth::{RejectionReason, SignedAssertion};
use client_auth_test_utils::*;
use serde_json::json;

// ============================================================================
// Accepted assertions
// ============================================================================

/// A well-formed assertion signed by the registered key is accepted.
#[tokio::test]
async fn test_valid_assertion_accepted() -> Result<(), anyhow::Error> {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .with_jti("abc")
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness.validate(&token).await.assert_accepted();
    assert_eq!(harness.jti_store.len().await, 1);

    Ok(())
}

#[tokio::test]
async fn test_is_valid_assertion_returns_true() -> Result<(), anyhow::Error> {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);
    let assertion = SignedAssertion::parse(&token)?;

    assert!(harness.validator.is_valid_assertion(Some(&assertion)).await?);

    Ok(())
}

/// `aud` may be a single string rather than an array.
#[tokio::test]
async fn test_single_string_audience_accepted() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .with_audience(TEST_TOKEN_ENDPOINT)
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness.validate(&token).await.assert_accepted();
}

#[tokio::test]
async fn test_any_audience_entry_may_match() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .with_audiences(&[TEST_WRONG_AUDIENCE, TEST_TOKEN_ENDPOINT])
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness.validate(&token).await.assert_accepted();
}

// ============================================================================
// Malformed input
// ============================================================================

#[tokio::test]
async fn test_absent_assertion_rejected() {
    let harness = ValidatorHarness::new();

    harness
        .validator
        .validate(None)
        .await
        .assert_rejected_with(RejectionReason::MalformedAssertion)
        .assert_message_contains("No valid JWT assertion found");
}

#[tokio::test]
async fn test_malformed_token_rejected() {
    let harness = ValidatorHarness::new();

    harness
        .validate("not-a-jwt")
        .await
        .assert_rejected_with(RejectionReason::MalformedAssertion);
    assert_eq!(harness.clients.call_count(), 0);
}

#[tokio::test]
async fn test_oversized_token_rejected() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .with_claim("padding", json!("x".repeat(9000)))
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::MalformedAssertion)
        .assert_message_contains("maximum allowed size");
}

#[tokio::test]
async fn test_missing_subject_rejected_before_registry_lookup() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .without_claim("sub")
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::UnknownClient);
    assert_eq!(harness.clients.call_count(), 0);
}

#[tokio::test]
async fn test_rejection_maps_to_oauth_error_body() {
    let harness = ValidatorHarness::new();
    let err = harness.validate("a.b").await.unwrap_err();
    let body = err.to_oauth_error();

    assert_eq!(body.error, INVALID_REQUEST);
    assert_eq!(body.error_description, err.message());
}

#[tokio::test]
async fn test_get_claim_set_returns_claims() -> Result<(), anyhow::Error> {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .with_jti("claims-jti")
        .with_claim("custom", json!("value"))
        .sign_rsa(RSA_PRIVATE_KEY_A);
    let assertion = SignedAssertion::parse(&token)?;

    let claims = harness.validator.get_claim_set(Some(&assertion))?;
    assert_eq!(claims.jwt_id(), Some("claims-jti"));
    assert_eq!(claims.claim("custom"), Some(&json!("value")));
    assert!(harness.validator.get_claim_set(None).is_err());

    Ok(())
}

// ============================================================================
// Issuer and subject
// ============================================================================

#[tokio::test]
async fn test_issuer_must_equal_consumer_key() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .with_issuer(TEST_CLIENT_ID_OTHER)
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::IssuerMismatch);
}

#[tokio::test]
async fn test_issuer_override() {
    let harness = ValidatorHarness::with_policy(ValidationPolicy {
        valid_issuer: Some("https://issuer.example".to_string()),
        ..test_policy()
    });

    let token = TestAssertionBuilder::new()
        .with_issuer("https://issuer.example")
        .sign_rsa(RSA_PRIVATE_KEY_A);
    harness.validate(&token).await.assert_accepted();

    // The consumer key is no longer accepted as issuer.
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);
    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::IssuerMismatch);
}

#[tokio::test]
async fn test_unregistered_subject_rejected() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .for_client(TEST_CLIENT_ID_OTHER)
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::UnknownClient);
    assert_eq!(harness.certificates.call_count(), 0);
}

// ============================================================================
// Mandatory claims
// ============================================================================

#[tokio::test]
async fn test_missing_mandatory_claim_rejected() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .without_claim("jti")
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::MissingMandatoryClaim);
    assert!(harness.jti_store.is_empty().await);
}

#[tokio::test]
async fn test_custom_mandatory_claim() {
    let harness = ValidatorHarness::with_policy(ValidationPolicy {
        mandatory_claims: vec!["iss".to_string(), "client_version".to_string()],
        ..test_policy()
    });

    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);
    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::MissingMandatoryClaim);

    let token = TestAssertionBuilder::new()
        .with_claim("client_version", json!("1.0"))
        .sign_rsa(RSA_PRIVATE_KEY_A);
    harness.validate(&token).await.assert_accepted();
}

/// With `jti` not mandatory, its absence is still fatal at the replay step.
#[tokio::test]
async fn test_missing_jti_when_not_mandatory() {
    let harness = ValidatorHarness::with_policy(ValidationPolicy {
        mandatory_claims: vec!["iss".to_string(), "sub".to_string()],
        ..test_policy()
    });
    let token = TestAssertionBuilder::new()
        .without_claim("jti")
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::MissingJti)
        .assert_message_contains("JTI cannot be found");
}

#[tokio::test]
async fn test_missing_exp_when_not_mandatory() {
    let harness = ValidatorHarness::with_policy(ValidationPolicy {
        mandatory_claims: vec![],
        ..test_policy()
    });
    let token = TestAssertionBuilder::new()
        .without_claim("exp")
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::MissingExpiration);
}

// ============================================================================
// Audience
// ============================================================================

#[tokio::test]
async fn test_wrong_audience_rejected() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .with_audiences(&[TEST_WRONG_AUDIENCE])
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::AudienceMismatch)
        .assert_message_contains(TEST_TOKEN_ENDPOINT);
    assert!(harness.jti_store.is_empty().await);
}

#[tokio::test]
async fn test_audience_override_skips_tenant_lookup() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);

    harness.validate(&token).await.assert_accepted();
    assert_eq!(harness.audiences.call_count(), 0);
}

#[tokio::test]
async fn test_tenant_token_endpoint_used_without_override() {
    let harness = ValidatorHarness::with_policy(ValidationPolicy {
        valid_audience: None,
        ..test_policy()
    });
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);

    harness.validate(&token).await.assert_accepted();
    assert_eq!(harness.audiences.call_count(), 1);
}

#[tokio::test]
async fn test_server_token_endpoint_used_when_tenant_has_none() {
    let harness = ValidatorHarness::builder()
        .policy(ValidationPolicy {
            valid_audience: None,
            ..test_policy()
        })
        .audiences(client_auth::resolvers::mock::StaticAudienceResolver::new())
        .build();

    let token = TestAssertionBuilder::new()
        .with_audiences(&[TEST_SERVER_TOKEN_ENDPOINT])
        .sign_rsa(RSA_PRIVATE_KEY_A);
    harness.validate(&token).await.assert_accepted();

    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);
    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::AudienceMismatch);
}

#[tokio::test]
async fn test_long_jti_accepted() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .with_jti(&"j".repeat(1024))
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness.validate(&token).await.assert_accepted();
}

// ============================================================================
// Time-based checks
// ============================================================================

#[tokio::test]
async fn test_expired_assertion_rejected() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .expires_in(-60)
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::Expired)
        .assert_message_contains("JWT Token is expired");
    assert!(harness.jti_store.is_empty().await);
}

/// Skew is added to the current time, so an assertion expiring inside the
/// skew window is already expired.
#[tokio::test]
async fn test_expiry_within_skew_rejected() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .expires_in(TEST_CLOCK_SKEW_SECONDS / 3)
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::Expired);
}

#[tokio::test]
async fn test_not_before_in_future_rejected() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .not_before_in(120)
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::NotYetValid);
}

#[tokio::test]
async fn test_not_before_in_past_accepted() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .not_before_in(-60)
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness.validate(&token).await.assert_accepted();
}

#[tokio::test]
async fn test_assertion_issued_too_long_ago_rejected() {
    let harness = ValidatorHarness::with_policy(ValidationPolicy {
        reject_before_in_minutes: 10,
        ..test_policy()
    });
    let token = TestAssertionBuilder::new()
        .issued_in(-15 * 60)
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::IssuedTooLongAgo)
        .assert_message_contains("too old");

    // The age check runs after the JTI is recorded.
    assert_eq!(harness.jti_store.len().await, 1);
}

#[tokio::test]
async fn test_issuance_age_check_disabled() {
    let harness = ValidatorHarness::with_policy(ValidationPolicy {
        reject_before_in_minutes: 0,
        ..test_policy()
    });
    let token = TestAssertionBuilder::new()
        .issued_in(-48 * 60 * 60)
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness.validate(&token).await.assert_accepted();
}

/// Validation at an explicit instant: the same assertion is accepted now and
/// expired ten minutes later.
#[tokio::test]
async fn test_validate_at_explicit_time() -> Result<(), anyhow::Error> {
    let harness = ValidatorHarness::with_policy(ValidationPolicy {
        prevent_token_reuse: false,
        enable_jti_cache: false,
        ..test_policy()
    });
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);
    let assertion = SignedAssertion::parse(&token)?;

    harness
        .validator
        .validate_at(Some(&assertion), Utc::now() + Duration::minutes(10))
        .await
        .assert_rejected_with(RejectionReason::Expired);
    harness
        .validator
        .validate_at(Some(&assertion), Utc::now())
        .await
        .assert_accepted();

    Ok(())
}

// ============================================================================
// Repeated rejections
// ============================================================================

/// Presenting a rejected assertion again yields the same rejection, and the
/// JTI is never recorded for rejections that precede the replay check.
#[tokio::test]
async fn test_repeated_rejection_is_stable() {
    let harness = ValidatorHarness::new();
    let cases = [
        (
            TestAssertionBuilder::new()
                .expires_in(-60)
                .sign_rsa(RSA_PRIVATE_KEY_A),
            RejectionReason::Expired,
        ),
        (
            TestAssertionBuilder::new()
                .not_before_in(120)
                .sign_rsa(RSA_PRIVATE_KEY_A),
            RejectionReason::NotYetValid,
        ),
        (
            TestAssertionBuilder::new()
                .with_audiences(&[TEST_WRONG_AUDIENCE])
                .sign_rsa(RSA_PRIVATE_KEY_A),
            RejectionReason::AudienceMismatch,
        ),
        (
            TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_B),
            RejectionReason::InvalidSignature,
        ),
    ];

    for (token, reason) in &cases {
        harness.validate(token).await.assert_rejected_with(*reason);
        harness.validate(token).await.assert_rejected_with(*reason);
    }

    assert!(harness.jti_store.is_empty().await);
}
