//! Collaborator failures and substitutions
//!
//! Registry, key store and tenant lookups can fail independently. Each
//! failure maps to a fixed client-facing rejection and stops the pipeline.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use client_auth::assertion::ClaimSet;
use client_auth::config::ValidationPolicy;
use client_auth::models::ClientRecord;
use client_auth::resolvers::mock::{
    StaticAudienceResolver, StaticCertificateResolver, StaticClientRegistry,
};
use client_auth::resolvers::SubjectResolver;
use client_auth::{RejectionReason, SignedAssertion};
use client_auth_test_utils::*;
use std::sync::Arc;

#[tokio::test]
async fn test_registry_failure_rejects_as_unknown_client() {
    let harness = ValidatorHarness::builder()
        .clients(StaticClientRegistry::failing())
        .build();
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::UnknownClient)
        .assert_message_contains("The issuer or the subject of the assertion is invalid");
    assert_eq!(harness.clients.call_count(), 1);
    assert_eq!(harness.certificates.call_count(), 0);
}

#[tokio::test]
async fn test_inactive_client_rejected() {
    let mut record = ClientRecord::new(TEST_CLIENT_ID, TEST_TENANT);
    record.is_active = false;
    let harness = ValidatorHarness::builder()
        .clients(StaticClientRegistry::new().with_client(record))
        .build();
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::UnknownClient);
    assert_eq!(harness.certificates.call_count(), 0);
}

/// Key store errors are not surfaced to the client.
#[tokio::test]
async fn test_key_store_failure_rejects_as_certificate_unavailable() {
    let harness = ValidatorHarness::builder()
        .certificates(StaticCertificateResolver::failing())
        .build();
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);

    let result = harness.validate(&token).await;
    result
        .assert_rejected_with(RejectionReason::CertificateUnavailable)
        .assert_message_contains("Unable to locate certificate for JWT.");
    assert!(!result.unwrap_err().message().contains("Mock"));
}

#[tokio::test]
async fn test_tenant_lookup_failure_rejects() {
    let harness = ValidatorHarness::builder()
        .policy(ValidationPolicy {
            valid_audience: None,
            ..test_policy()
        })
        .audiences(StaticAudienceResolver::failing())
        .build();
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::AudienceUnavailable);
    assert!(harness.jti_store.is_empty().await);
}

/// An empty audience override is treated as unset.
#[tokio::test]
async fn test_empty_audience_override_falls_back_to_tenant() {
    let harness = ValidatorHarness::with_policy(ValidationPolicy {
        valid_audience: Some(String::new()),
        ..test_policy()
    });
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);

    harness.validate(&token).await.assert_accepted();
    assert_eq!(harness.audiences.call_count(), 1);
}

/// Deployments may identify the client by a claim other than `sub`.
struct ClaimSubjectResolver(&'static str);

impl SubjectResolver for ClaimSubjectResolver {
    fn resolve_subject(&self, claims: &ClaimSet) -> Option<String> {
        claims
            .claim(self.0)
            .and_then(|value| value.as_str())
            .map(ToString::to_string)
    }
}

#[tokio::test]
async fn test_custom_subject_resolver() -> Result<(), anyhow::Error> {
    let harness = ValidatorHarness::new();
    let validator = harness
        .validator
        .with_subject_resolver(Arc::new(ClaimSubjectResolver("client_id")));

    let token = TestAssertionBuilder::new()
        .with_claim("client_id", serde_json::json!(TEST_CLIENT_ID))
        .sign_rsa(RSA_PRIVATE_KEY_A);
    let assertion = SignedAssertion::parse(&token)?;
    validator.validate(Some(&assertion)).await.assert_accepted();

    // No `client_id` claim: no subject, no registry lookup.
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);
    let assertion = SignedAssertion::parse(&token)?;
    validator
        .validate(Some(&assertion))
        .await
        .assert_rejected_with(RejectionReason::UnknownClient);
    assert_eq!(harness.clients.call_count(), 1);

    Ok(())
}
