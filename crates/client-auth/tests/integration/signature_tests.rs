//! Signature verification through the full pipeline
//!
//! Only RS256/RS384/RS512 are accepted, and the algorithm is checked before
//! any claim validation runs.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use client_auth::crypto::ClientCertificate;
use client_auth::resolvers::mock::StaticCertificateResolver;
use client_auth::RejectionReason;
use client_auth_test_utils::*;
use jsonwebtoken::Algorithm;

#[tokio::test]
async fn test_rs384_and_rs512_accepted() {
    let harness = ValidatorHarness::new();

    for alg in [Algorithm::RS384, Algorithm::RS512] {
        let token = TestAssertionBuilder::new()
            .with_algorithm(alg)
            .sign_rsa(RSA_PRIVATE_KEY_A);
        harness.validate(&token).await.assert_accepted();
    }
}

/// An HS256 assertion with a wrong issuer and audience fails on the
/// algorithm, not on either claim.
#[tokio::test]
async fn test_hs256_rejected_before_claim_checks() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new()
        .with_issuer(TEST_CLIENT_ID_OTHER)
        .with_audiences(&[TEST_WRONG_AUDIENCE])
        .sign_hs256(TEST_HMAC_SECRET);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::UnsupportedAlgorithm)
        .assert_message_contains("HS256");
    assert_eq!(harness.audiences.call_count(), 0);
    assert!(harness.jti_store.is_empty().await);
}

#[tokio::test]
async fn test_unsecured_assertion_rejected() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new().unsigned();

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::UnsupportedAlgorithm);
    assert!(harness.jti_store.is_empty().await);
}

#[tokio::test]
async fn test_signature_by_other_key_rejected() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_B);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::InvalidSignature)
        .assert_message_contains("Signature or Message Authentication invalid");
}

#[tokio::test]
async fn test_tampered_payload_rejected() {
    let harness = ValidatorHarness::new();
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);
    let other = TestAssertionBuilder::new()
        .with_jti("forged")
        .sign_rsa(RSA_PRIVATE_KEY_B);

    // Header and payload of `other`, signature of `token`.
    let (other_input, _) = other.rsplit_once('.').unwrap();
    let (_, signature) = token.rsplit_once('.').unwrap();
    let forged = format!("{other_input}.{signature}");

    harness
        .validate(&forged)
        .await
        .assert_rejected_with(RejectionReason::InvalidSignature);
}

#[tokio::test]
async fn test_missing_certificate_rejected() {
    let harness = ValidatorHarness::builder()
        .certificates(StaticCertificateResolver::new())
        .build();
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::CertificateUnavailable)
        .assert_message_contains("Unable to locate certificate");
}

#[tokio::test]
async fn test_jwk_certificate_accepted() {
    let harness = ValidatorHarness::builder()
        .certificates(StaticCertificateResolver::new().with_certificate(
            TEST_TENANT,
            TEST_CLIENT_ID,
            ClientCertificate::Jwk(rsa_jwk_a()),
        ))
        .build();
    let token = TestAssertionBuilder::new()
        .with_kid("client1-key-a")
        .sign_rsa(RSA_PRIVATE_KEY_A);

    harness.validate(&token).await.assert_accepted();
}

#[tokio::test]
async fn test_non_rsa_certificate_rejected() {
    let harness = ValidatorHarness::builder()
        .certificates(StaticCertificateResolver::new().with_certificate(
            TEST_TENANT,
            TEST_CLIENT_ID,
            ClientCertificate::Jwk(ec_p256_jwk()),
        ))
        .build();
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::IncompatibleKey);
}

/// The key is looked up under the client's tenant, with the client ID as
/// alias.
#[tokio::test]
async fn test_certificate_resolved_in_client_tenant() {
    let harness = ValidatorHarness::builder()
        .certificates(StaticCertificateResolver::new().with_certificate(
            TEST_TENANT_OTHER,
            TEST_CLIENT_ID,
            ClientCertificate::Pem(RSA_PUBLIC_KEY_A.to_string()),
        ))
        .build();
    let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);

    harness
        .validate(&token)
        .await
        .assert_rejected_with(RejectionReason::CertificateUnavailable);
    assert_eq!(harness.certificates.call_count(), 1);
}
