//! Signature verification for client assertions.
//!
//! Only the RSA PKCS#1 v1.5 family (RS256, RS384, RS512) is accepted. The
//! `alg` header is checked against that allow-list before any key material is
//! touched, so `none`, HMAC and ECDSA assertions are rejected without a
//! verification attempt.

use crate::assertion::SignedAssertion;
use crate::errors::{AuthenticationError, RejectionReason};
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk};
use jsonwebtoken::{Algorithm, DecodingKey};
use std::fmt;
use tracing::instrument;

/// Public key material registered for a client.
#[derive(Clone)]
pub enum ClientCertificate {
    /// PEM-encoded RSA public key (`BEGIN PUBLIC KEY` or `BEGIN RSA PUBLIC KEY`).
    Pem(String),
    /// A single JSON Web Key.
    Jwk(Jwk),
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientCertificate::Pem(_) => f.write_str("ClientCertificate::Pem(..)"),
            ClientCertificate::Jwk(jwk) => f
                .debug_struct("ClientCertificate::Jwk")
                .field("kid", &jwk.common.key_id)
                .finish(),
        }
    }
}

impl ClientCertificate {
    /// Build an RSA decoding key. Non-RSA material is an incompatible key.
    fn rsa_decoding_key(&self) -> Result<DecodingKey, AuthenticationError> {
        match self {
            ClientCertificate::Pem(pem) => DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
                tracing::debug!(target: "client_auth.crypto", error = %e, "Certificate is not an RSA public key");
                incompatible_key()
            }),
            ClientCertificate::Jwk(jwk) => match &jwk.algorithm {
                AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                    .map_err(|e| {
                        tracing::debug!(target: "client_auth.crypto", error = %e, "Invalid RSA JWK components");
                        incompatible_key()
                    }),
                _ => {
                    tracing::debug!(target: "client_auth.crypto", "JWK is not an RSA key");
                    Err(incompatible_key())
                }
            },
        }
    }
}

fn incompatible_key() -> AuthenticationError {
    AuthenticationError::new(
        RejectionReason::IncompatibleKey,
        "Public key is not an RSA public key.",
    )
}

/// Map a header `alg` value to a supported RSA algorithm.
///
/// Returns `None` for anything outside RS256, RS384 and RS512, including
/// `none` and the PS family.
pub fn supported_algorithm(alg: &str) -> Option<Algorithm> {
    match alg {
        "RS256" => Some(Algorithm::RS256),
        "RS384" => Some(Algorithm::RS384),
        "RS512" => Some(Algorithm::RS512),
        _ => None,
    }
}

/// Verify the assertion signature with the client's registered key.
///
/// # Errors
///
/// - `CertificateUnavailable` - no key material was supplied
/// - `UnsupportedAlgorithm` - `alg` is missing or not in the RSA allow-list
/// - `IncompatibleKey` - the key is not an RSA public key
/// - `InvalidSignature` - the signature does not verify
#[instrument(skip_all, fields(alg))]
pub fn verify_signature(
    assertion: &SignedAssertion,
    certificate: Option<&ClientCertificate>,
) -> Result<(), AuthenticationError> {
    let Some(certificate) = certificate else {
        tracing::debug!(target: "client_auth.crypto", "No certificate available for client");
        return Err(AuthenticationError::new(
            RejectionReason::CertificateUnavailable,
            "Unable to locate certificate for JWT.",
        ));
    };

    let alg = assertion.header().alg.as_deref().unwrap_or_default();
    tracing::Span::current().record("alg", alg);

    let Some(algorithm) = supported_algorithm(alg) else {
        tracing::debug!(target: "client_auth.crypto", alg = %alg, "Signature algorithm not supported");
        return Err(AuthenticationError::new(
            RejectionReason::UnsupportedAlgorithm,
            format!("Signature Algorithm not supported yet : {alg}"),
        ));
    };

    let key = certificate.rsa_decoding_key()?;

    let verified = jsonwebtoken::crypto::verify(
        assertion.signature(),
        assertion.signing_input().as_bytes(),
        &key,
        algorithm,
    )
    .map_err(|e| {
        tracing::debug!(target: "client_auth.crypto", error = %e, "Signature verification failed");
        invalid_signature()
    })?;

    if !verified {
        tracing::debug!(target: "client_auth.crypto", "Signature does not match");
        return Err(invalid_signature());
    }

    Ok(())
}

fn invalid_signature() -> AuthenticationError {
    AuthenticationError::new(
        RejectionReason::InvalidSignature,
        "Signature or Message Authentication invalid.",
    )
}
