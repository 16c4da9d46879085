//! Client assertion validation pipeline.
//!
//! One call runs a fixed sequence of checks and stops at the first failure:
//!
//! 1. claim set present and parsable
//! 2. subject resolved from the claims
//! 3. registered client found for the subject
//! 4. verification key resolved for the client's tenant
//! 5. signature verified
//! 6. issuer, 7. subject bound to the consumer key
//! 8. mandatory claims present
//! 9. expected audience resolved, 10. audience matched
//! 11. not expired, 12. not before `nbf`
//! 13. JTI checked and recorded by the replay registry
//! 14. not issued too long ago
//!
//! The JTI step is the only one with side effects, so it runs after every
//! other check that can reject the assertion on its own, except the issuance
//! age check.

use crate::assertion::{ClaimSet, SignedAssertion};
use crate::config::{ServerSettings, ValidationPolicy};
use crate::crypto::verify_signature;
use crate::errors::{AuthenticationError, RejectionReason};
use crate::models::ClientRecord;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_assertion_validation;
use crate::replay::{JtiStore, ReplayRegistry};
use crate::resolvers::{
    AudienceResolver, CertificateResolver, ClientRegistry, DefaultSubjectResolver,
    SubjectResolver,
};
use crate::validators;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Client assertion type this validator handles (RFC 7523 section 2.2).
pub const CLIENT_ASSERTION_TYPE_JWT_BEARER: &str =
    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Validates client assertions against a fixed policy.
///
/// Policy and collaborators are bound at construction and never change for
/// the lifetime of the instance. Safe to share across tasks behind an `Arc`.
pub struct AssertionValidator {
    policy: ValidationPolicy,
    settings: ServerSettings,
    clients: Arc<dyn ClientRegistry>,
    certificates: Arc<dyn CertificateResolver>,
    audiences: Arc<dyn AudienceResolver>,
    subjects: Arc<dyn SubjectResolver>,
    replay: ReplayRegistry,
}

impl AssertionValidator {
    /// Create a validator. The replay registry's mode and cache tier follow
    /// `policy`; `jti_store` is its durable tier.
    pub fn new(
        policy: ValidationPolicy,
        settings: ServerSettings,
        clients: Arc<dyn ClientRegistry>,
        certificates: Arc<dyn CertificateResolver>,
        audiences: Arc<dyn AudienceResolver>,
        jti_store: Arc<dyn JtiStore>,
    ) -> Self {
        let replay = ReplayRegistry::from_policy(&policy, jti_store);

        tracing::debug!(
            target: "client_auth.validator",
            prevent_token_reuse = policy.prevent_token_reuse,
            enable_jti_cache = policy.enable_jti_cache,
            audience_override = policy.valid_audience.is_some(),
            issuer_override = policy.valid_issuer.is_some(),
            "Assertion validator created"
        );

        Self {
            policy,
            settings,
            clients,
            certificates,
            audiences,
            subjects: Arc::new(DefaultSubjectResolver),
            replay,
        }
    }

    /// Replace the subject resolver (default: the `sub` claim).
    pub fn with_subject_resolver(mut self, subjects: Arc<dyn SubjectResolver>) -> Self {
        self.subjects = subjects;
        self
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn replay_registry(&self) -> &ReplayRegistry {
        &self.replay
    }

    /// Validate an assertion, returning `Ok(true)` when it is accepted.
    ///
    /// Never returns `Ok(false)`: every rejection is an error carrying the
    /// reason.
    pub async fn is_valid_assertion(
        &self,
        assertion: Option<&SignedAssertion>,
    ) -> Result<bool, AuthenticationError> {
        self.validate(assertion).await.map(|()| true)
    }

    /// Parse a raw `client_assertion` value and validate it.
    pub async fn validate_token(&self, token: &str) -> Result<(), AuthenticationError> {
        let start = Instant::now();
        match SignedAssertion::parse(token) {
            Ok(assertion) => self.validate(Some(&assertion)).await,
            Err(e) => {
                record_assertion_validation("error", Some(e.reason().as_str()), start.elapsed());
                Err(e)
            }
        }
    }

    /// Validate an assertion at the current time.
    pub async fn validate(
        &self,
        assertion: Option<&SignedAssertion>,
    ) -> Result<(), AuthenticationError> {
        self.validate_at(assertion, Utc::now()).await
    }

    /// Validate an assertion as of `now`.
    #[instrument(skip_all, name = "client_auth.validate_assertion", fields(client = tracing::field::Empty))]
    pub async fn validate_at(
        &self,
        assertion: Option<&SignedAssertion>,
        now: DateTime<Utc>,
    ) -> Result<(), AuthenticationError> {
        let start = Instant::now();
        let result = self.run_pipeline(assertion, now).await;

        match &result {
            Ok(()) => {
                tracing::debug!(target: "client_auth.validator", "Client assertion accepted");
                record_assertion_validation("success", None, start.elapsed());
            }
            Err(e) => {
                tracing::debug!(
                    target: "client_auth.validator",
                    reason = e.reason().as_str(),
                    "Client assertion rejected"
                );
                record_assertion_validation("error", Some(e.reason().as_str()), start.elapsed());
            }
        }

        result
    }

    /// Retrieve the claim set of an assertion.
    pub fn get_claim_set(
        &self,
        assertion: Option<&SignedAssertion>,
    ) -> Result<ClaimSet, AuthenticationError> {
        assertion.ok_or_else(no_assertion)?.claim_set()
    }

    async fn run_pipeline(
        &self,
        assertion: Option<&SignedAssertion>,
        now: DateTime<Utc>,
    ) -> Result<(), AuthenticationError> {
        let assertion = assertion.ok_or_else(no_assertion)?;
        let claims = assertion.claim_set()?;
        let skew = self.settings.clock_skew;

        let subject = self.subjects.resolve_subject(&claims).ok_or_else(|| {
            tracing::debug!(target: "client_auth.validator", "Assertion carries no subject");
            invalid_client()
        })?;
        tracing::Span::current().record("client", hash_for_correlation(&subject).as_str());

        let client = self.resolve_client(&subject).await?;

        let certificate = self
            .certificates
            .resolve_certificate(&client.tenant_domain, &subject)
            .await
            .map_err(|e| {
                tracing::debug!(target: "client_auth.validator", error = %e, "Certificate resolution failed");
                AuthenticationError::new(
                    RejectionReason::CertificateUnavailable,
                    "Unable to locate certificate for JWT.",
                )
            })?;

        verify_signature(assertion, certificate.as_ref())?;

        validators::validate_issuer(
            claims.issuer(),
            &client.consumer_key,
            self.policy.valid_issuer.as_deref(),
        )?;
        validators::validate_subject(Some(&subject), &client.consumer_key)?;
        validators::validate_mandatory_claims(&claims, &self.policy.mandatory_claims)?;

        let expected_audience = self.resolve_expected_audience(&client.tenant_domain).await?;
        validators::validate_audience(claims.audience(), &expected_audience)?;

        let expires_at = validators::validate_expiration(claims.expiration_time(), now, skew)?;
        validators::validate_not_before(claims.not_before(), now, skew)?;

        let jti = claims.jwt_id().ok_or_else(|| {
            tracing::debug!(target: "client_auth.validator", "JTI missing");
            AuthenticationError::new(
                RejectionReason::MissingJti,
                "JTI cannot be found in the Assertion.",
            )
        })?;
        self.replay
            .check_and_record(jti, now, skew, expires_at, claims.issued_at())
            .await?;

        validators::validate_issuance_age(
            claims.issued_at(),
            now,
            skew,
            self.policy.reject_before_in_minutes,
        )?;

        Ok(())
    }

    async fn resolve_client(&self, subject: &str) -> Result<ClientRecord, AuthenticationError> {
        let client = self
            .clients
            .find_by_client_id(subject)
            .await
            .map_err(|e| {
                tracing::debug!(target: "client_auth.validator", error = %e, "Client registry lookup failed");
                invalid_client()
            })?
            .ok_or_else(|| {
                tracing::debug!(target: "client_auth.validator", "No registered client for subject");
                invalid_client()
            })?;

        if !client.is_active {
            tracing::debug!(target: "client_auth.validator", "Registered client is inactive");
            return Err(invalid_client());
        }

        Ok(client)
    }

    /// Policy override, else the tenant token endpoint, else the server's own.
    async fn resolve_expected_audience(
        &self,
        tenant_domain: &str,
    ) -> Result<String, AuthenticationError> {
        if let Some(audience) = self.policy.valid_audience.as_deref().filter(|a| !a.is_empty()) {
            return Ok(audience.to_string());
        }

        match self.audiences.resolve_token_endpoint(tenant_domain).await {
            Ok(Some(endpoint)) if !endpoint.is_empty() => Ok(endpoint),
            Ok(_) => Ok(self.settings.token_endpoint.clone()),
            Err(e) => {
                tracing::debug!(target: "client_auth.validator", error = %e, "Token endpoint lookup failed");
                Err(AuthenticationError::new(
                    RejectionReason::AudienceUnavailable,
                    "Error while loading the token endpoint URL of the tenant.",
                ))
            }
        }
    }
}

fn no_assertion() -> AuthenticationError {
    tracing::debug!(target: "client_auth.validator", "No assertion supplied");
    AuthenticationError::new(
        RejectionReason::MalformedAssertion,
        format!("No valid JWT assertion found for {CLIENT_ASSERTION_TYPE_JWT_BEARER}"),
    )
}

fn invalid_client() -> AuthenticationError {
    AuthenticationError::new(
        RejectionReason::UnknownClient,
        "The issuer or the subject of the assertion is invalid.",
    )
}
