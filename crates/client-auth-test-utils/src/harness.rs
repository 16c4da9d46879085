//! Validator test harness
//!
//! Wires an [`AssertionValidator`] to in-memory collaborators: one registered
//! client (`client1` in `carbon.super`) whose key is RSA key A, a tenant
//! token endpoint, and an in-memory JTI store.
//!
//! # Example
//! ```rust,ignore
//! let harness = ValidatorHarness::new();
//! let token = TestAssertionBuilder::new().sign_rsa(RSA_PRIVATE_KEY_A);
//! harness.validate(&token).await.assert_accepted();
//! ```

use crate::crypto_fixtures::RSA_PUBLIC_KEY_A;
use crate::test_ids::{
    TEST_CLIENT_ID, TEST_CLOCK_SKEW_SECONDS, TEST_SERVER_TOKEN_ENDPOINT, TEST_TENANT,
    TEST_TOKEN_ENDPOINT,
};
use client_auth::config::{ServerSettings, ValidationPolicy};
use client_auth::crypto::ClientCertificate;
use client_auth::errors::AuthenticationError;
use client_auth::models::ClientRecord;
use client_auth::replay::{InMemoryJtiStore, JtiStore};
use client_auth::resolvers::mock::{
    StaticAudienceResolver, StaticCertificateResolver, StaticClientRegistry,
};
use client_auth::AssertionValidator;
use std::sync::Arc;

/// Policy matching the default configuration, with the audience pinned to
/// the test token endpoint.
pub fn test_policy() -> ValidationPolicy {
    ValidationPolicy {
        valid_audience: Some(TEST_TOKEN_ENDPOINT.to_string()),
        ..ValidationPolicy::default()
    }
}

pub fn test_server_settings() -> ServerSettings {
    ServerSettings::new(TEST_SERVER_TOKEN_ENDPOINT, TEST_CLOCK_SKEW_SECONDS)
}

/// Collaborators with `client1` registered under `carbon.super`.
pub fn default_clients() -> StaticClientRegistry {
    StaticClientRegistry::new().with_client(ClientRecord::new(TEST_CLIENT_ID, TEST_TENANT))
}

pub fn default_certificates() -> StaticCertificateResolver {
    StaticCertificateResolver::new().with_certificate(
        TEST_TENANT,
        TEST_CLIENT_ID,
        ClientCertificate::Pem(RSA_PUBLIC_KEY_A.to_string()),
    )
}

pub fn default_audiences() -> StaticAudienceResolver {
    StaticAudienceResolver::new().with_endpoint(TEST_TENANT, TEST_TOKEN_ENDPOINT)
}

/// A validator plus handles on its collaborators.
pub struct ValidatorHarness {
    pub validator: AssertionValidator,
    pub clients: Arc<StaticClientRegistry>,
    pub certificates: Arc<StaticCertificateResolver>,
    pub audiences: Arc<StaticAudienceResolver>,
    /// The durable tier, unless replaced through the builder.
    pub jti_store: Arc<InMemoryJtiStore>,
}

impl ValidatorHarness {
    /// Harness with [`test_policy`] and default collaborators.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_policy(policy: ValidationPolicy) -> Self {
        Self::builder().policy(policy).build()
    }

    pub fn builder() -> ValidatorHarnessBuilder {
        ValidatorHarnessBuilder::default()
    }

    /// Parse and validate a raw assertion.
    pub async fn validate(&self, token: &str) -> Result<(), AuthenticationError> {
        self.validator.validate_token(token).await
    }
}

impl Default for ValidatorHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ValidatorHarnessBuilder {
    policy: ValidationPolicy,
    settings: ServerSettings,
    clients: StaticClientRegistry,
    certificates: StaticCertificateResolver,
    audiences: StaticAudienceResolver,
    jti_store: Option<Arc<dyn JtiStore>>,
}

impl Default for ValidatorHarnessBuilder {
    fn default() -> Self {
        Self {
            policy: test_policy(),
            settings: test_server_settings(),
            clients: default_clients(),
            certificates: default_certificates(),
            audiences: default_audiences(),
            jti_store: None,
        }
    }
}

impl ValidatorHarnessBuilder {
    pub fn policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn settings(mut self, settings: ServerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn clients(mut self, clients: StaticClientRegistry) -> Self {
        self.clients = clients;
        self
    }

    pub fn certificates(mut self, certificates: StaticCertificateResolver) -> Self {
        self.certificates = certificates;
        self
    }

    pub fn audiences(mut self, audiences: StaticAudienceResolver) -> Self {
        self.audiences = audiences;
        self
    }

    /// Replace the in-memory durable tier (e.g. with a failing store).
    pub fn jti_store(mut self, store: Arc<dyn JtiStore>) -> Self {
        self.jti_store = Some(store);
        self
    }

    pub fn build(self) -> ValidatorHarness {
        let clients = Arc::new(self.clients);
        let certificates = Arc::new(self.certificates);
        let audiences = Arc::new(self.audiences);
        let memory_store = Arc::new(InMemoryJtiStore::new());
        let store: Arc<dyn JtiStore> = match self.jti_store {
            Some(store) => store,
            None => memory_store.clone(),
        };

        let validator = AssertionValidator::new(
            self.policy,
            self.settings,
            clients.clone(),
            certificates.clone(),
            audiences.clone(),
            store,
        );

        ValidatorHarness {
            validator,
            clients,
            certificates,
            audiences,
            jti_store: memory_store,
        }
    }
}
