//! External collaborators of the assertion validator.
//!
//! Each lookup the validator depends on sits behind a trait so deployments can
//! back it with their own registry, key store or tenant configuration. Static
//! in-memory implementations live in [`mock`].

use crate::assertion::ClaimSet;
use crate::crypto::ClientCertificate;
use crate::errors::CollaboratorError;
use crate::models::ClientRecord;
use async_trait::async_trait;

/// Resolves a client identifier to its registered application.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    async fn find_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<ClientRecord>, CollaboratorError>;
}

/// Resolves the verification key registered for a client within a tenant.
#[async_trait]
pub trait CertificateResolver: Send + Sync {
    async fn resolve_certificate(
        &self,
        tenant_domain: &str,
        alias: &str,
    ) -> Result<Option<ClientCertificate>, CollaboratorError>;
}

/// Resolves the token endpoint URL a tenant expects as audience.
///
/// `Ok(None)` (or an empty string) means the tenant has none configured and
/// the server's own token endpoint applies.
#[async_trait]
pub trait AudienceResolver: Send + Sync {
    async fn resolve_token_endpoint(
        &self,
        tenant_domain: &str,
    ) -> Result<Option<String>, CollaboratorError>;
}

/// Chooses which claim identifies the client.
pub trait SubjectResolver: Send + Sync {
    fn resolve_subject(&self, claims: &ClaimSet) -> Option<String>;
}

/// Uses the `sub` claim verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSubjectResolver;

impl SubjectResolver for DefaultSubjectResolver {
    fn resolve_subject(&self, claims: &ClaimSet) -> Option<String> {
        claims.subject().map(ToString::to_string)
    }
}

/// Static and failure-injecting collaborators.
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Client registry backed by a fixed map.
    #[derive(Default)]
    pub struct StaticClientRegistry {
        clients: HashMap<String, ClientRecord>,
        return_error: bool,
        call_count: AtomicUsize,
    }

    impl StaticClientRegistry {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_client(mut self, record: ClientRecord) -> Self {
            self.clients.insert(record.consumer_key.clone(), record);
            self
        }

        /// Create a registry whose lookups always fail.
        pub fn failing() -> Self {
            Self {
                return_error: true,
                ..Self::default()
            }
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ClientRegistry for StaticClientRegistry {
        async fn find_by_client_id(
            &self,
            client_id: &str,
        ) -> Result<Option<ClientRecord>, CollaboratorError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.return_error {
                return Err(CollaboratorError::Registry(
                    "Mock client registry error".to_string(),
                ));
            }
            Ok(self.clients.get(client_id).cloned())
        }
    }

    /// Certificate resolver backed by a fixed `(tenant, alias)` map.
    #[derive(Default)]
    pub struct StaticCertificateResolver {
        certificates: HashMap<(String, String), ClientCertificate>,
        return_error: bool,
        call_count: AtomicUsize,
    }

    impl StaticCertificateResolver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_certificate(
            mut self,
            tenant_domain: &str,
            alias: &str,
            certificate: ClientCertificate,
        ) -> Self {
            self.certificates
                .insert((tenant_domain.to_string(), alias.to_string()), certificate);
            self
        }

        /// Create a resolver whose lookups always fail, as a locked or
        /// unreachable key store would.
        pub fn failing() -> Self {
            Self {
                return_error: true,
                ..Self::default()
            }
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CertificateResolver for StaticCertificateResolver {
        async fn resolve_certificate(
            &self,
            tenant_domain: &str,
            alias: &str,
        ) -> Result<Option<ClientCertificate>, CollaboratorError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.return_error {
                return Err(CollaboratorError::KeyStore(
                    "Mock key store error".to_string(),
                ));
            }
            Ok(self
                .certificates
                .get(&(tenant_domain.to_string(), alias.to_string()))
                .cloned())
        }
    }

    /// Audience resolver backed by a per-tenant map.
    #[derive(Default)]
    pub struct StaticAudienceResolver {
        endpoints: HashMap<String, String>,
        return_error: bool,
        call_count: AtomicUsize,
    }

    impl StaticAudienceResolver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_endpoint(mut self, tenant_domain: &str, token_endpoint: &str) -> Self {
            self.endpoints
                .insert(tenant_domain.to_string(), token_endpoint.to_string());
            self
        }

        /// Create a resolver whose lookups always fail.
        pub fn failing() -> Self {
            Self {
                return_error: true,
                ..Self::default()
            }
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AudienceResolver for StaticAudienceResolver {
        async fn resolve_token_endpoint(
            &self,
            tenant_domain: &str,
        ) -> Result<Option<String>, CollaboratorError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.return_error {
                return Err(CollaboratorError::TenantLookup(
                    "Mock tenant lookup error".to_string(),
                ));
            }
            Ok(self.endpoints.get(tenant_domain).cloned())
        }
    }
}
