use serde::Serialize;
use thiserror::Error;

/// OAuth 2.0 error code carried by every client authentication rejection.
pub const INVALID_REQUEST: &str = "invalid_request";

/// Why an assertion was rejected.
///
/// Bounded set used for metric labels and for callers that need to branch on
/// the rejection category. The wire-level error code is the same for all of
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    MalformedAssertion,
    UnknownClient,
    CertificateUnavailable,
    UnsupportedAlgorithm,
    IncompatibleKey,
    InvalidSignature,
    IssuerMismatch,
    SubjectMismatch,
    MissingMandatoryClaim,
    AudienceUnavailable,
    AudienceMismatch,
    MissingExpiration,
    Expired,
    NotYetValid,
    MissingJti,
    Replayed,
    IssuedTooLongAgo,
    Internal,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::MalformedAssertion => "malformed_assertion",
            RejectionReason::UnknownClient => "unknown_client",
            RejectionReason::CertificateUnavailable => "certificate_unavailable",
            RejectionReason::UnsupportedAlgorithm => "unsupported_algorithm",
            RejectionReason::IncompatibleKey => "incompatible_key",
            RejectionReason::InvalidSignature => "invalid_signature",
            RejectionReason::IssuerMismatch => "issuer_mismatch",
            RejectionReason::SubjectMismatch => "subject_mismatch",
            RejectionReason::MissingMandatoryClaim => "missing_mandatory_claim",
            RejectionReason::AudienceUnavailable => "audience_unavailable",
            RejectionReason::AudienceMismatch => "audience_mismatch",
            RejectionReason::MissingExpiration => "missing_expiration",
            RejectionReason::Expired => "expired",
            RejectionReason::NotYetValid => "not_yet_valid",
            RejectionReason::MissingJti => "missing_jti",
            RejectionReason::Replayed => "replayed",
            RejectionReason::IssuedTooLongAgo => "issued_too_long_ago",
            RejectionReason::Internal => "internal",
        }
    }
}

/// Client authentication failure.
///
/// Every rejection in the validation pipeline is reported through this single
/// type. The message is safe to return to the client; collaborator failure
/// detail is logged, never embedded here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AuthenticationError {
    code: &'static str,
    reason: RejectionReason,
    message: String,
}

impl AuthenticationError {
    pub fn new(reason: RejectionReason, message: impl Into<String>) -> Self {
        Self {
            code: INVALID_REQUEST,
            reason,
            message: message.into(),
        }
    }

    /// Machine-readable OAuth 2.0 error code.
    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn reason(&self) -> RejectionReason {
        self.reason
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Build the RFC 6749 section 5.2 error body for the token endpoint.
    pub fn to_oauth_error(&self) -> OAuthErrorResponse {
        OAuthErrorResponse {
            error: self.code.to_string(),
            error_description: self.message.clone(),
        }
    }
}

/// OAuth 2.0 token endpoint error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    pub error_description: String,
}

/// Failure reported by an external collaborator (client registry, key store,
/// tenant or audience lookup).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Client registry error: {0}")]
    Registry(String),

    #[error("Key store error: {0}")]
    KeyStore(String),

    #[error("Tenant lookup error: {0}")]
    TenantLookup(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by a durable JTI store.
#[derive(Debug, Error)]
pub enum JtiStoreError {
    /// Insert-if-absent found an existing record for the JTI.
    #[error("JTI is already recorded")]
    DuplicateJti,

    #[error("Database error: {0}")]
    Database(String),
}
