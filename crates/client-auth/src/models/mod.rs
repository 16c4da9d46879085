use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Registered OAuth client, as resolved from the client registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    /// OAuth client identifier. `iss` and `sub` must equal it.
    pub consumer_key: String,
    pub tenant_domain: String,
    pub application_name: String,
    pub is_active: bool,
}

impl ClientRecord {
    pub fn new(consumer_key: &str, tenant_domain: &str) -> Self {
        Self {
            consumer_key: consumer_key.to_string(),
            tenant_domain: tenant_domain.to_string(),
            application_name: consumer_key.to_string(),
            is_active: true,
        }
    }
}

/// Durable replay record (maps to jwt_jti_entries table)
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct JtiRecord {
    pub jti: String,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
}
