//! Fixed test identifiers for deterministic tests

// Clients
pub const TEST_CLIENT_ID: &str = "client1";
pub const TEST_CLIENT_ID_OTHER: &str = "client2";

// Tenants
pub const TEST_TENANT: &str = "carbon.super";
pub const TEST_TENANT_OTHER: &str = "acme.example";

// Audiences
pub const TEST_TOKEN_ENDPOINT: &str = "https://idp/token";
pub const TEST_SERVER_TOKEN_ENDPOINT: &str = "https://localhost:9443/oauth2/token";
pub const TEST_WRONG_AUDIENCE: &str = "https://wrong-host/token";

/// Clock skew used by the harness. Kept small so that the default five minute
/// assertion lifetime is not consumed by the skew window.
pub const TEST_CLOCK_SKEW_SECONDS: i64 = 30;
