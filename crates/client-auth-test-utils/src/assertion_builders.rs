//! Builder patterns for test assertion construction
//!
//! Produces real, signed client assertions in JWS compact form.

use crate::test_ids::{TEST_CLIENT_ID, TEST_TOKEN_ENDPOINT};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::rand::{SecureRandom, SystemRandom};
use serde_json::{json, Map, Value};

/// Builder for client assertions
///
/// Defaults describe an assertion the test harness accepts: `iss` and `sub`
/// are the test client, `aud` is the test token endpoint, `exp` is five
/// minutes out, `iat` is now and `jti` is random.
///
/// # Example
/// ```rust,ignore
/// let token = TestAssertionBuilder::new()
///     .for_client("client1")
///     .with_jti("abc")
///     .expires_in(300)
///     .sign_rsa(RSA_PRIVATE_KEY_A);
/// ```
pub struct TestAssertionBuilder {
    claims: Map<String, Value>,
    alg: Algorithm,
    kid: Option<String>,
}

impl TestAssertionBuilder {
    /// Create a new assertion builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(TEST_CLIENT_ID));
        claims.insert("sub".to_string(), json!(TEST_CLIENT_ID));
        claims.insert("aud".to_string(), json!([TEST_TOKEN_ENDPOINT]));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(300)).timestamp()),
        );
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert("jti".to_string(), json!(random_jti()));

        Self {
            claims,
            alg: Algorithm::RS256,
            kid: None,
        }
    }

    /// Set both `iss` and `sub`
    pub fn for_client(self, client_id: &str) -> Self {
        self.with_issuer(client_id).with_subject(client_id)
    }

    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", json!(issuer))
    }

    pub fn with_subject(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    /// Set a single audience value (serialized as a plain string)
    pub fn with_audience(self, audience: &str) -> Self {
        self.with_claim("aud", json!(audience))
    }

    /// Set several audience values (serialized as an array)
    pub fn with_audiences(self, audiences: &[&str]) -> Self {
        self.with_claim("aud", json!(audiences))
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("exp", json!(exp))
    }

    /// Set `nbf` in seconds from now
    pub fn not_before_in(self, seconds: i64) -> Self {
        let nbf = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("nbf", json!(nbf))
    }

    /// Set `iat` in seconds relative to now (negative for the past)
    pub fn issued_in(self, seconds: i64) -> Self {
        let iat = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("iat", json!(iat))
    }

    pub fn with_jti(self, jti: &str) -> Self {
        self.with_claim("jti", json!(jti))
    }

    /// Set or replace any claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim entirely
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    pub fn with_algorithm(mut self, alg: Algorithm) -> Self {
        self.alg = alg;
        self
    }

    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    /// Build the claims as a JSON value
    pub fn build_claims(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Sign with an RSA private key (PKCS#8 or PKCS#1 PEM) using the
    /// configured RS* algorithm
    pub fn sign_rsa(self, private_key_pem: &str) -> String {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .expect("Fixture RSA key should load");
        let mut header = Header::new(self.alg);
        header.kid = self.kid.clone();

        encode(&header, &self.build_claims(), &key).expect("Assertion signing should succeed")
    }

    /// Sign with HS256, which the validator must refuse
    pub fn sign_hs256(self, secret: &[u8]) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = self.kid.clone();

        encode(&header, &self.build_claims(), &EncodingKey::from_secret(secret))
            .expect("Assertion signing should succeed")
    }

    /// Produce an unsecured assertion (`alg: none`, empty signature)
    pub fn unsigned(self) -> String {
        let header = URL_SAFE_NO_PAD.encode(json!({"alg": "none", "typ": "JWT"}).to_string());
        let payload = URL_SAFE_NO_PAD.encode(self.build_claims().to_string());
        format!("{}.{}.", header, payload)
    }
}

impl Default for TestAssertionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Random 128-bit JTI, base64url encoded
pub fn random_jti() -> String {
    let mut bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut bytes)
        .expect("System RNG should be available");
    URL_SAFE_NO_PAD.encode(bytes)
}
