//! # Client Auth Test Utilities
//!
//! Shared test utilities for client assertion validation.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed RSA keys, JWKs)
//! - Assertion builders that sign real JWTs (TestAssertionBuilder)
//! - A validator harness with in-memory collaborators (ValidatorHarness)
//! - Fixed test IDs (client, tenant, endpoints)
//! - Custom assertions (ValidationAssertions trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use client_auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let harness = ValidatorHarness::new();
//!     let token = TestAssertionBuilder::new()
//!         .with_jti("abc")
//!         .sign_rsa(RSA_PRIVATE_KEY_A);
//!
//!     harness.validate(&token).await.assert_accepted();
//! }
//! ```

pub mod assertion_builders;
pub mod assertions;
pub mod crypto_fixtures;
pub mod harness;
pub mod test_ids;

// Re-export commonly used items
pub use assertion_builders::*;
pub use assertions::*;
pub use crypto_fixtures::*;
pub use harness::*;
pub use test_ids::*;
