//! Client assertion validation (`private_key_jwt`, RFC 7523).
//!
//! Decides whether a signed client assertion proves possession of a
//! registered client's RSA key, was issued for this server, is fresh, and has
//! not been replayed.
//!
//! # Modules
//!
//! - `assertion` - Parsed assertions and claim sets
//! - `config` - Validation policy and server settings
//! - `crypto` - RSA signature verification
//! - `errors` - Error types
//! - `models` - Data models
//! - `observability` - Metrics and log field hashing
//! - `replay` - JTI replay registry (cache and durable tiers)
//! - `repositories` - PostgreSQL durable JTI store
//! - `resolvers` - External collaborator traits
//! - `services` - The validation pipeline
//! - `validators` - Individual claim checks

pub mod assertion;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod models;
pub mod observability;
pub mod replay;
pub mod repositories;
pub mod resolvers;
pub mod services;
pub mod validators;

pub use assertion::{ClaimSet, SignedAssertion};
pub use errors::{AuthenticationError, RejectionReason};
pub use services::AssertionValidator;
