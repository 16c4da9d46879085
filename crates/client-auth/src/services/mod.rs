//! Service layer.
//!
//! - `assertion_validator` - the client assertion validation pipeline

pub mod assertion_validator;

pub use assertion_validator::{AssertionValidator, CLIENT_ASSERTION_TYPE_JWT_BEARER};
