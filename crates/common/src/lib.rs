//! Common utilities and types shared across the client authentication crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, clock skew, compact serialization)
pub mod jwt;
