//! Custom test assertions for validation outcomes
//!
//! # Example
//! ```rust,ignore
//! harness
//!     .validate(&token)
//!     .await
//!     .assert_rejected_with(RejectionReason::Replayed);
//! ```

use client_auth::errors::{AuthenticationError, RejectionReason, INVALID_REQUEST};

pub trait ValidationAssertions {
    /// Assert that the assertion was accepted
    fn assert_accepted(&self) -> &Self;

    /// Assert that the assertion was rejected for `reason` with the
    /// `invalid_request` error code
    fn assert_rejected_with(&self, reason: RejectionReason) -> &Self;

    /// Assert that the rejection message contains `fragment`
    fn assert_message_contains(&self, fragment: &str) -> &Self;
}

impl ValidationAssertions for Result<(), AuthenticationError> {
    fn assert_accepted(&self) -> &Self {
        if let Err(e) = self {
            panic!(
                "Expected assertion to be accepted, got {:?}: {}",
                e.reason(),
                e.message()
            );
        }
        self
    }

    fn assert_rejected_with(&self, reason: RejectionReason) -> &Self {
        match self {
            Ok(()) => panic!("Expected rejection {:?}, but assertion was accepted", reason),
            Err(e) => {
                assert_eq!(
                    e.reason(),
                    reason,
                    "Unexpected rejection reason (message: {})",
                    e.message()
                );
                assert_eq!(e.code(), INVALID_REQUEST, "Unexpected error code");
            }
        }
        self
    }

    fn assert_message_contains(&self, fragment: &str) -> &Self {
        match self {
            Ok(()) => panic!("Expected rejection containing '{}', got acceptance", fragment),
            Err(e) => assert!(
                e.message().contains(fragment),
                "Message '{}' does not contain '{}'",
                e.message(),
                fragment
            ),
        }
        self
    }
}
