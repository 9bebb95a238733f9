//! Error types for token configuration and issuance.
//!
//! Verification has no error type: it always returns a classified
//! [`crate::Verification`].

use thiserror::Error;

/// Invalid codec configuration, detected when the codec is built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenConfigError {
    #[error("token signing secret must not be empty")]
    EmptySecret,

    #[error("token ttl must be at least one second, got {ttl_ms}ms")]
    TtlTooShort { ttl_ms: u128 },
}

/// Failure to produce a token.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IssueError {
    #[error("token subject must not be empty")]
    EmptySubject,

    #[error("claim '{0}' is reserved and cannot be set explicitly")]
    ReservedClaim(String),

    #[error("token ttl must be at least one second")]
    InvalidTtl,

    #[error("token signing failed: {0}")]
    Signing(String),
}
