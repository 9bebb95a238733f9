//! Startup errors of the gateway.
//!
//! Everything here is detected while the router is being built and is fatal to boot.
//! Request-time failures are [`crate::gate::Rejection`]s instead.

use http::Method;
use thiserror::Error;

use crate::classifier::Tier;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("route {method} {path} registered under both {first} and {second}")]
    ConflictingTier {
        method: Method,
        path: String,
        first: Tier,
        second: Tier,
    },

    #[error("route {method} {path} registered twice under {tier}")]
    DuplicateRoute {
        method: Method,
        path: String,
        tier: Tier,
    },

    #[error("invalid route pattern {method} {path}: {reason}")]
    InvalidPattern {
        method: Method,
        path: String,
        reason: String,
    },

    #[error("route {method} {path} has a handler but no tier")]
    Unclassified { method: Method, path: String },

    #[error("route {method} {path} mounted twice")]
    DuplicateHandler { method: Method, path: String },

    #[error("route {method} {path} conflicts with an earlier mount: {reason}")]
    ConflictingMount {
        method: Method,
        path: String,
        reason: String,
    },

    #[error("method {0} cannot be routed")]
    UnsupportedMethod(Method),

    #[error("invalid token header name '{0}'")]
    InvalidTokenHeader(String),
}
