#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Three-tier authorization gate.
//!
//! Every route is classified as Open, Soft or Strict at startup. The gate layer looks up
//! the tier of each request, verifies its bearer token when the tier needs it, and
//! either rejects the request (Strict only) or forwards it with an `IdentityContext`
//! in the request extensions.
//!
//! The intended middleware order is:
//! request tracing -> authorization gate -> audit -> router

pub mod axum_ext;
pub mod classifier;
pub mod config;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod problem;
pub mod router;

pub use axum_ext::{AuthGateLayer, Authenticated, CurrentIdentity};
pub use classifier::{RouteClassifier, RouteSpec, Tier};
pub use config::ApiGatewayConfig;
pub use error::ConfigurationError;
pub use gate::{AuthOutcome, Rejection, evaluate};
pub use problem::Problem;
pub use router::GatewayRouter;
