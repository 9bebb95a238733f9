#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Issue and verify the signed bearer tokens that carry a caller's identity.
//!
//! Tokens are compact HS256 JWTs with `sub`, `iat` and `exp` claims. Verification
//! never fails with an error: every input is classified as [`Verification::Valid`],
//! [`Verification::Expired`] or [`Verification::Malformed`].

pub mod clock;
pub mod codec;
pub mod config;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{TokenCodec, TokenVerifier, Verification, strip_scheme};
pub use config::TokenConfig;
pub use error::{IssueError, TokenConfigError};
