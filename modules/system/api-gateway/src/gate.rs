//! Per-request authorization decision.
//!
//! | Tier   | no token      | valid token    | invalid / expired token       |
//! |--------|---------------|----------------|-------------------------------|
//! | Open   | anonymous     | anonymous      | anonymous                     |
//! | Soft   | anonymous     | authenticated  | anonymous                     |
//! | Strict | `AUTH_REQUIRED` | authenticated | `AUTH_INVALID` / `AUTH_EXPIRED` |

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use token_codec::{TokenVerifier, Verification, strip_scheme};
use vmb_security::VerifiedIdentity;

use crate::classifier::Tier;
use crate::problem::Problem;

/// Why a Strict route refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AuthRequired,
    AuthInvalid,
    AuthExpired,
}

impl Rejection {
    /// Machine-readable kind carried in the response body.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::AuthRequired => "AUTH_REQUIRED",
            Self::AuthInvalid => "AUTH_INVALID",
            Self::AuthExpired => "AUTH_EXPIRED",
        }
    }

    fn detail(self) -> &'static str {
        match self {
            Self::AuthRequired => "Authentication is required",
            Self::AuthInvalid => "Authentication token is invalid",
            Self::AuthExpired => "Authentication token has expired",
        }
    }

    #[must_use]
    pub fn to_problem(self) -> Problem {
        Problem::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            self.detail(),
            self.code(),
        )
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let mut resp = self.to_problem().into_response();
        resp.headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        resp
    }
}

/// Result of evaluating one request against its tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Anonymous,
    Authenticated(VerifiedIdentity),
    Rejected(Rejection),
}

/// Apply the tier table to an (already extracted) token.
///
/// Empty or whitespace-only tokens count as absent and are never verified.
/// Open routes never consult the verifier.
#[must_use]
pub fn evaluate(tier: Tier, token: Option<&str>, verifier: &dyn TokenVerifier) -> AuthOutcome {
    let token = token.map(str::trim).filter(|t| !t.is_empty());

    match tier {
        Tier::Open => AuthOutcome::Anonymous,
        Tier::Soft => match token.map(|t| verifier.verify(t)) {
            Some(Verification::Valid(identity)) => AuthOutcome::Authenticated(identity),
            Some(other) => {
                tracing::debug!(outcome = ?other, "soft route: ignoring unusable token");
                AuthOutcome::Anonymous
            }
            None => AuthOutcome::Anonymous,
        },
        Tier::Strict => {
            let Some(token) = token else {
                return AuthOutcome::Rejected(Rejection::AuthRequired);
            };
            match verifier.verify(token) {
                Verification::Valid(identity) => AuthOutcome::Authenticated(identity),
                Verification::Expired => AuthOutcome::Rejected(Rejection::AuthExpired),
                Verification::Malformed => AuthOutcome::Rejected(Rejection::AuthInvalid),
            }
        }
    }
}

/// Extract the bearer token from `header_name`.
///
/// Missing header, non-visible-ASCII value or an empty value after stripping the
/// optional `Bearer ` scheme all yield `None`.
#[must_use]
pub fn extract_token<'a>(headers: &'a HeaderMap, header_name: &HeaderName) -> Option<&'a str> {
    headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(strip_scheme)
        .filter(|t| !t.is_empty())
}
