use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vmb_security::VerifiedIdentity;

use crate::clock::{Clock, SystemClock};
use crate::config::TokenConfig;
use crate::error::{IssueError, TokenConfigError};

/// Registered claim names the codec manages itself.
const RESERVED_CLAIMS: &[&str] = &["sub", "iat", "exp", "iss", "aud", "nbf"];

const BEARER_PREFIX: &str = "bearer ";

/// Outcome of verifying a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Signature checks out and the token has not expired.
    Valid(VerifiedIdentity),
    /// Signature checks out but `now >= exp`.
    Expired,
    /// Anything else: unparseable, wrong algorithm, missing claims, signature mismatch.
    Malformed,
}

impl Verification {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Verification seam used by the authorization gate.
pub trait TokenVerifier: Send + Sync {
    /// Classify `token`. Must not panic for any input.
    fn verify(&self, token: &str) -> Verification;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// HS256 token codec. Immutable after construction and safe to share across requests.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    issuer: Option<String>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec that reads the wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`TokenConfigError`] if the secret is empty or the ttl is under a second.
    pub fn new(config: &TokenConfig) -> Result<Self, TokenConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a codec with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns [`TokenConfigError`] if the secret is empty or the ttl is under a second.
    pub fn with_clock(
        config: &TokenConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenConfigError> {
        let secret = config.secret.expose_secret().as_bytes();
        if secret.is_empty() {
            return Err(TokenConfigError::EmptySecret);
        }
        if config.ttl.as_secs() == 0 {
            return Err(TokenConfigError::TtlTooShort {
                ttl_ms: config.ttl.as_millis(),
            });
        }

        // Expiry is checked by hand against the injected clock, with no leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_aud = false;
        match &config.issuer {
            Some(issuer) => {
                validation.set_issuer(&[issuer]);
                validation.set_required_spec_claims(&["exp", "sub", "iss"]);
            }
            None => validation.set_required_spec_claims(&["exp", "sub"]),
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: config.ttl,
            issuer: config.issuer.clone(),
            clock,
        })
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject` with the configured ttl.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError::EmptySubject`] for an empty subject and
    /// [`IssueError::Signing`] if the signing library fails.
    pub fn issue(&self, subject: &str) -> Result<String, IssueError> {
        self.sign(subject, self.ttl, Map::new())
    }

    /// Issue a token with a one-off ttl.
    ///
    /// # Errors
    ///
    /// Same as [`Self::issue`], plus [`IssueError::InvalidTtl`] for a ttl under a second.
    pub fn issue_with_ttl(&self, subject: &str, ttl: Duration) -> Result<String, IssueError> {
        if ttl.as_secs() == 0 {
            return Err(IssueError::InvalidTtl);
        }
        self.sign(subject, ttl, Map::new())
    }

    /// Issue a token carrying additional claims.
    ///
    /// # Errors
    ///
    /// Same as [`Self::issue`], plus [`IssueError::ReservedClaim`] when `extra`
    /// tries to set a registered claim.
    pub fn issue_with_claims(
        &self,
        subject: &str,
        extra: Map<String, Value>,
    ) -> Result<String, IssueError> {
        if let Some(name) = extra.keys().find(|k| RESERVED_CLAIMS.contains(&k.as_str())) {
            return Err(IssueError::ReservedClaim(name.clone()));
        }
        self.sign(subject, self.ttl, extra)
    }

    fn sign(
        &self,
        subject: &str,
        ttl: Duration,
        extra: Map<String, Value>,
    ) -> Result<String, IssueError> {
        if subject.is_empty() {
            return Err(IssueError::EmptySubject);
        }

        let iat = self.clock.now().timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: subject.to_owned(),
            iat,
            exp: iat.saturating_add(ttl_secs),
            iss: self.issuer.clone(),
            extra,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| IssueError::Signing(e.to_string()))
    }

    /// Verify raw header bytes; non-UTF-8 input is malformed.
    #[must_use]
    pub fn verify_bytes(&self, raw: &[u8]) -> Verification {
        std::str::from_utf8(raw).map_or(Verification::Malformed, |token| self.verify(token))
    }

    /// Verify `token` and classify the result.
    #[must_use]
    pub fn verify(&self, token: &str) -> Verification {
        let claims = match jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
        {
            Ok(data) => data.claims,
            Err(err) => {
                tracing::trace!(kind = ?err.kind(), "token failed to decode");
                return Verification::Malformed;
            }
        };

        if claims.sub.is_empty() {
            return Verification::Malformed;
        }
        let (Some(issued_at), Some(expires_at)) = (
            DateTime::from_timestamp(claims.iat, 0),
            DateTime::from_timestamp(claims.exp, 0),
        ) else {
            return Verification::Malformed;
        };

        if self.clock.now().timestamp() >= claims.exp {
            return Verification::Expired;
        }

        Verification::Valid(
            VerifiedIdentity::new(claims.sub, issued_at, expires_at).with_claims(claims.extra),
        )
    }
}

impl TokenVerifier for TokenCodec {
    fn verify(&self, token: &str) -> Verification {
        TokenCodec::verify(self, token)
    }
}

/// Strip an optional case-insensitive `Bearer ` scheme and surrounding whitespace.
///
/// A bare scheme with nothing after it yields an empty string.
#[must_use]
pub fn strip_scheme(value: &str) -> &str {
    let value = value.trim_start();
    if value.trim_end().eq_ignore_ascii_case(BEARER_PREFIX.trim_end()) {
        return "";
    }
    let rest = match value.get(..BEARER_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(BEARER_PREFIX) => {
            &value[BEARER_PREFIX.len()..]
        }
        _ => value,
    };
    rest.trim()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::clock::ManualClock;

    const START: i64 = 1_700_000_000;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(DateTime::from_timestamp(START, 0).unwrap()))
    }

    fn codec_with(clock: Arc<ManualClock>) -> TokenCodec {
        let cfg = TokenConfig::new("unit-test-secret", Duration::from_secs(60));
        TokenCodec::with_clock(&cfg, clock).unwrap()
    }

    #[test]
    fn issue_then_verify_returns_subject() {
        let codec = codec_with(clock());
        let token = codec.issue("u-42").unwrap();

        let Verification::Valid(identity) = codec.verify(&token) else {
            panic!("expected valid token");
        };
        assert_eq!(identity.subject(), "u-42");
        assert_eq!(identity.issued_at().timestamp(), START);
        assert_eq!(identity.expires_at().timestamp(), START + 60);
    }

    #[test]
    fn token_is_valid_until_the_last_second_before_expiry() {
        let clock = clock();
        let codec = codec_with(clock.clone());
        let token = codec.issue("u-1").unwrap();

        clock.advance(Duration::from_secs(59));
        assert!(codec.verify(&token).is_valid());

        clock.advance(Duration::from_secs(1));
        assert_eq!(codec.verify(&token), Verification::Expired);

        clock.advance(Duration::from_secs(3600));
        assert_eq!(codec.verify(&token), Verification::Expired);
    }

    #[test]
    fn verify_is_idempotent() {
        let codec = codec_with(clock());
        let token = codec.issue("u-5").unwrap();

        assert_eq!(codec.verify(&token), codec.verify(&token));
    }

    #[test]
    fn different_secret_is_malformed() {
        let clock = clock();
        let issuer = codec_with(clock.clone());
        let other = TokenCodec::with_clock(
            &TokenConfig::new("another-secret", Duration::from_secs(60)),
            clock,
        )
        .unwrap();

        let token = issuer.issue("u-1").unwrap();
        assert_eq!(other.verify(&token), Verification::Malformed);
    }

    #[test]
    fn expired_token_with_bad_signature_is_malformed() {
        let clock = clock();
        let codec = codec_with(clock.clone());
        let mut token = codec.issue("u-1").unwrap();
        token.push('x');

        clock.advance(Duration::from_secs(600));
        assert_eq!(codec.verify(&token), Verification::Malformed);
    }

    #[test]
    fn malformed_inputs() {
        let codec = codec_with(clock());
        let token = codec.issue("u-1").unwrap();

        for input in [
            "",
            " ",
            "not-a-token",
            "a.b.c",
            "....",
            &token[..token.len() / 2],
            &token[..token.len() - 1],
        ] {
            assert_eq!(codec.verify(input), Verification::Malformed, "input: {input:?}");
        }
    }

    #[test]
    fn non_utf8_bytes_are_malformed() {
        let codec = codec_with(clock());
        assert_eq!(codec.verify_bytes(&[0xff, 0xfe, 0x00]), Verification::Malformed);
    }

    #[test]
    fn extra_claims_round_trip_into_identity() {
        let codec = codec_with(clock());
        let mut extra = Map::new();
        extra.insert("role".to_owned(), json!("operator"));

        let token = codec.issue_with_claims("u-3", extra).unwrap();
        let Verification::Valid(identity) = codec.verify(&token) else {
            panic!("expected valid token");
        };
        assert_eq!(identity.claim("role"), Some(&json!("operator")));
    }

    #[test]
    fn reserved_claims_are_refused() {
        let codec = codec_with(clock());
        let mut extra = Map::new();
        extra.insert("exp".to_owned(), json!(0));

        assert_eq!(
            codec.issue_with_claims("u-3", extra),
            Err(IssueError::ReservedClaim("exp".to_owned()))
        );
    }

    #[test]
    fn empty_subject_is_refused() {
        let codec = codec_with(clock());
        assert_eq!(codec.issue(""), Err(IssueError::EmptySubject));
    }

    #[test]
    fn issue_with_ttl_overrides_default() {
        let clock = clock();
        let codec = codec_with(clock.clone());
        let token = codec.issue_with_ttl("u-1", Duration::from_secs(5)).unwrap();

        clock.advance(Duration::from_secs(5));
        assert_eq!(codec.verify(&token), Verification::Expired);
        assert_eq!(
            codec.issue_with_ttl("u-1", Duration::from_millis(500)),
            Err(IssueError::InvalidTtl)
        );
    }

    #[test]
    fn issuer_must_match() {
        let clock = clock();
        let cfg = TokenConfig::new("shared", Duration::from_secs(60)).with_issuer("vm-backend");
        let codec = TokenCodec::with_clock(&cfg, clock.clone()).unwrap();
        let foreign = TokenCodec::with_clock(
            &TokenConfig::new("shared", Duration::from_secs(60)).with_issuer("someone-else"),
            clock.clone(),
        )
        .unwrap();
        let no_issuer =
            TokenCodec::with_clock(&TokenConfig::new("shared", Duration::from_secs(60)), clock)
                .unwrap();

        assert!(codec.verify(&codec.issue("u-1").unwrap()).is_valid());
        assert_eq!(
            codec.verify(&foreign.issue("u-1").unwrap()),
            Verification::Malformed
        );
        assert_eq!(
            codec.verify(&no_issuer.issue("u-1").unwrap()),
            Verification::Malformed
        );
    }

    #[test]
    fn config_errors() {
        assert_eq!(
            TokenCodec::new(&TokenConfig::new("", Duration::from_secs(60))).unwrap_err(),
            TokenConfigError::EmptySecret
        );
        assert_eq!(
            TokenCodec::new(&TokenConfig::new("s", Duration::from_millis(10))).unwrap_err(),
            TokenConfigError::TtlTooShort { ttl_ms: 10 }
        );
    }

    #[test]
    fn strip_scheme_variants() {
        assert_eq!(strip_scheme("Bearer abc"), "abc");
        assert_eq!(strip_scheme("bearer   abc  "), "abc");
        assert_eq!(strip_scheme("BEARER abc"), "abc");
        assert_eq!(strip_scheme("abc"), "abc");
        assert_eq!(strip_scheme("Bearer "), "");
        assert_eq!(strip_scheme("Bearer"), "");
        assert_eq!(strip_scheme("  Bearer\tabc"), "Bearer\tabc");
        assert_eq!(strip_scheme("Basic abc"), "Basic abc");
        assert_eq!(strip_scheme("\u{fc}"), "\u{fc}");
    }

    #[test]
    fn debug_does_not_leak_keys() {
        let codec = codec_with(clock());
        let rendered = format!("{codec:?}");
        assert!(!rendered.contains("unit-test-secret"));
        assert!(rendered.contains("TokenCodec"));
    }
}
