use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

fn default_ttl() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

/// Token codec configuration.
///
/// ```yaml
/// secret: "change-me"
/// ttl: 24h
/// issuer: vm-backend
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    /// HMAC signing/verification secret. Redacted in `Debug`.
    #[serde(deserialize_with = "deserialize_secret")]
    pub secret: SecretString,

    /// Lifetime of issued tokens, in `humantime` notation (`"30m"`, `"24h"`).
    #[serde(default = "default_ttl", deserialize_with = "deserialize_duration")]
    pub ttl: Duration,

    /// When set, embedded as `iss` and required to match on verify.
    #[serde(default)]
    pub issuer: Option<String>,
}

impl TokenConfig {
    #[must_use]
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            ttl,
            issuer: None,
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn parses_humantime_ttl() {
        let cfg: TokenConfig =
            serde_json::from_str(r#"{"secret":"s3cret","ttl":"90m","issuer":"vm-backend"}"#)
                .unwrap();

        assert_eq!(cfg.ttl, Duration::from_secs(90 * 60));
        assert_eq!(cfg.secret.expose_secret(), "s3cret");
        assert_eq!(cfg.issuer.as_deref(), Some("vm-backend"));
    }

    #[test]
    fn ttl_defaults_to_one_day() {
        let cfg: TokenConfig = serde_json::from_str(r#"{"secret":"s3cret"}"#).unwrap();

        assert_eq!(cfg.ttl, Duration::from_secs(86_400));
        assert!(cfg.issuer.is_none());
    }

    #[test]
    fn rejects_garbage_ttl() {
        let res = serde_json::from_str::<TokenConfig>(r#"{"secret":"s","ttl":"soon"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let cfg = TokenConfig::new("super-secret-value", Duration::from_secs(60));

        assert!(!format!("{cfg:?}").contains("super-secret-value"));
    }
}
