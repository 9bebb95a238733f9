use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// `VerifiedIdentity` is the trusted result of a successful token verification.
///
/// It only exists for the lifetime of a single request: the gate builds it from the
/// token claims and hands it to handlers through [`crate::IdentityContext`].
/// The raw token is never kept here.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VerifiedIdentity {
    /// Subject the token was issued for.
    subject: String,
    /// When the token was issued.
    issued_at: DateTime<Utc>,
    /// When the token stops being accepted.
    expires_at: DateTime<Utc>,
    /// Any additional claims embedded at issue time.
    #[serde(skip_serializing_if = "Map::is_empty")]
    claims: Map<String, Value>,
}

impl VerifiedIdentity {
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subject: subject.into(),
            issued_at,
            expires_at,
            claims: Map::new(),
        }
    }

    /// Attach the additional claims carried by the token.
    #[must_use]
    pub fn with_claims(mut self, claims: Map<String, Value>) -> Self {
        self.claims = claims;
        self
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    #[must_use]
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Look up a single additional claim by name.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }
}
