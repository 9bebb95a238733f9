use serde::{Deserialize, Serialize};

fn default_token_header() -> String {
    "authorization".to_owned()
}

fn default_audit_enabled() -> bool {
    true
}

fn default_require_auth_by_default() -> bool {
    true
}

/// API gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiGatewayConfig {
    /// Header carrying the bearer token. An optional `Bearer ` scheme is stripped.
    #[serde(default = "default_token_header")]
    pub token_header: String,

    /// Log one audit line per request, keyed by the verified subject.
    #[serde(default = "default_audit_enabled")]
    pub audit_enabled: bool,

    /// Treat requests matching no classified route as Strict. When off they reach the
    /// router (and its 404/405 fallbacks) with an empty identity.
    #[serde(default = "default_require_auth_by_default")]
    pub require_auth_by_default: bool,
}

impl Default for ApiGatewayConfig {
    fn default() -> Self {
        Self {
            token_header: default_token_header(),
            audit_enabled: default_audit_enabled(),
            require_auth_by_default: default_require_auth_by_default(),
        }
    }
}
