use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result, bail};
use api_gateway::ApiGatewayConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::Deserialize;
use token_codec::TokenConfig;

/// Prefix of environment overrides, e.g. `VMB__AUTH__SECRET` sets `auth.secret`.
pub const ENV_PREFIX: &str = "VMB__";

const SECRET_ENV: &str = "VMB__AUTH__SECRET";

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_log_level() -> String {
    "info".to_owned()
}

/// Full server configuration.
///
/// ```yaml
/// server:
///   bind_addr: 0.0.0.0:8080
/// auth:
///   secret: change-me
///   ttl: 24h
/// gateway:
///   token_header: authorization
/// logging:
///   level: info
///   json: false
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub auth: TokenConfig,
    #[serde(default)]
    pub gateway: ApiGatewayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load from an optional YAML file, then apply `VMB__` environment overrides.
    ///
    /// # Errors
    ///
    /// Fails if `path` does not exist or the merged configuration does not deserialize.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            if !path.is_file() {
                bail!("config file {} not found", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        // The env provider parses values, which would turn a secret like `0123` into a number.
        if let Some(secret) = Env::var(SECRET_ENV) {
            figment = figment.merge(Serialized::default("auth.secret", secret));
        }

        figment.extract().context("invalid configuration")
    }
}
