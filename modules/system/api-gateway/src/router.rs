use std::sync::Arc;

use axum::{
    Router,
    handler::Handler,
    http::{HeaderName, Method},
    middleware::from_fn,
    routing::{MethodFilter, on},
};
use token_codec::TokenVerifier;
use tower_http::trace::TraceLayer;

use crate::axum_ext::AuthGateLayer;
use crate::classifier::{RouteClassifier, RouteSpec, normalize_path};
use crate::config::ApiGatewayConfig;
use crate::error::ConfigurationError;
use crate::middleware::audit::audit_middleware;

/// Builds the application router together with its route classification.
///
/// Handlers are mounted with [`GatewayRouter::route`]; tiers come from the static
/// table passed to [`GatewayRouter::new`] (or added with [`GatewayRouter::classify`]).
/// [`GatewayRouter::finalize`] checks that both sides agree and installs the
/// middleware stack.
pub struct GatewayRouter {
    router: Router,
    classification: Vec<RouteSpec>,
    mounted: Vec<(Method, String)>,
    /// Distinct mounted paths, checked the way axum's own path matcher will check them.
    mount_paths: matchit::Router<()>,
    error: Option<ConfigurationError>,
}

impl GatewayRouter {
    #[must_use]
    pub fn new(classification: impl IntoIterator<Item = RouteSpec>) -> Self {
        Self {
            router: Router::new(),
            classification: classification.into_iter().collect(),
            mounted: Vec::new(),
            mount_paths: matchit::Router::new(),
            error: None,
        }
    }

    /// Add one entry to the classification table.
    #[must_use]
    pub fn classify(mut self, spec: RouteSpec) -> Self {
        self.classification.push(spec);
        self
    }

    /// Mount `handler` for `method` on `path`.
    ///
    /// Errors (unroutable method, repeated or conflicting mount) are reported by
    /// [`GatewayRouter::finalize`]; the offending handler is not mounted.
    #[must_use]
    pub fn route<H, T>(mut self, method: Method, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        if self.error.is_some() {
            return self;
        }
        let Ok(filter) = MethodFilter::try_from(method.clone()) else {
            self.error = Some(ConfigurationError::UnsupportedMethod(method));
            return self;
        };

        let path = normalize_path(path);
        if let Err(err) = self.check_mount(&method, &path) {
            self.error = Some(err);
            return self;
        }
        self.router = self.router.route(&path, on(filter, handler));
        self.mounted.push((method, path));
        self
    }

    fn check_mount(&mut self, method: &Method, path: &str) -> Result<(), ConfigurationError> {
        if !path.starts_with('/') {
            return Err(ConfigurationError::InvalidPattern {
                method: method.clone(),
                path: path.to_owned(),
                reason: "path must start with '/'".to_owned(),
            });
        }

        let mut path_known = false;
        for (m, p) in &self.mounted {
            if p == path {
                if m == method {
                    return Err(ConfigurationError::DuplicateHandler {
                        method: method.clone(),
                        path: path.to_owned(),
                    });
                }
                path_known = true;
            }
        }

        // Another method on a known path merges into the same axum route.
        if !path_known {
            self.mount_paths
                .insert(path, ())
                .map_err(|e| ConfigurationError::ConflictingMount {
                    method: method.clone(),
                    path: path.to_owned(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Validate the route table and apply the middleware stack.
    ///
    /// Layer order, outermost first: request tracing -> authorization gate -> audit -> router.
    ///
    /// # Errors
    ///
    /// Any [`ConfigurationError`]: conflicting or duplicate tiers, invalid patterns,
    /// a repeated or conflicting mount, a mounted route without a tier, an
    /// unroutable method or a bad header name.
    pub fn finalize(
        self,
        verifier: Arc<dyn TokenVerifier>,
        config: &ApiGatewayConfig,
    ) -> Result<Router, ConfigurationError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let token_header = HeaderName::try_from(config.token_header.as_str())
            .map_err(|_| ConfigurationError::InvalidTokenHeader(config.token_header.clone()))?;

        let classifier = RouteClassifier::new(self.classification)?;

        for (method, path) in &self.mounted {
            if classifier.tier_of_pattern(method, path).is_none() {
                return Err(ConfigurationError::Unclassified {
                    method: method.clone(),
                    path: path.clone(),
                });
            }
        }
        for (method, path, tier) in classifier.routes() {
            let is_mounted = self.mounted.iter().any(|(m, p)| m == method && p == path);
            if !is_mounted {
                tracing::warn!(%method, path, %tier, "classified route has no handler");
            }
        }

        tracing::info!(
            routes = classifier.len(),
            header = %token_header,
            "Authorization gate configured"
        );

        let mut router = self.router;

        // `Router::layer` wraps what is already there, so add innermost first.
        if config.audit_enabled {
            router = router.layer(from_fn(audit_middleware));
        }
        router = router.layer(
            AuthGateLayer::new(verifier, Arc::new(classifier), token_header)
                .require_auth_by_default(config.require_auth_by_default),
        );
        router = router.layer(TraceLayer::new_for_http());

        Ok(router)
    }
}
