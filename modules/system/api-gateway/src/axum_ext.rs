//! Axum extractors and middleware for the authorization gate

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{HeaderName, request::Parts},
    response::{IntoResponse, Response},
};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use token_codec::TokenVerifier;
use tower::{Layer, Service};
use vmb_security::{IdentityContext, VerifiedIdentity};

use crate::classifier::{RouteClassifier, Tier};
use crate::gate::{AuthOutcome, Rejection, evaluate, extract_token};
use crate::problem::Problem;

/// Extractor for Soft routes: the verified identity, if there is one.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Option<VerifiedIdentity>);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = Problem;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityContext>()
            .map(|ctx| Self(ctx.get().cloned()))
            .ok_or_else(Problem::gate_not_configured)
    }
}

/// Extractor for Strict routes: the verified identity, guaranteed present.
#[derive(Debug, Clone)]
pub struct Authenticated(pub VerifiedIdentity);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(ctx) = parts.extensions.get::<IdentityContext>() else {
            return Err(Problem::gate_not_configured().into_response());
        };
        ctx.get()
            .cloned()
            .map(Self)
            .ok_or_else(|| Rejection::AuthRequired.into_response())
    }
}

/// Shared state for the gate middleware.
struct GateState {
    verifier: Arc<dyn TokenVerifier>,
    classifier: Arc<RouteClassifier>,
    token_header: HeaderName,
    /// Tier applied to requests no route classifies; `None` lets them through.
    unclassified: Option<Tier>,
}

/// Layer that runs the authorization gate in front of every route.
///
/// Requests that match no classified route are treated as Strict unless
/// [`AuthGateLayer::require_auth_by_default`] turns that off.
///
/// # Example
/// ```ignore
/// router = router.layer(AuthGateLayer::new(codec, classifier, header::AUTHORIZATION));
/// ```
#[derive(Clone)]
pub struct AuthGateLayer {
    state: Arc<GateState>,
}

impl AuthGateLayer {
    #[must_use]
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        classifier: Arc<RouteClassifier>,
        token_header: HeaderName,
    ) -> Self {
        Self {
            state: Arc::new(GateState {
                verifier,
                classifier,
                token_header,
                unclassified: Some(Tier::Strict),
            }),
        }
    }

    /// Whether unclassified requests need a valid token (the default) or pass
    /// through anonymously.
    #[must_use]
    pub fn require_auth_by_default(self, required: bool) -> Self {
        let state = GateState {
            verifier: self.state.verifier.clone(),
            classifier: self.state.classifier.clone(),
            token_header: self.state.token_header.clone(),
            unclassified: required.then_some(Tier::Strict),
        };
        Self {
            state: Arc::new(state),
        }
    }
}

impl<S> Layer<S> for AuthGateLayer {
    type Service = AuthGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthGateService {
            inner,
            state: self.state.clone(),
        }
    }
}

/// Service that evaluates the route's tier before calling the inner service.
#[derive(Clone)]
pub struct AuthGateService<S> {
    inner: S,
    state: Arc<GateState>,
}

impl<S> Service<Request<Body>> for AuthGateService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let state = self.state.clone();
        let not_ready_inner = self.inner.clone();
        let mut ready_inner = std::mem::replace(&mut self.inner, not_ready_inner);

        Box::pin(async move {
            let Some(tier) = state
                .classifier
                .tier_for(request.method(), request.uri().path())
                .or(state.unclassified)
            else {
                request
                    .extensions_mut()
                    .insert(IdentityContext::anonymous());
                return ready_inner.call(request).await;
            };

            let token = extract_token(request.headers(), &state.token_header);
            let context = IdentityContext::anonymous();
            match evaluate(tier, token, state.verifier.as_ref()) {
                AuthOutcome::Anonymous => {}
                AuthOutcome::Authenticated(identity) => {
                    // Fresh context, so this cannot collide with an earlier write.
                    if let Err(err) = context.set(identity) {
                        tracing::error!(error = %err, "identity context already populated");
                        return Ok(Problem::gate_not_configured().into_response());
                    }
                }
                AuthOutcome::Rejected(rejection) => {
                    tracing::debug!(
                        %tier,
                        code = rejection.code(),
                        method = %request.method(),
                        path = request.uri().path(),
                        "request rejected by authorization gate"
                    );
                    return Ok(rejection.into_response());
                }
            }

            request.extensions_mut().insert(context);
            ready_inner.call(request).await
        })
    }
}

// End-to-end tests for AuthGateLayer live in tests/gate_matrix.rs and tests/expiry_scenario.rs.
