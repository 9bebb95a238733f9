use std::sync::Arc;

use api_gateway::{ApiGatewayConfig, ConfigurationError, GatewayRouter, RouteSpec};
use axum::{Extension, Router, http::Method};
use token_codec::TokenCodec;

use crate::handlers;

/// Tier of every route the server mounts.
#[must_use]
pub fn route_table() -> Vec<RouteSpec> {
    vec![
        RouteSpec::open(Method::GET, "/"),
        RouteSpec::open(Method::POST, "/v1/register"),
        RouteSpec::open(Method::POST, "/v1/login"),
        RouteSpec::soft(Method::GET, "/v1/user"),
        RouteSpec::strict(Method::POST, "/v1/user"),
        RouteSpec::strict(Method::POST, "/v1/accounts/create"),
        RouteSpec::strict(Method::DELETE, "/v1/accounts/delete"),
        RouteSpec::strict(Method::POST, "/v1/accounts/list"),
        RouteSpec::strict(Method::POST, "/v1/accounts/update/{id}"),
        RouteSpec::strict(Method::GET, "/v1/accounts/{id}"),
    ]
}

/// Mount the handlers behind the authorization gate.
///
/// # Errors
///
/// Returns [`ConfigurationError`] if the route table and the mounted handlers disagree.
pub fn build_router(
    codec: Arc<TokenCodec>,
    gateway: &ApiGatewayConfig,
) -> Result<Router, ConfigurationError> {
    let router = GatewayRouter::new(route_table())
        .route(Method::GET, "/", handlers::hello)
        .route(Method::POST, "/v1/register", handlers::register)
        .route(Method::POST, "/v1/login", handlers::login)
        .route(Method::GET, "/v1/user", handlers::get_user)
        .route(Method::POST, "/v1/user", handlers::update_user)
        .route(Method::POST, "/v1/accounts/create", handlers::create_account)
        .route(Method::DELETE, "/v1/accounts/delete", handlers::delete_account)
        .route(Method::POST, "/v1/accounts/list", handlers::list_accounts)
        .route(Method::POST, "/v1/accounts/update/{id}", handlers::update_account)
        .route(Method::GET, "/v1/accounts/{id}", handlers::get_account)
        .finalize(codec.clone(), gateway)?;

    Ok(router.layer(Extension(codec)))
}
