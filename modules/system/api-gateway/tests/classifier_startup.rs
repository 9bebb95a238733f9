#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Startup validation of the route table.
//!
//! A misconfigured table must fail `finalize` instead of serving requests.

use std::sync::Arc;
use std::time::Duration;

use api_gateway::{ApiGatewayConfig, ConfigurationError, GatewayRouter, RouteSpec, Tier};
use axum::http::Method;
use token_codec::{TokenCodec, TokenConfig};

fn codec() -> Arc<TokenCodec> {
    Arc::new(TokenCodec::new(&TokenConfig::new("startup-secret", Duration::from_secs(60))).unwrap())
}

async fn noop() {}

#[test]
fn same_route_in_two_tiers_is_a_configuration_error() {
    let err = GatewayRouter::new([RouteSpec::soft(Method::GET, "/x")])
        .classify(RouteSpec::strict(Method::GET, "/x"))
        .route(Method::GET, "/x", noop)
        .finalize(codec(), &ApiGatewayConfig::default())
        .unwrap_err();

    assert_eq!(
        err,
        ConfigurationError::ConflictingTier {
            method: Method::GET,
            path: "/x".to_owned(),
            first: Tier::Soft,
            second: Tier::Strict,
        }
    );
    assert!(err.to_string().contains("/x"));
}

#[test]
fn legacy_and_brace_forms_of_one_route_conflict() {
    let err = GatewayRouter::new([
        RouteSpec::strict(Method::GET, "/v1/accounts/:id"),
        RouteSpec::open(Method::GET, "/v1/accounts/{id}"),
    ])
    .finalize(codec(), &ApiGatewayConfig::default())
    .unwrap_err();

    assert!(matches!(err, ConfigurationError::ConflictingTier { .. }));
}

#[test]
fn handler_without_classification_is_a_configuration_error() {
    let err = GatewayRouter::new([RouteSpec::soft(Method::GET, "/v1/user")])
        .route(Method::GET, "/v1/user", noop)
        .route(Method::POST, "/v1/accounts/create", noop)
        .finalize(codec(), &ApiGatewayConfig::default())
        .unwrap_err();

    assert!(matches!(
        err,
        ConfigurationError::Unclassified { ref method, ref path }
            if *method == Method::POST && path == "/v1/accounts/create"
    ));
}

#[test]
fn same_path_different_methods_is_valid() {
    let res = GatewayRouter::new([
        RouteSpec::soft(Method::GET, "/v1/user"),
        RouteSpec::strict(Method::POST, "/v1/user"),
    ])
    .route(Method::GET, "/v1/user", noop)
    .route(Method::POST, "/v1/user", noop)
    .finalize(codec(), &ApiGatewayConfig::default());

    assert!(res.is_ok());
}

#[test]
fn extension_method_cannot_be_mounted() {
    let method = Method::from_bytes(b"PURGE").unwrap();
    let err = GatewayRouter::new([RouteSpec::strict(method.clone(), "/cache")])
        .route(method.clone(), "/cache", noop)
        .finalize(codec(), &ApiGatewayConfig::default())
        .unwrap_err();

    assert_eq!(err, ConfigurationError::UnsupportedMethod(method));
}

#[test]
fn same_handler_mounted_twice_is_a_configuration_error() {
    let err = GatewayRouter::new([RouteSpec::open(Method::GET, "/x")])
        .route(Method::GET, "/x", noop)
        .route(Method::GET, "/x", noop)
        .finalize(codec(), &ApiGatewayConfig::default())
        .unwrap_err();

    assert_eq!(
        err,
        ConfigurationError::DuplicateHandler {
            method: Method::GET,
            path: "/x".to_owned(),
        }
    );
}

#[test]
fn legacy_and_brace_mounts_of_one_route_are_duplicates() {
    let err = GatewayRouter::new([RouteSpec::strict(Method::GET, "/v1/accounts/{id}")])
        .route(Method::GET, "/v1/accounts/:id", noop)
        .route(Method::GET, "/v1/accounts/{id}", noop)
        .finalize(codec(), &ApiGatewayConfig::default())
        .unwrap_err();

    assert!(matches!(err, ConfigurationError::DuplicateHandler { .. }));
}

#[test]
fn overlapping_parameter_names_are_a_configuration_error() {
    let err = GatewayRouter::new([
        RouteSpec::strict(Method::GET, "/a/{x}"),
        RouteSpec::strict(Method::POST, "/a/{y}"),
    ])
    .route(Method::GET, "/a/{x}", noop)
    .route(Method::POST, "/a/{y}", noop)
    .finalize(codec(), &ApiGatewayConfig::default())
    .unwrap_err();

    assert!(matches!(
        err,
        ConfigurationError::ConflictingMount { ref method, ref path, .. }
            if *method == Method::POST && path == "/a/{y}"
    ));
}

#[test]
fn explicit_head_next_to_get_is_valid() {
    let res = GatewayRouter::new([
        RouteSpec::soft(Method::GET, "/v1/user"),
        RouteSpec::open(Method::HEAD, "/v1/user"),
    ])
    .route(Method::GET, "/v1/user", noop)
    .route(Method::HEAD, "/v1/user", noop)
    .finalize(codec(), &ApiGatewayConfig::default());

    assert!(res.is_ok());
}

#[test]
fn relative_mount_path_is_an_invalid_pattern() {
    let err = GatewayRouter::new([RouteSpec::open(Method::GET, "/health")])
        .route(Method::GET, "health", noop)
        .finalize(codec(), &ApiGatewayConfig::default())
        .unwrap_err();

    assert!(matches!(err, ConfigurationError::InvalidPattern { .. }));
}
