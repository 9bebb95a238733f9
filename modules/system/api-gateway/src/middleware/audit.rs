//! Audit logging keyed by the verified subject.
//!
//! Must be layered inside the authorization gate: it reads the `IdentityContext`
//! the gate inserted.

use axum::{extract::Request, middleware::Next, response::Response};
use vmb_security::IdentityContext;

pub async fn audit_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let subject = req
        .extensions()
        .get::<IdentityContext>()
        .and_then(IdentityContext::subject)
        .unwrap_or("anonymous")
        .to_owned();

    let resp = next.run(req).await;

    tracing::info!(
        target: "audit",
        subject = %subject,
        method = %method,
        path = %path,
        status = resp.status().as_u16(),
        "request handled"
    );
    resp
}
