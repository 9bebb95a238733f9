//! Placeholder handlers for the vm-backend routes.
//!
//! There is no persistence behind these: `register` and `login` only issue tokens,
//! the account handlers echo the caller and the request back.

use std::sync::Arc;

use api_gateway::{Authenticated, CurrentIdentity, Problem};
use axum::{Extension, Json, body::Bytes, extract::Path, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use token_codec::{IssueError, TokenCodec};
use uuid::Uuid;
use vmb_security::VerifiedIdentity;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub subject: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub subject: String,
    pub token: String,
    pub expires_in: u64,
}

pub async fn hello() -> Json<Value> {
    tracing::info!("hello");
    Json(json!({ ":)": "Thank you for using vm-backend" }))
}

pub async fn register(
    Extension(codec): Extension<Arc<TokenCodec>>,
    body: Bytes,
) -> Result<(StatusCode, Json<TokenResponse>), Problem> {
    let req: RegisterRequest = if body.is_empty() {
        RegisterRequest::default()
    } else {
        parse_json(&body)?
    };
    let subject = req.subject.unwrap_or_else(|| Uuid::new_v4().to_string());

    let resp = issue(&codec, subject)?;
    tracing::info!(subject = %resp.subject, "registered");
    Ok((StatusCode::CREATED, Json(resp)))
}

pub async fn login(
    Extension(codec): Extension<Arc<TokenCodec>>,
    body: Bytes,
) -> Result<Json<TokenResponse>, Problem> {
    let req: LoginRequest = parse_json(&body)?;
    issue(&codec, req.subject).map(Json)
}

pub async fn get_user(CurrentIdentity(identity): CurrentIdentity) -> Json<Value> {
    Json(json!({
        "authenticated": identity.is_some(),
        "user": identity.as_ref().map(identity_json),
    }))
}

pub async fn update_user(
    Authenticated(identity): Authenticated,
    body: Bytes,
) -> Result<Json<Value>, Problem> {
    echo(&identity, "user.update", None, &body)
}

pub async fn create_account(
    Authenticated(identity): Authenticated,
    body: Bytes,
) -> Result<Json<Value>, Problem> {
    echo(&identity, "accounts.create", None, &body)
}

pub async fn delete_account(
    Authenticated(identity): Authenticated,
    body: Bytes,
) -> Result<Json<Value>, Problem> {
    echo(&identity, "accounts.delete", None, &body)
}

pub async fn list_accounts(
    Authenticated(identity): Authenticated,
    body: Bytes,
) -> Result<Json<Value>, Problem> {
    echo(&identity, "accounts.list", None, &body)
}

pub async fn update_account(
    Authenticated(identity): Authenticated,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, Problem> {
    echo(&identity, "accounts.update", Some(&id), &body)
}

pub async fn get_account(
    Authenticated(identity): Authenticated,
    Path(id): Path<String>,
) -> Result<Json<Value>, Problem> {
    echo(&identity, "accounts.get", Some(&id), &Bytes::new())
}

fn issue(codec: &TokenCodec, subject: String) -> Result<TokenResponse, Problem> {
    let token = codec.issue(&subject).map_err(|e| match e {
        IssueError::EmptySubject | IssueError::ReservedClaim(_) | IssueError::InvalidTtl => {
            bad_request(&e.to_string())
        }
        IssueError::Signing(_) => {
            tracing::error!(error = %e, "failed to sign token");
            Problem::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                "Failed to issue token",
                "INTERNAL",
            )
        }
    })?;

    Ok(TokenResponse {
        subject,
        token,
        expires_in: codec.ttl().as_secs(),
    })
}

fn echo(
    identity: &VerifiedIdentity,
    action: &str,
    id: Option<&str>,
    body: &Bytes,
) -> Result<Json<Value>, Problem> {
    let request: Value = if body.is_empty() {
        Value::Null
    } else {
        parse_json(body)?
    };

    Ok(Json(json!({
        "action": action,
        "id": id,
        "user": identity_json(identity),
        "request": request,
    })))
}

fn identity_json(identity: &VerifiedIdentity) -> Value {
    json!({
        "subject": identity.subject(),
        "expires_at": identity.expires_at().to_rfc3339(),
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, Problem> {
    serde_json::from_slice(body).map_err(|e| bad_request(&format!("Invalid JSON body: {e}")))
}

fn bad_request(detail: &str) -> Problem {
    Problem::new(StatusCode::BAD_REQUEST, "Bad Request", detail, "INVALID_REQUEST")
}
