use axum::extract::Request;
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{DecodingKey, Validation, decode};

pub use quill_types::api::Claims;

use crate::error::ApiError;

/// Viewer identity on public pages: present when a valid bearer token
/// accompanies the request, absent otherwise. Public handlers that
/// personalize (the profile `following` flag) read this.
#[derive(Debug, Clone)]
pub struct MaybeViewer(pub Option<Claims>);

pub fn jwt_secret() -> String {
    std::env::var("QUILL_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into())
}

fn bearer_claims(req: &Request) -> Option<Claims> {
    let auth_header = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_header.strip_prefix("Bearer ")?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret().as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    Some(token_data.claims)
}

/// Extract and validate the JWT on protected routes. A missing or invalid
/// token redirects to the login page with `next` pointing back at the
/// requested path.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = bearer_claims(&req).ok_or_else(|| ApiError::Unauthorized {
        next: req.uri().path().to_string(),
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Attach the viewer, if any, on public routes. Never fails.
pub async fn optional_auth(mut req: Request, next: Next) -> Response {
    let viewer = MaybeViewer(bearer_claims(&req));
    req.extensions_mut().insert(viewer);
    next.run(req).await
}
