use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use siteops_auth::{AccessError, ActorResolver, JwtValidator};

use crate::app::errors;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub actors: Arc<dyn ActorResolver>,
}

/// Resolve the request's [`siteops_auth::ActorContext`] and attach it as an extension.
///
/// A missing or invalid token yields no session, which the actor resolver
/// reports as an authentication failure. A session whose profile row is gone
/// is treated the same way.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let session = extract_bearer(req.headers()).and_then(|token| {
        state
            .jwt
            .validate(token, Utc::now())
            .map_err(|e| tracing::debug!(error = %e, "rejected session token"))
            .ok()
    });

    let actor = match state.actors.resolve_actor(session.as_ref()).await {
        Ok(actor) => actor,
        Err(AccessError::NotFound) => {
            return errors::access_error_response(&AccessError::Authentication, None);
        }
        Err(err) => return errors::access_error_response(&err, None),
    };

    req.extensions_mut().insert(actor);
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}
