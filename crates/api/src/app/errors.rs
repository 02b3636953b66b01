use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use siteops_auth::{AccessError, AccessErrorKind, ActorRole};

pub fn status_for(kind: AccessErrorKind) -> StatusCode {
    match kind {
        AccessErrorKind::Authentication => StatusCode::UNAUTHORIZED,
        AccessErrorKind::Authorization | AccessErrorKind::Configuration => StatusCode::FORBIDDEN,
        AccessErrorKind::Validation => StatusCode::BAD_REQUEST,
        AccessErrorKind::NotFound => StatusCode::NOT_FOUND,
        AccessErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Translate an access failure into the actor-facing response.
///
/// The body only ever carries the generic public message; the detailed error
/// goes to the log.
pub fn access_error_response(err: &AccessError, role: Option<&ActorRole>) -> axum::response::Response {
    let kind = err.kind();
    match kind {
        AccessErrorKind::Configuration => tracing::error!(error = %err, "access policy misconfigured"),
        AccessErrorKind::Unavailable => tracing::warn!(error = %err, "access state unavailable"),
        _ => tracing::debug!(error = %err, "request rejected"),
    }

    json_error(status_for(kind), kind.code(), err.public_message(role))
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
