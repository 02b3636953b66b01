use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};

use siteops_auth::{ActorContext, explain_scope};

use crate::app::{dto::WhoAmI, errors, services::AppServices};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /whoami - the resolved actor and how its scope was derived.
pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
) -> axum::response::Response {
    match services.explain_scope_for(&actor).await {
        Ok(resolution) => {
            let explanation = explain_scope(&actor, &resolution);
            (StatusCode::OK, Json(WhoAmI::new(&actor, explanation))).into_response()
        }
        Err(err) => errors::access_error_response(&err, Some(&actor.role)),
    }
}
