use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};

use siteops_auth::{AccessError, ActorContext, list_in_scope, resolve_site_filter};
use siteops_infra::RecordQuery;

use crate::app::{
    dto::{AnalyticsSummary, SummaryParams},
    errors,
    services::AppServices,
};

/// GET /analytics/summary?from=YYYY-MM-DD&to=YYYY-MM-DD
///
/// The date range is validated independently of scoping; an inverted range
/// is a 400 for every actor.
pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(params): Query<SummaryParams>,
) -> axum::response::Response {
    match build_summary(&services, &actor, &params).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => errors::access_error_response(&err, Some(&actor.role)),
    }
}

async fn build_summary(
    services: &AppServices,
    actor: &ActorContext,
    params: &SummaryParams,
) -> Result<AnalyticsSummary, AccessError> {
    let range = params.range()?;
    let scope = services.scope_for(actor).await?;
    let filter = resolve_site_filter(&scope, services.directory.as_ref()).await?;

    let records = &services.records;
    let query = RecordQuery {
        kind: None,
        range: Some(range),
    };
    let visible = list_in_scope(&filter, |restriction| async move {
        records.list(restriction, query).await.map_err(AccessError::from)
    })
    .await?;

    Ok(AnalyticsSummary::from_records(range, &visible))
}
