//! Scoped site records: list through the site filter, approve through
//! load → check → conditional write. Both paths take site ownership from the
//! site directory.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};

use siteops_auth::{
    AccessError, ActorContext, list_in_scope, resolve_site_filter, with_conditional_mutation,
    with_scoped_mutation,
};
use siteops_core::RecordId;
use siteops_infra::{RecordQuery, SiteRecord};
use siteops_observability::audit;

use crate::app::{dto::ListRecordsParams, errors, services::AppServices};

/// GET /records - records on sites the actor may see. An empty scope is an
/// empty list, and no store query is issued for it.
pub async fn list_records(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Query(params): Query<ListRecordsParams>,
) -> axum::response::Response {
    match list(&services, &actor, &params).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => errors::access_error_response(&err, Some(&actor.role)),
    }
}

async fn list(
    services: &AppServices,
    actor: &ActorContext,
    params: &ListRecordsParams,
) -> Result<Vec<SiteRecord>, AccessError> {
    let query = RecordQuery {
        kind: params.kind()?,
        range: None,
    };
    let scope = services.scope_for(actor).await?;
    let filter = resolve_site_filter(&scope, services.directory.as_ref()).await?;

    let records = &services.records;
    list_in_scope(&filter, |restriction| async move {
        records.list(restriction, query).await.map_err(AccessError::from)
    })
    .await
}

/// POST /records/:id/approve
pub async fn approve_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match approve(&services, &actor, &id).await {
        Ok(record) => {
            audit::mutated(&actor.user_id, "approve_record", &record.id);
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(err) => {
            if err.is_denial() {
                audit::denied(&actor.user_id, actor.role.as_str(), "approve_record", &id, &err.to_string());
            }
            errors::access_error_response(&err, Some(&actor.role))
        }
    }
}

async fn approve(services: &AppServices, actor: &ActorContext, raw_id: &str) -> Result<SiteRecord, AccessError> {
    let id: RecordId = raw_id.parse()?;
    let scope = services.scope_for(actor).await?;
    let scope = &scope;
    let records = &services.records;

    with_scoped_mutation(
        scope,
        services.directory.as_ref(),
        || async move { records.get(id).await.map_err(AccessError::from) },
        |record: SiteRecord| async move {
            let record_id = record.id;
            // The write re-asserts the scope; a row that moved out of it in
            // the meantime is not touched.
            with_conditional_mutation(scope, |condition| async move {
                records
                    .approve(record_id, actor.user_id, &condition)
                    .await
                    .map_err(AccessError::from)
            })
            .await?;

            records.get(record_id).await?.ok_or(AccessError::NotFound)
        },
    )
    .await
}
