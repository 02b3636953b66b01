use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use siteops_auth::{ScopeCondition, SiteRestriction, StoreError};
use siteops_core::{OrganizationId, RecordId, SiteId, UserId};

use super::{RecordKind, RecordQuery, RecordStatus, RecordStore, SiteRecord};
use crate::store::map_sqlx_error;

const APPROVE_ANY: &str = "UPDATE site_records \
     SET status = 'approved', approved_by = $2, updated_at = NOW() \
     WHERE id = $1";

const APPROVE_IN_ORG: &str = "UPDATE site_records \
     SET status = 'approved', approved_by = $2, updated_at = NOW() \
     WHERE id = $1 AND organization_id = $3 \
       AND site_id IN (SELECT id FROM sites WHERE organization_id = $3)";

const APPROVE_IN_SITES: &str = "UPDATE site_records \
     SET status = 'approved', approved_by = $2, updated_at = NOW() \
     WHERE id = $1 AND site_id = ANY($3)";

/// Postgres-backed record store over `site_records`.
///
/// The approve statement carries the scope predicate in its `WHERE` clause, so
/// a row that left the actor's scope after the handler's check is not written.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: Arc<PgPool>,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

fn record_from_row(row: &PgRow) -> Result<SiteRecord, sqlx::Error> {
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;
    let decode = |column: &str, value: &str| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("unknown value '{value}'").into(),
    };

    Ok(SiteRecord {
        id: RecordId::from_uuid(row.try_get("id")?),
        organization_id: OrganizationId::from_uuid(row.try_get("organization_id")?),
        site_id: SiteId::from_uuid(row.try_get("site_id")?),
        kind: RecordKind::parse(&kind).ok_or_else(|| decode("kind", &kind))?,
        title: row.try_get("title")?,
        status: RecordStatus::parse(&status).ok_or_else(|| decode("status", &status))?,
        recorded_on: row.try_get::<NaiveDate, _>("recorded_on")?,
        approved_by: row
            .try_get::<Option<uuid::Uuid>, _>("approved_by")?
            .map(UserId::from_uuid),
    })
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[instrument(skip(self, restriction), err(Display))]
    async fn list(
        &self,
        restriction: SiteRestriction<'_>,
        query: RecordQuery,
    ) -> Result<Vec<SiteRecord>, StoreError> {
        let site_ids: Option<Vec<uuid::Uuid>> = match restriction {
            SiteRestriction::Unrestricted => None,
            SiteRestriction::Only(sites) => Some(sites.iter().map(|s| *s.as_uuid()).collect()),
        };

        let rows = sqlx::query(
            r#"
            SELECT id, organization_id, site_id, kind, title, status, recorded_on, approved_by
            FROM site_records
            WHERE ($1::uuid[] IS NULL OR site_id = ANY($1))
              AND ($2::text IS NULL OR kind = $2)
              AND ($3::date IS NULL OR recorded_on >= $3)
              AND ($4::date IS NULL OR recorded_on <= $4)
            ORDER BY recorded_on DESC, id ASC
            "#,
        )
        .bind(site_ids)
        .bind(query.kind.map(|k| k.as_str()))
        .bind(query.range.map(|r| r.from()))
        .bind(query.range.map(|r| r.to()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_records", e))?;

        rows.iter()
            .map(|row| record_from_row(row).map_err(|e| map_sqlx_error("list_records", e)))
            .collect()
    }

    async fn get(&self, id: RecordId) -> Result<Option<SiteRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, organization_id, site_id, kind, title, status, recorded_on, approved_by
            FROM site_records
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_record", e))?;

        row.as_ref()
            .map(record_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_record", e))
    }

    #[instrument(skip_all, fields(record_id = %id), err(Display))]
    async fn approve(
        &self,
        id: RecordId,
        approver: UserId,
        condition: &ScopeCondition,
    ) -> Result<u64, StoreError> {
        let query = match condition {
            ScopeCondition::Any => sqlx::query(APPROVE_ANY)
                .bind(id.as_uuid())
                .bind(approver.as_uuid()),
            ScopeCondition::Organization(org_id) => sqlx::query(APPROVE_IN_ORG)
                .bind(id.as_uuid())
                .bind(approver.as_uuid())
                .bind(org_id.as_uuid()),
            ScopeCondition::Sites(sites) => sqlx::query(APPROVE_IN_SITES)
                .bind(id.as_uuid())
                .bind(approver.as_uuid())
                .bind(sites.iter().map(|s| *s.as_uuid()).collect::<Vec<_>>()),
        };

        let result = query
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("approve_record", e))?;
        Ok(result.rows_affected())
    }
}
