//! Postgres-backed adapters.
//!
//! All queries here are reads. Row decoding failures surface as
//! [`StoreError`]; a mapping row that cannot be decoded never widens a scope.
//!
//! | Seam | Table |
//! |------|-------|
//! | [`MappingSource::primary_mappings`] | `partner_site_mappings` |
//! | [`MappingSource::legacy_mappings`] | `legacy_partner_sites` |
//! | [`SiteDirectory`] | `sites` |
//! | [`ProfileStore`] | `profiles` |

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use siteops_auth::{
    ActorProfile, ContractStatus, LegacyPartnerSiteMapping, MappingSource, PartnerSiteMapping,
    ProfileStore, SiteDirectory, StoreError,
};
use siteops_core::{OrganizationId, PartnerCompanyId, SiteId, UserId};

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::new(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::new(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::ColumnDecode { index, source } => {
            StoreError::new(format!("failed to decode column {index} in {operation}: {source}"))
        }
        other => StoreError::new(format!("{operation} failed: {other}")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mappings
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PostgresMappingSource {
    pool: Arc<PgPool>,
}

impl PostgresMappingSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

fn primary_from_row(row: &PgRow) -> Result<PartnerSiteMapping, sqlx::Error> {
    Ok(PartnerSiteMapping {
        partner_company_id: PartnerCompanyId::from_uuid(row.try_get("partner_company_id")?),
        site_id: SiteId::from_uuid(row.try_get("site_id")?),
        is_active: row.try_get("is_active")?,
        start_date: row.try_get::<Option<NaiveDate>, _>("start_date")?,
        end_date: row.try_get::<Option<NaiveDate>, _>("end_date")?,
    })
}

fn legacy_from_row(row: &PgRow) -> Result<LegacyPartnerSiteMapping, sqlx::Error> {
    let status: String = row.try_get("contract_status")?;
    Ok(LegacyPartnerSiteMapping {
        partner_company_id: PartnerCompanyId::from_uuid(row.try_get("partner_company_id")?),
        site_id: SiteId::from_uuid(row.try_get("site_id")?),
        contract_status: ContractStatus::parse(&status),
    })
}

#[async_trait]
impl MappingSource for PostgresMappingSource {
    #[instrument(skip_all, fields(partner_company_id = %partner_company_id), err(Display))]
    async fn primary_mappings(
        &self,
        partner_company_id: PartnerCompanyId,
    ) -> Result<Vec<PartnerSiteMapping>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT partner_company_id, site_id, is_active, start_date, end_date
            FROM partner_site_mappings
            WHERE partner_company_id = $1
            "#,
        )
        .bind(partner_company_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("primary_mappings", e))?;

        rows.iter()
            .map(|row| primary_from_row(row).map_err(|e| map_sqlx_error("primary_mappings", e)))
            .collect()
    }

    #[instrument(skip_all, fields(partner_company_id = %partner_company_id), err(Display))]
    async fn legacy_mappings(
        &self,
        partner_company_id: PartnerCompanyId,
    ) -> Result<Vec<LegacyPartnerSiteMapping>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT partner_company_id, site_id, contract_status
            FROM legacy_partner_sites
            WHERE partner_company_id = $1
            "#,
        )
        .bind(partner_company_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("legacy_mappings", e))?;

        rows.iter()
            .map(|row| legacy_from_row(row).map_err(|e| map_sqlx_error("legacy_mappings", e)))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Site directory
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PostgresSiteDirectory {
    pool: Arc<PgPool>,
}

impl PostgresSiteDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl SiteDirectory for PostgresSiteDirectory {
    async fn organization_of(&self, site_id: SiteId) -> Result<Option<OrganizationId>, StoreError> {
        let row = sqlx::query("SELECT organization_id FROM sites WHERE id = $1")
            .bind(site_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("organization_of", e))?;

        row.map(|r| r.try_get("organization_id").map(OrganizationId::from_uuid))
            .transpose()
            .map_err(|e| map_sqlx_error("organization_of", e))
    }

    async fn sites_in_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<BTreeSet<SiteId>, StoreError> {
        let rows = sqlx::query("SELECT id FROM sites WHERE organization_id = $1")
            .bind(organization_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("sites_in_organization", e))?;

        rows.iter()
            .map(|r| r.try_get("id").map(SiteId::from_uuid))
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|e| map_sqlx_error("sites_in_organization", e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Profiles
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PostgresProfileStore {
    pool: Arc<PgPool>,
}

impl PostgresProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

fn profile_from_row(row: &PgRow) -> Result<ActorProfile, sqlx::Error> {
    let uuid_opt = |col: &str| row.try_get::<Option<uuid::Uuid>, _>(col);
    Ok(ActorProfile {
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        email: row.try_get("email")?,
        role: row.try_get("role")?,
        organization_id: uuid_opt("organization_id")?.map(OrganizationId::from_uuid),
        is_restricted: row.try_get("is_restricted")?,
        restricted_org_id: uuid_opt("restricted_org_id")?.map(OrganizationId::from_uuid),
        site_id: uuid_opt("site_id")?.map(SiteId::from_uuid),
        partner_company_id: uuid_opt("partner_company_id")?.map(PartnerCompanyId::from_uuid),
    })
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    #[instrument(skip_all, fields(user_id = %user_id), err(Display))]
    async fn load_profile(&self, user_id: UserId) -> Result<Option<ActorProfile>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT user_id, email, role, organization_id, is_restricted,
                   restricted_org_id, site_id, partner_company_id
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_profile", e))?;

        row.as_ref()
            .map(profile_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("load_profile", e))
    }
}
