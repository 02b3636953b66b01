//! Site records: the scoped resources the HTTP surface lists and approves.
//!
//! A record belongs to exactly one site of one organization. Stores never
//! decide visibility themselves; callers pass a [`SiteRestriction`] for lists
//! and a [`ScopeCondition`] for writes.

mod in_memory;
mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use siteops_auth::{ScopeCondition, ScopedResource, SiteRestriction, StoreError};
use siteops_core::{DateRange, OrganizationId, RecordId, SiteId, UserId};

pub use in_memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    MaterialRequest,
    Shipment,
    DailyReport,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::MaterialRequest => "material_request",
            RecordKind::Shipment => "shipment",
            RecordKind::DailyReport => "daily_report",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "material_request" => Some(RecordKind::MaterialRequest),
            "shipment" => Some(RecordKind::Shipment),
            "daily_report" => Some(RecordKind::DailyReport),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    Approved,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Approved => "approved",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(RecordStatus::Pending),
            "approved" => Some(RecordStatus::Approved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
    pub id: RecordId,
    pub organization_id: OrganizationId,
    pub site_id: SiteId,
    pub kind: RecordKind,
    pub title: String,
    pub status: RecordStatus,
    pub recorded_on: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<UserId>,
}

impl ScopedResource for SiteRecord {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    fn site_id(&self) -> SiteId {
        self.site_id
    }
}

/// Non-scope filters for [`RecordStore::list`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordQuery {
    pub kind: Option<RecordKind>,
    pub range: Option<DateRange>,
}

impl RecordQuery {
    pub fn matches(&self, record: &SiteRecord) -> bool {
        self.kind.is_none_or(|k| k == record.kind)
            && self.range.is_none_or(|r| r.contains(record.recorded_on))
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records visible under `restriction`, newest first.
    async fn list(
        &self,
        restriction: SiteRestriction<'_>,
        query: RecordQuery,
    ) -> Result<Vec<SiteRecord>, StoreError>;

    async fn get(&self, id: RecordId) -> Result<Option<SiteRecord>, StoreError>;

    /// Mark a record approved if it still satisfies `condition`.
    ///
    /// Returns the number of rows written; zero when the row is gone or no
    /// longer in scope.
    async fn approve(
        &self,
        id: RecordId,
        approver: UserId,
        condition: &ScopeCondition,
    ) -> Result<u64, StoreError>;
}

#[async_trait]
impl<S> RecordStore for std::sync::Arc<S>
where
    S: RecordStore + ?Sized,
{
    async fn list(
        &self,
        restriction: SiteRestriction<'_>,
        query: RecordQuery,
    ) -> Result<Vec<SiteRecord>, StoreError> {
        (**self).list(restriction, query).await
    }

    async fn get(&self, id: RecordId) -> Result<Option<SiteRecord>, StoreError> {
        (**self).get(id).await
    }

    async fn approve(
        &self,
        id: RecordId,
        approver: UserId,
        condition: &ScopeCondition,
    ) -> Result<u64, StoreError> {
        (**self).approve(id, approver, condition).await
    }
}
