//! Partner→site mapping rows and the read-only source they come from.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use siteops_core::{PartnerCompanyId, SiteId};

use crate::StoreError;

/// Current partner→site mapping (primary source of truth).
///
/// `start_date`/`end_date` are informational: only `is_active` decides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerSiteMapping {
    pub partner_company_id: PartnerCompanyId,
    pub site_id: SiteId,
    pub is_active: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl PartnerSiteMapping {
    pub fn contributes(&self) -> bool {
        self.is_active
    }
}

/// Contract status on the deprecated legacy relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContractStatus {
    Active,
    Pending,
    Suspended,
    Terminated,
    Other(String),
}

impl ContractStatus {
    /// Case-insensitive; a `TERMINATED` row must not slip through as "other".
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "active" => ContractStatus::Active,
            "pending" => ContractStatus::Pending,
            "suspended" => ContractStatus::Suspended,
            "terminated" => ContractStatus::Terminated,
            _ => ContractStatus::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContractStatus::Active => "active",
            ContractStatus::Pending => "pending",
            ContractStatus::Suspended => "suspended",
            ContractStatus::Terminated => "terminated",
            ContractStatus::Other(raw) => raw,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, ContractStatus::Terminated)
    }
}

impl From<String> for ContractStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ContractStatus> for String {
    fn from(value: ContractStatus) -> Self {
        value.as_str().to_string()
    }
}

/// Deprecated partner→site relation, consulted only by the legacy fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyPartnerSiteMapping {
    pub partner_company_id: PartnerCompanyId,
    pub site_id: SiteId,
    pub contract_status: ContractStatus,
}

impl LegacyPartnerSiteMapping {
    pub fn contributes(&self) -> bool {
        !self.contract_status.is_terminated()
    }
}

/// Read-only access to both mapping relations, keyed by partner company.
///
/// Implementations return every row for the company; filtering on
/// `is_active`/`contract_status` is the resolver's job.
#[async_trait]
pub trait MappingSource: Send + Sync {
    async fn primary_mappings(
        &self,
        partner_company_id: PartnerCompanyId,
    ) -> Result<Vec<PartnerSiteMapping>, StoreError>;

    async fn legacy_mappings(
        &self,
        partner_company_id: PartnerCompanyId,
    ) -> Result<Vec<LegacyPartnerSiteMapping>, StoreError>;
}

#[async_trait]
impl<S> MappingSource for std::sync::Arc<S>
where
    S: MappingSource + ?Sized,
{
    async fn primary_mappings(
        &self,
        partner_company_id: PartnerCompanyId,
    ) -> Result<Vec<PartnerSiteMapping>, StoreError> {
        (**self).primary_mappings(partner_company_id).await
    }

    async fn legacy_mappings(
        &self,
        partner_company_id: PartnerCompanyId,
    ) -> Result<Vec<LegacyPartnerSiteMapping>, StoreError> {
        (**self).legacy_mappings(partner_company_id).await
    }
}
