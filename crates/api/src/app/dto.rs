use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use siteops_auth::{AccessError, ActorContext, ScopeExplanation};
use siteops_core::{DateRange, OrganizationId, UserId};
use siteops_infra::{RecordKind, RecordStatus, SiteRecord};

// ─────────────────────────────────────────────────────────────────────────────
// Query parameters
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListRecordsParams {
    pub kind: Option<String>,
}

impl ListRecordsParams {
    pub fn kind(&self) -> Result<Option<RecordKind>, AccessError> {
        self.kind
            .as_deref()
            .map(|raw| {
                RecordKind::parse(raw).ok_or_else(|| {
                    AccessError::validation("kind must be one of: material_request, shipment, daily_report")
                })
            })
            .transpose()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl SummaryParams {
    /// Both ends are required (`YYYY-MM-DD`) and `from` must not be after `to`.
    pub fn range(&self) -> Result<DateRange, AccessError> {
        let from = parse_date("from", self.from.as_deref())?;
        let to = parse_date("to", self.to.as_deref())?;
        Ok(DateRange::new(from, to)?)
    }
}

fn parse_date(name: &str, raw: Option<&str>) -> Result<NaiveDate, AccessError> {
    let raw = raw.ok_or_else(|| AccessError::validation(format!("{name} is required")))?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AccessError::validation(format!("{name} must be a date (YYYY-MM-DD)")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct WhoAmI {
    pub user_id: UserId,
    pub email: String,
    pub role: String,
    pub organization_id: Option<OrganizationId>,
    pub scope: ScopeExplanation,
}

impl WhoAmI {
    pub fn new(actor: &ActorContext, scope: ScopeExplanation) -> Self {
        Self {
            user_id: actor.user_id,
            email: actor.email.clone(),
            role: actor.role.as_str().to_string(),
            organization_id: actor.organization_id,
            scope,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total: usize,
    pub by_kind: BTreeMap<RecordKind, usize>,
    pub pending: usize,
    pub approved: usize,
}

impl AnalyticsSummary {
    pub fn from_records(range: DateRange, records: &[SiteRecord]) -> Self {
        let mut by_kind = BTreeMap::new();
        let (mut pending, mut approved) = (0, 0);
        for record in records {
            *by_kind.entry(record.kind).or_insert(0) += 1;
            match record.status {
                RecordStatus::Pending => pending += 1,
                RecordStatus::Approved => approved += 1,
            }
        }

        Self {
            from: range.from(),
            to: range.to(),
            total: records.len(),
            by_kind,
            pending,
            approved,
        }
    }
}
