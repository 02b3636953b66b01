//! JSON fixtures for the in-memory stores.
//!
//! Used by local development (`SITEOPS_FIXTURES`) and the API black-box tests.
//! Every section is optional.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use siteops_auth::{ActorProfile, LegacyPartnerSiteMapping, PartnerSiteMapping};
use siteops_core::{OrganizationId, SiteId};

use crate::records::{InMemoryRecordStore, SiteRecord};
use crate::store::{InMemoryMappingStore, InMemoryProfileStore, InMemorySiteDirectory};

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixtures: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid fixtures: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FixtureSite {
    pub id: SiteId,
    pub organization_id: OrganizationId,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    pub sites: Vec<FixtureSite>,
    pub profiles: Vec<ActorProfile>,
    pub partner_site_mappings: Vec<PartnerSiteMapping>,
    pub legacy_partner_sites: Vec<LegacyPartnerSiteMapping>,
    pub records: Vec<SiteRecord>,
}

impl Fixtures {
    pub fn from_json(raw: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn apply(
        &self,
        mappings: &InMemoryMappingStore,
        directory: &InMemorySiteDirectory,
        profiles: &InMemoryProfileStore,
        records: &InMemoryRecordStore,
    ) {
        for site in &self.sites {
            directory.insert_site(site.id, site.organization_id);
        }
        for profile in &self.profiles {
            profiles.upsert(profile.clone());
        }
        for mapping in &self.partner_site_mappings {
            mappings.insert_primary(mapping.clone());
        }
        for mapping in &self.legacy_partner_sites {
            mappings.insert_legacy(mapping.clone());
        }
        for record in &self.records {
            records.insert(record.clone());
        }

        tracing::info!(
            sites = self.sites.len(),
            profiles = self.profiles.len(),
            mappings = self.partner_site_mappings.len(),
            legacy_mappings = self.legacy_partner_sites.len(),
            records = self.records.len(),
            "fixtures loaded"
        );
    }
}
