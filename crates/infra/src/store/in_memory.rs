//! In-memory adapters for tests and local development.
//!
//! Each store can be told to fail its reads, and the mapping store counts
//! reads per relation so callers can assert which source was consulted.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use siteops_auth::{
    ActorProfile, LegacyPartnerSiteMapping, MappingSource, PartnerSiteMapping, ProfileStore,
    SiteDirectory, StoreError,
};
use siteops_core::{OrganizationId, PartnerCompanyId, SiteId, UserId};

fn poisoned(table: &str) -> StoreError {
    StoreError::new(format!("{table} lock poisoned"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Mappings
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryMappingStore {
    primary: RwLock<Vec<PartnerSiteMapping>>,
    legacy: RwLock<Vec<LegacyPartnerSiteMapping>>,
    fail_primary: AtomicBool,
    fail_legacy: AtomicBool,
    primary_reads: AtomicUsize,
    legacy_reads: AtomicUsize,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_primary(&self, mapping: PartnerSiteMapping) {
        if let Ok(mut rows) = self.primary.write() {
            rows.push(mapping);
        }
    }

    pub fn insert_legacy(&self, mapping: LegacyPartnerSiteMapping) {
        if let Ok(mut rows) = self.legacy.write() {
            rows.push(mapping);
        }
    }

    /// Flip `is_active` on every primary row for the pair. Returns the number of rows touched.
    pub fn set_primary_active(&self, partner_company_id: PartnerCompanyId, site_id: SiteId, active: bool) -> usize {
        let Ok(mut rows) = self.primary.write() else {
            return 0;
        };
        let mut touched = 0;
        for row in rows
            .iter_mut()
            .filter(|r| r.partner_company_id == partner_company_id && r.site_id == site_id)
        {
            row.is_active = active;
            touched += 1;
        }
        touched
    }

    pub fn fail_primary(&self, fail: bool) {
        self.fail_primary.store(fail, Ordering::SeqCst);
    }

    pub fn fail_legacy(&self, fail: bool) {
        self.fail_legacy.store(fail, Ordering::SeqCst);
    }

    pub fn primary_reads(&self) -> usize {
        self.primary_reads.load(Ordering::SeqCst)
    }

    pub fn legacy_reads(&self) -> usize {
        self.legacy_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MappingSource for InMemoryMappingStore {
    async fn primary_mappings(
        &self,
        partner_company_id: PartnerCompanyId,
    ) -> Result<Vec<PartnerSiteMapping>, StoreError> {
        self.primary_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_primary.load(Ordering::SeqCst) {
            return Err(StoreError::new("partner_site_mappings unavailable"));
        }
        let rows = self.primary.read().map_err(|_| poisoned("partner_site_mappings"))?;
        Ok(rows
            .iter()
            .filter(|r| r.partner_company_id == partner_company_id)
            .cloned()
            .collect())
    }

    async fn legacy_mappings(
        &self,
        partner_company_id: PartnerCompanyId,
    ) -> Result<Vec<LegacyPartnerSiteMapping>, StoreError> {
        self.legacy_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_legacy.load(Ordering::SeqCst) {
            return Err(StoreError::new("legacy_partner_sites unavailable"));
        }
        let rows = self.legacy.read().map_err(|_| poisoned("legacy_partner_sites"))?;
        Ok(rows
            .iter()
            .filter(|r| r.partner_company_id == partner_company_id)
            .cloned()
            .collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Site directory
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemorySiteDirectory {
    sites: RwLock<HashMap<SiteId, OrganizationId>>,
    fail: AtomicBool,
}

impl InMemorySiteDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_site(&self, site_id: SiteId, organization_id: OrganizationId) {
        if let Ok(mut sites) = self.sites.write() {
            sites.insert(site_id, organization_id);
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(StoreError::new("sites unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SiteDirectory for InMemorySiteDirectory {
    async fn organization_of(&self, site_id: SiteId) -> Result<Option<OrganizationId>, StoreError> {
        self.check()?;
        let sites = self.sites.read().map_err(|_| poisoned("sites"))?;
        Ok(sites.get(&site_id).copied())
    }

    async fn sites_in_organization(
        &self,
        organization_id: OrganizationId,
    ) -> Result<BTreeSet<SiteId>, StoreError> {
        self.check()?;
        let sites = self.sites.read().map_err(|_| poisoned("sites"))?;
        Ok(sites
            .iter()
            .filter(|(_, org)| **org == organization_id)
            .map(|(site, _)| *site)
            .collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Profiles
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<UserId, ActorProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, profile: ActorProfile) {
        if let Ok(mut profiles) = self.profiles.write() {
            profiles.insert(profile.user_id, profile);
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load_profile(&self, user_id: UserId) -> Result<Option<ActorProfile>, StoreError> {
        let profiles = self.profiles.read().map_err(|_| poisoned("profiles"))?;
        Ok(profiles.get(&user_id).cloned())
    }
}
