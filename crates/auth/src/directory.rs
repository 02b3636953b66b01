//! Site → organization ownership lookups.
//!
//! The pure guard checks take a verified owner as an argument; the async guard
//! helpers look it up through a [`SiteDirectory`].

use std::collections::BTreeSet;

use async_trait::async_trait;

use siteops_core::{OrganizationId, SiteId};

use crate::StoreError;

#[async_trait]
pub trait SiteDirectory: Send + Sync {
    /// Owning organization of a site, or `None` for an unknown site.
    async fn organization_of(&self, site_id: SiteId) -> Result<Option<OrganizationId>, StoreError>;

    /// Every site owned by an organization.
    async fn sites_in_organization(
        &self,
        org_id: OrganizationId,
    ) -> Result<BTreeSet<SiteId>, StoreError>;
}

#[async_trait]
impl<S> SiteDirectory for std::sync::Arc<S>
where
    S: SiteDirectory + ?Sized,
{
    async fn organization_of(&self, site_id: SiteId) -> Result<Option<OrganizationId>, StoreError> {
        (**self).organization_of(site_id).await
    }

    async fn sites_in_organization(
        &self,
        org_id: OrganizationId,
    ) -> Result<BTreeSet<SiteId>, StoreError> {
        (**self).sites_in_organization(org_id).await
    }
}
