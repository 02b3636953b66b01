//! The resolved, per-request description of what an actor may touch.

use std::collections::BTreeSet;

use serde::Serialize;

use siteops_core::{OrganizationId, SiteId};

/// Authorized scope for one request.
///
/// Consumers match exhaustively on the variant; there is no "default allow".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthorizedScope {
    /// Global roles: every organization and site.
    Unrestricted,
    /// Restricted admins: exactly one organization.
    Org { org_id: OrganizationId },
    /// Site managers and partner/customer users. May be empty.
    Sites { site_ids: BTreeSet<SiteId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeMode {
    Unrestricted,
    Org,
    Sites,
}

impl AuthorizedScope {
    /// Authorized for nothing.
    pub fn none() -> Self {
        AuthorizedScope::Sites {
            site_ids: BTreeSet::new(),
        }
    }

    pub fn org(org_id: OrganizationId) -> Self {
        AuthorizedScope::Org { org_id }
    }

    pub fn sites(site_ids: impl IntoIterator<Item = SiteId>) -> Self {
        AuthorizedScope::Sites {
            site_ids: site_ids.into_iter().collect(),
        }
    }

    pub fn mode(&self) -> ScopeMode {
        match self {
            AuthorizedScope::Unrestricted => ScopeMode::Unrestricted,
            AuthorizedScope::Org { .. } => ScopeMode::Org,
            AuthorizedScope::Sites { .. } => ScopeMode::Sites,
        }
    }

    pub fn org_id(&self) -> Option<OrganizationId> {
        match self {
            AuthorizedScope::Org { org_id } => Some(*org_id),
            _ => None,
        }
    }

    pub fn site_ids(&self) -> Option<&BTreeSet<SiteId>> {
        match self {
            AuthorizedScope::Sites { site_ids } => Some(site_ids),
            _ => None,
        }
    }

    /// True only for a `Sites` scope with no sites.
    pub fn is_empty(&self) -> bool {
        matches!(self, AuthorizedScope::Sites { site_ids } if site_ids.is_empty())
    }
}
