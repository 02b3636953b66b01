//! Enforcement of an [`AuthorizedScope`] against candidate resources.
//!
//! Single-resource checks (`assert_*`) deny with [`AccessError::Authorization`].
//! List endpoints go through [`filter_to_scope`] + [`list_in_scope`], which never
//! hands an empty site restriction to a query.

use std::collections::BTreeSet;
use std::future::Future;

use siteops_core::{OrganizationId, SiteId};

use crate::{AccessError, AuthorizedScope, SiteDirectory};

// ─────────────────────────────────────────────────────────────────────────────
// Single-resource checks
// ─────────────────────────────────────────────────────────────────────────────

/// Check a resource whose owning organization is already known.
///
/// A `Sites` scope has no organization dimension and is denied here; such
/// handlers must resolve the resource's site and use [`assert_site_access`].
pub fn assert_org_access(scope: &AuthorizedScope, candidate_org: OrganizationId) -> Result<(), AccessError> {
    match scope {
        AuthorizedScope::Unrestricted => Ok(()),
        AuthorizedScope::Org { org_id } if *org_id == candidate_org => Ok(()),
        AuthorizedScope::Org { .. } => Err(AccessError::Authorization),
        AuthorizedScope::Sites { .. } => {
            tracing::debug!("org-level check requested for a site-scoped actor; denying");
            Err(AccessError::Authorization)
        }
    }
}

/// Check a candidate site.
///
/// `site_org` is the site's owning organization as verified by the caller
/// (normally via [`SiteDirectory::organization_of`]). An org-scoped actor is
/// denied when it is unknown.
pub fn assert_site_access(
    scope: &AuthorizedScope,
    candidate_site: SiteId,
    site_org: Option<OrganizationId>,
) -> Result<(), AccessError> {
    let allowed = match scope {
        AuthorizedScope::Unrestricted => true,
        AuthorizedScope::Org { org_id } => site_org == Some(*org_id),
        AuthorizedScope::Sites { site_ids } => site_ids.contains(&candidate_site),
    };

    if allowed {
        Ok(())
    } else {
        Err(AccessError::Authorization)
    }
}

/// A loaded record that belongs to one site of one organization.
pub trait ScopedResource {
    fn organization_id(&self) -> OrganizationId;
    fn site_id(&self) -> SiteId;
}

/// Check a loaded resource.
///
/// Site scopes compare the owning site. Org scopes compare `site_org`, the
/// site's owner as verified through a [`SiteDirectory`]; the resource's own
/// `organization_id` is not trusted on its own and is denied when it disagrees
/// with the verified owner.
pub fn assert_resource_access<R>(
    scope: &AuthorizedScope,
    resource: &R,
    site_org: Option<OrganizationId>,
) -> Result<(), AccessError>
where
    R: ScopedResource + ?Sized,
{
    if matches!(scope, AuthorizedScope::Org { .. }) && site_org != Some(resource.organization_id()) {
        tracing::warn!(
            site_id = %resource.site_id(),
            "resource organization does not match its site's owner; denying"
        );
        return Err(AccessError::Authorization);
    }
    assert_site_access(scope, resource.site_id(), site_org)
}

/// [`assert_resource_access`] with the org-mode site owner looked up through
/// `directory`. Only an org scope reads the directory.
pub async fn verify_resource_access<R, D>(
    scope: &AuthorizedScope,
    resource: &R,
    directory: &D,
) -> Result<(), AccessError>
where
    R: ScopedResource + ?Sized,
    D: SiteDirectory + ?Sized,
{
    let site_org = match scope {
        AuthorizedScope::Org { .. } => directory.organization_of(resource.site_id()).await?,
        _ => None,
    };
    assert_resource_access(scope, resource, site_org)
}

// ─────────────────────────────────────────────────────────────────────────────
// List filtering
// ─────────────────────────────────────────────────────────────────────────────

/// A site set that is guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptySites(BTreeSet<SiteId>);

impl NonEmptySites {
    pub fn new(site_ids: BTreeSet<SiteId>) -> Option<Self> {
        if site_ids.is_empty() {
            None
        } else {
            Some(Self(site_ids))
        }
    }

    pub fn contains(&self, site_id: &SiteId) -> bool {
        self.0.contains(site_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteId> {
        self.0.iter()
    }
}

/// Site restriction to intersect with a list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteFilter {
    /// No restriction.
    All,
    /// Only these sites.
    Only(NonEmptySites),
    /// Nothing is visible; the query must not run.
    Nothing,
}

/// What a list query receives once [`SiteFilter::Nothing`] has been ruled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteRestriction<'a> {
    Unrestricted,
    Only(&'a NonEmptySites),
}

impl SiteRestriction<'_> {
    pub fn allows(&self, site_id: &SiteId) -> bool {
        match self {
            SiteRestriction::Unrestricted => true,
            SiteRestriction::Only(sites) => sites.contains(site_id),
        }
    }
}

impl SiteFilter {
    pub fn allows(&self, site_id: &SiteId) -> bool {
        self.restriction().is_some_and(|r| r.allows(site_id))
    }

    /// `None` when nothing is visible.
    pub fn restriction(&self) -> Option<SiteRestriction<'_>> {
        match self {
            SiteFilter::All => Some(SiteRestriction::Unrestricted),
            SiteFilter::Only(sites) => Some(SiteRestriction::Only(sites)),
            SiteFilter::Nothing => None,
        }
    }
}

/// Turn a scope into a list restriction.
///
/// For an org scope, `org_sites` must be the organization's sites as looked up
/// by the caller; without it the filter is [`SiteFilter::Nothing`]. The
/// argument is ignored for the other modes.
pub fn filter_to_scope(scope: &AuthorizedScope, org_sites: Option<&BTreeSet<SiteId>>) -> SiteFilter {
    let sites = match scope {
        AuthorizedScope::Unrestricted => return SiteFilter::All,
        AuthorizedScope::Org { .. } => match org_sites {
            Some(sites) => sites.clone(),
            None => return SiteFilter::Nothing,
        },
        AuthorizedScope::Sites { site_ids } => site_ids.clone(),
    };

    NonEmptySites::new(sites).map_or(SiteFilter::Nothing, SiteFilter::Only)
}

/// [`filter_to_scope`] with the org-mode site lookup done through `directory`.
///
/// Only an org scope reads the directory.
pub async fn resolve_site_filter<D>(scope: &AuthorizedScope, directory: &D) -> Result<SiteFilter, AccessError>
where
    D: SiteDirectory + ?Sized,
{
    match scope {
        AuthorizedScope::Org { org_id } => {
            let sites = directory.sites_in_organization(*org_id).await?;
            Ok(filter_to_scope(scope, Some(&sites)))
        }
        _ => Ok(filter_to_scope(scope, None)),
    }
}

/// Run a list query under `filter`.
///
/// With [`SiteFilter::Nothing`] the query is not issued and the result is an
/// empty, successful list.
pub async fn list_in_scope<'a, T, E, F, Fut>(filter: &'a SiteFilter, fetch: F) -> Result<Vec<T>, E>
where
    F: FnOnce(SiteRestriction<'a>) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    match filter.restriction() {
        Some(restriction) => fetch(restriction).await,
        None => {
            tracing::debug!("empty authorized scope; skipping list query");
            Ok(Vec::new())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Check-then-mutate
// ─────────────────────────────────────────────────────────────────────────────

/// Load → check → mutate, in that order.
///
/// `mutate` runs only after the loaded resource passed
/// [`verify_resource_access`] against `directory`; a missing resource is
/// [`AccessError::NotFound`].
/// The check and the write are separate statements, so a mapping change landing
/// in between is not observed unless `mutate` re-asserts the scope itself (see
/// [`with_conditional_mutation`]).
pub async fn with_scoped_mutation<R, D, T, E, L, LFut, M, MFut>(
    scope: &AuthorizedScope,
    directory: &D,
    load: L,
    mutate: M,
) -> Result<T, E>
where
    R: ScopedResource,
    D: SiteDirectory + ?Sized,
    E: From<AccessError>,
    L: FnOnce() -> LFut,
    LFut: Future<Output = Result<Option<R>, E>>,
    M: FnOnce(R) -> MFut,
    MFut: Future<Output = Result<T, E>>,
{
    let resource = load().await?.ok_or(AccessError::NotFound)?;
    verify_resource_access(scope, &resource, directory).await?;
    mutate(resource).await
}

/// Scope predicate to attach to a single conditional write
/// (`UPDATE ... WHERE id = $1 AND <condition>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeCondition {
    Any,
    Organization(OrganizationId),
    Sites(NonEmptySites),
}

impl ScopeCondition {
    /// `None` for an empty scope: there is no row the actor may write.
    pub fn from_scope(scope: &AuthorizedScope) -> Option<Self> {
        match scope {
            AuthorizedScope::Unrestricted => Some(ScopeCondition::Any),
            AuthorizedScope::Org { org_id } => Some(ScopeCondition::Organization(*org_id)),
            AuthorizedScope::Sites { site_ids } => {
                NonEmptySites::new(site_ids.clone()).map(ScopeCondition::Sites)
            }
        }
    }

    pub fn admits(&self, organization_id: OrganizationId, site_id: SiteId) -> bool {
        match self {
            ScopeCondition::Any => true,
            ScopeCondition::Organization(org_id) => *org_id == organization_id,
            ScopeCondition::Sites(sites) => sites.contains(&site_id),
        }
    }
}

/// Issue a write that carries its own scope predicate and check the affected rows.
///
/// Zero affected rows means the row left the actor's scope (or vanished) after
/// any earlier check, and is reported as a denial.
pub async fn with_conditional_mutation<E, F, Fut>(scope: &AuthorizedScope, mutate: F) -> Result<u64, E>
where
    E: From<AccessError>,
    F: FnOnce(ScopeCondition) -> Fut,
    Fut: Future<Output = Result<u64, E>>,
{
    let condition = ScopeCondition::from_scope(scope).ok_or(AccessError::Authorization)?;
    let affected = mutate(condition).await?;
    if affected == 0 {
        return Err(AccessError::Authorization.into());
    }
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use proptest::prelude::*;

    use super::*;
    use crate::StoreError;

    #[derive(Default)]
    struct Directory(BTreeMap<SiteId, OrganizationId>);

    impl Directory {
        fn with(sites: impl IntoIterator<Item = (SiteId, OrganizationId)>) -> Self {
            Self(sites.into_iter().collect())
        }
    }

    #[async_trait]
    impl SiteDirectory for Directory {
        async fn organization_of(&self, site_id: SiteId) -> Result<Option<OrganizationId>, StoreError> {
            Ok(self.0.get(&site_id).copied())
        }

        async fn sites_in_organization(
            &self,
            org_id: OrganizationId,
        ) -> Result<BTreeSet<SiteId>, StoreError> {
            Ok(self.0.iter().filter(|(_, o)| **o == org_id).map(|(s, _)| *s).collect())
        }
    }

    #[derive(Debug, Clone)]
    struct Record {
        org: OrganizationId,
        site: SiteId,
    }

    impl ScopedResource for Record {
        fn organization_id(&self) -> OrganizationId {
            self.org
        }

        fn site_id(&self) -> SiteId {
            self.site
        }
    }

    #[test]
    fn org_access_by_mode() {
        let org = OrganizationId::new();
        let other = OrganizationId::new();

        assert!(assert_org_access(&AuthorizedScope::Unrestricted, other).is_ok());
        assert!(assert_org_access(&AuthorizedScope::org(org), org).is_ok());
        assert_eq!(
            assert_org_access(&AuthorizedScope::org(org), other),
            Err(AccessError::Authorization)
        );
        assert_eq!(
            assert_org_access(&AuthorizedScope::sites([SiteId::new()]), org),
            Err(AccessError::Authorization)
        );
    }

    #[test]
    fn org_scope_requires_verified_site_owner() {
        let org = OrganizationId::new();
        let site = SiteId::new();
        let scope = AuthorizedScope::org(org);

        assert!(assert_site_access(&scope, site, Some(org)).is_ok());
        assert!(assert_site_access(&scope, site, Some(OrganizationId::new())).is_err());
        assert!(assert_site_access(&scope, site, None).is_err());
    }

    #[test]
    fn site_scope_is_membership() {
        let site = SiteId::new();
        let scope = AuthorizedScope::sites([site]);

        assert!(assert_site_access(&scope, site, None).is_ok());
        assert!(assert_site_access(&scope, SiteId::new(), None).is_err());
        assert!(assert_site_access(&AuthorizedScope::none(), site, None).is_err());
    }

    #[test]
    fn filter_never_yields_empty_restriction() {
        assert_eq!(filter_to_scope(&AuthorizedScope::Unrestricted, None), SiteFilter::All);
        assert_eq!(filter_to_scope(&AuthorizedScope::none(), None), SiteFilter::Nothing);

        let org = AuthorizedScope::org(OrganizationId::new());
        assert_eq!(filter_to_scope(&org, None), SiteFilter::Nothing);
        assert_eq!(filter_to_scope(&org, Some(&BTreeSet::new())), SiteFilter::Nothing);

        let site = SiteId::new();
        let filter = filter_to_scope(&org, Some(&BTreeSet::from([site])));
        assert!(filter.allows(&site));
        assert!(!filter.allows(&SiteId::new()));
    }

    #[tokio::test]
    async fn empty_scope_skips_the_query() {
        let called = Cell::new(false);
        let filter = filter_to_scope(&AuthorizedScope::none(), None);

        let rows: Result<Vec<u32>, AccessError> = list_in_scope(&filter, |_| async {
            called.set(true);
            Ok(vec![1, 2, 3])
        })
        .await;

        assert_eq!(rows, Ok(vec![]));
        assert!(!called.get());
    }

    #[tokio::test]
    async fn restricted_query_sees_only_allowed_sites() {
        let (a, b) = (SiteId::new(), SiteId::new());
        let filter = filter_to_scope(&AuthorizedScope::sites([a]), None);
        let all = vec![a, b, a];

        let rows: Result<Vec<SiteId>, AccessError> = list_in_scope(&filter, |restriction| async move {
            Ok(all.into_iter().filter(|s| restriction.allows(s)).collect())
        })
        .await;

        assert_eq!(rows, Ok(vec![a, a]));
    }

    #[tokio::test]
    async fn denied_mutation_never_runs() {
        let scope = AuthorizedScope::org(OrganizationId::new());
        let record = Record {
            org: OrganizationId::new(),
            site: SiteId::new(),
        };
        let directory = Directory::with([(record.site, record.org)]);
        let writes = Cell::new(0);

        let result: Result<(), AccessError> = with_scoped_mutation(
            &scope,
            &directory,
            || async { Ok(Some(record)) },
            |_| async {
                writes.set(writes.get() + 1);
                Ok(())
            },
        )
        .await;

        assert_eq!(result, Err(AccessError::Authorization));
        assert_eq!(writes.get(), 0);
    }

    #[tokio::test]
    async fn missing_resource_is_not_found() {
        let result: Result<(), AccessError> = with_scoped_mutation(
            &AuthorizedScope::Unrestricted,
            &Directory::default(),
            || async { Ok(None::<Record>) },
            |_| async { Ok(()) },
        )
        .await;

        assert_eq!(result, Err(AccessError::NotFound));
    }

    #[tokio::test]
    async fn org_scope_checks_the_directory_owner_not_the_record_column() {
        let (org, other) = (OrganizationId::new(), OrganizationId::new());
        let site = SiteId::new();
        let scope = AuthorizedScope::org(org);
        // The row claims the actor's organization, but its site belongs elsewhere.
        let record = Record { org, site };
        let writes = Cell::new(0);

        let result: Result<(), AccessError> = with_scoped_mutation(
            &scope,
            &Directory::with([(site, other)]),
            || async { Ok(Some(record.clone())) },
            |_| async {
                writes.set(writes.get() + 1);
                Ok(())
            },
        )
        .await;
        assert_eq!(result, Err(AccessError::Authorization));

        let unknown = verify_resource_access(&scope, &record, &Directory::default()).await;
        assert_eq!(unknown, Err(AccessError::Authorization));
        assert_eq!(writes.get(), 0);

        let verified = verify_resource_access(&scope, &record, &Directory::with([(site, org)])).await;
        assert_eq!(verified, Ok(()));
    }

    #[tokio::test]
    async fn site_scope_never_reads_the_directory() {
        let site = SiteId::new();
        let record = Record {
            org: OrganizationId::new(),
            site,
        };
        let scope = AuthorizedScope::sites([site]);

        assert_eq!(verify_resource_access(&scope, &record, &Directory::default()).await, Ok(()));
    }

    #[tokio::test]
    async fn conditional_mutation_with_zero_rows_is_denied() {
        let scope = AuthorizedScope::org(OrganizationId::new());
        let result: Result<u64, AccessError> =
            with_conditional_mutation(&scope, |_| async { Ok(0) }).await;
        assert_eq!(result, Err(AccessError::Authorization));

        let result: Result<u64, AccessError> =
            with_conditional_mutation(&scope, |_| async { Ok(1) }).await;
        assert_eq!(result, Ok(1));
    }

    #[tokio::test]
    async fn conditional_mutation_on_empty_scope_never_writes() {
        let writes = Cell::new(0);
        let result: Result<u64, AccessError> =
            with_conditional_mutation(&AuthorizedScope::none(), |_| async {
                writes.set(writes.get() + 1);
                Ok(1)
            })
            .await;

        assert_eq!(result, Err(AccessError::Authorization));
        assert_eq!(writes.get(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a restricted admin is denied every record owned by another
        /// organization, whatever the site.
        #[test]
        fn restricted_admin_never_reaches_other_orgs(seed in any::<u128>(), other_seed in any::<u128>()) {
            prop_assume!(seed != other_seed);
            let org = OrganizationId::from_uuid(uuid::Uuid::from_u128(seed));
            let other = OrganizationId::from_uuid(uuid::Uuid::from_u128(other_seed));
            let scope = AuthorizedScope::org(org);
            let record = Record { org: other, site: SiteId::new() };

            prop_assert_eq!(assert_resource_access(&scope, &record, Some(other)), Err(AccessError::Authorization));
            prop_assert_eq!(assert_resource_access(&scope, &record, Some(org)), Err(AccessError::Authorization));
            prop_assert_eq!(assert_org_access(&scope, other), Err(AccessError::Authorization));
            let condition = ScopeCondition::from_scope(&scope).unwrap();
            prop_assert!(!condition.admits(other, record.site));
        }
    }
}
