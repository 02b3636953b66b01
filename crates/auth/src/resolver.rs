//! Site-set resolution: `ActorContext × MappingSource → AuthorizedScope`.
//!
//! Role-keyed and total: every role lands on exactly one rule, and any rule
//! that cannot be evaluated denies instead of widening.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use siteops_core::{PartnerCompanyId, SiteId};

use crate::{AccessError, ActorContext, ActorRole, AuthorizedScope, MappingSource};

/// When the legacy relation may be consulted, given that the fallback is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackTrigger {
    /// Only when the primary read failed.
    OnError,
    /// Only when the primary read succeeded with no active rows.
    OnEmpty,
    /// Either of the above.
    #[default]
    OnEmptyOrError,
}

/// Legacy-fallback policy. Disabled unless explicitly enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FallbackPolicy {
    pub legacy_fallback_enabled: bool,
    pub trigger: FallbackTrigger,
}

impl FallbackPolicy {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn enabled(trigger: FallbackTrigger) -> Self {
        Self {
            legacy_fallback_enabled: true,
            trigger,
        }
    }

    fn consults_legacy(&self, primary_failed: bool, primary_empty: bool) -> bool {
        if !self.legacy_fallback_enabled {
            return false;
        }
        match self.trigger {
            FallbackTrigger::OnError => primary_failed,
            FallbackTrigger::OnEmpty => !primary_failed && primary_empty,
            FallbackTrigger::OnEmptyOrError => primary_failed || primary_empty,
        }
    }
}

/// Which rule produced a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeRule {
    SystemAdmin,
    RestrictedAdmin,
    UnrestrictedAdmin,
    AssignedSite,
    PartnerMapping,
    NoGrant,
}

/// Which mapping sources were read while resolving a partner scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScopeSources {
    pub primary_consulted: bool,
    pub primary_failed: bool,
    pub legacy_consulted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeResolution {
    pub scope: AuthorizedScope,
    pub rule: ScopeRule,
    pub sources: ScopeSources,
}

impl ScopeResolution {
    fn direct(scope: AuthorizedScope, rule: ScopeRule) -> Self {
        Self {
            scope,
            rule,
            sources: ScopeSources::default(),
        }
    }
}

/// Computes the [`AuthorizedScope`] for an actor.
///
/// Holds no state between calls: every resolution re-reads the mapping source.
#[derive(Debug, Clone)]
pub struct SiteSetResolver<M> {
    mappings: M,
    policy: FallbackPolicy,
}

impl<M> SiteSetResolver<M> {
    pub fn new(mappings: M, policy: FallbackPolicy) -> Self {
        Self { mappings, policy }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }
}

impl<M> SiteSetResolver<M>
where
    M: MappingSource,
{
    pub async fn resolve(&self, actor: &ActorContext) -> Result<AuthorizedScope, AccessError> {
        self.resolve_detailed(actor).await.map(|r| r.scope)
    }

    /// Resolve and report which rule and which mapping sources were involved.
    pub async fn resolve_detailed(&self, actor: &ActorContext) -> Result<ScopeResolution, AccessError> {
        let resolution = match &actor.role {
            ActorRole::SystemAdmin => {
                ScopeResolution::direct(AuthorizedScope::Unrestricted, ScopeRule::SystemAdmin)
            }
            ActorRole::Admin if actor.is_restricted => match actor.restricted_org_id {
                Some(org_id) => {
                    ScopeResolution::direct(AuthorizedScope::org(org_id), ScopeRule::RestrictedAdmin)
                }
                None => {
                    tracing::error!(
                        user_id = %actor.user_id,
                        "restricted admin has no restricted organization; denying"
                    );
                    return Err(AccessError::configuration(format!(
                        "restricted admin {} has no restricted_org_id",
                        actor.user_id
                    )));
                }
            },
            ActorRole::Admin => {
                ScopeResolution::direct(AuthorizedScope::Unrestricted, ScopeRule::UnrestrictedAdmin)
            }
            ActorRole::SiteManager => ScopeResolution::direct(
                AuthorizedScope::sites(actor.site_id),
                ScopeRule::AssignedSite,
            ),
            ActorRole::Partner | ActorRole::CustomerManager => match actor.partner_company_id {
                Some(partner) => {
                    let (site_ids, sources) = self.partner_sites(partner).await?;
                    ScopeResolution {
                        scope: AuthorizedScope::Sites { site_ids },
                        rule: ScopeRule::PartnerMapping,
                        sources,
                    }
                }
                None => ScopeResolution::direct(AuthorizedScope::none(), ScopeRule::NoGrant),
            },
            // Worker exceptions (own records only) belong to the individual handler.
            ActorRole::Worker | ActorRole::Unrecognized(_) => {
                ScopeResolution::direct(AuthorizedScope::none(), ScopeRule::NoGrant)
            }
        };

        tracing::debug!(
            user_id = %actor.user_id,
            role = %actor.role,
            mode = ?resolution.scope.mode(),
            rule = ?resolution.rule,
            site_count = resolution.scope.site_ids().map(|s| s.len()),
            "resolved authorized scope"
        );

        Ok(resolution)
    }

    /// Primary mappings first; the legacy relation only when the policy says so.
    /// Sources only ever add sites to the union.
    async fn partner_sites(
        &self,
        partner: PartnerCompanyId,
    ) -> Result<(BTreeSet<SiteId>, ScopeSources), AccessError> {
        let mut sources = ScopeSources {
            primary_consulted: true,
            ..ScopeSources::default()
        };
        let mut site_ids = BTreeSet::new();

        let primary_error = match self.mappings.primary_mappings(partner).await {
            Ok(rows) => {
                site_ids.extend(
                    rows.iter()
                        // rows for another company never contribute
                        .filter(|m| m.partner_company_id == partner && m.contributes())
                        .map(|m| m.site_id),
                );
                None
            }
            Err(e) => {
                tracing::warn!(partner_company_id = %partner, error = %e, "primary site mapping read failed");
                sources.primary_failed = true;
                Some(e)
            }
        };

        if self
            .policy
            .consults_legacy(primary_error.is_some(), site_ids.is_empty())
        {
            tracing::warn!(
                partner_company_id = %partner,
                primary_failed = sources.primary_failed,
                "consulting legacy partner site mapping"
            );
            sources.legacy_consulted = true;

            let rows = self.mappings.legacy_mappings(partner).await.map_err(|e| {
                tracing::warn!(partner_company_id = %partner, error = %e, "legacy site mapping read failed");
                AccessError::from(e)
            })?;
            site_ids.extend(
                rows.iter()
                    .filter(|m| m.partner_company_id == partner && m.contributes())
                    .map(|m| m.site_id),
            );
        } else if let Some(e) = primary_error {
            return Err(e.into());
        }

        Ok((site_ids, sources))
    }
}
