//! Transparent, debuggable account of how an actor's scope was derived.
//!
//! Internal audit/debug surface only: it names organizations and sites, so it
//! must never be attached to a denial shown to the actor.

use serde::Serialize;

use siteops_core::{OrganizationId, UserId};

use crate::{ActorContext, ScopeMode, ScopeResolution, ScopeRule, ScopeSources};

#[derive(Debug, Clone, Serialize)]
pub struct ScopeExplanation {
    pub user_id: UserId,
    pub role: String,
    pub mode: ScopeMode,
    pub rule: ScopeRule,

    /// Human-readable reason for the resolved scope.
    pub reason: String,

    pub org_id: Option<OrganizationId>,
    pub site_count: Option<usize>,
    pub sources: ScopeSources,

    /// Set when the scope is empty; what would grant access.
    pub suggestions: Vec<String>,
}

/// Explain a resolved scope.
pub fn explain_scope(actor: &ActorContext, resolution: &ScopeResolution) -> ScopeExplanation {
    let scope = &resolution.scope;
    let site_count = scope.site_ids().map(|s| s.len());

    let reason = match resolution.rule {
        ScopeRule::SystemAdmin => "System administrators may access every organization".to_string(),
        ScopeRule::UnrestrictedAdmin => {
            "Administrator is not restricted to an organization".to_string()
        }
        ScopeRule::RestrictedAdmin => {
            "Restricted administrator is confined to a single organization".to_string()
        }
        ScopeRule::AssignedSite => match site_count {
            Some(0) | None => "Site manager has no assigned site".to_string(),
            Some(_) => "Site manager may access their assigned site".to_string(),
        },
        ScopeRule::PartnerMapping => {
            let via = if resolution.sources.legacy_consulted {
                "primary and legacy partner site mappings"
            } else {
                "primary partner site mappings"
            };
            format!(
                "Partner company is mapped to {} site(s) via {via}",
                site_count.unwrap_or(0)
            )
        }
        ScopeRule::NoGrant => format!("Role '{}' is not granted any sites", actor.role),
    };

    let mut suggestions = Vec::new();
    if scope.is_empty() {
        match resolution.rule {
            ScopeRule::AssignedSite => {
                suggestions.push("Assign the site manager to a site".to_string())
            }
            ScopeRule::PartnerMapping => {
                suggestions.push("Add an active partner site mapping for the company".to_string());
                if !resolution.sources.legacy_consulted {
                    suggestions.push(
                        "Legacy mappings were not consulted (fallback disabled or not triggered)"
                            .to_string(),
                    );
                }
            }
            ScopeRule::NoGrant if actor.role.is_external() => {
                suggestions.push("Link the user to a partner company".to_string())
            }
            _ => {}
        }
    }

    ScopeExplanation {
        user_id: actor.user_id,
        role: actor.role.to_string(),
        mode: scope.mode(),
        rule: resolution.rule,
        reason,
        org_id: scope.org_id(),
        site_count,
        sources: resolution.sources,
        suggestions,
    }
}
