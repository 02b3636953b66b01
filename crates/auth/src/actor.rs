//! Actor identity: the immutable, per-request description of who is acting.

use core::str::FromStr;
use std::convert::Infallible;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use siteops_core::{OrganizationId, PartnerCompanyId, SiteId, UserId};

use crate::{AccessError, SessionClaims, StoreError};

/// Actor role.
///
/// The set is closed; profile rows carrying any other text are kept as
/// [`ActorRole::Unrecognized`], which the resolver authorizes for nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActorRole {
    SystemAdmin,
    Admin,
    SiteManager,
    Worker,
    CustomerManager,
    Partner,
    Unrecognized(String),
}

impl ActorRole {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "system_admin" => ActorRole::SystemAdmin,
            "admin" => ActorRole::Admin,
            "site_manager" => ActorRole::SiteManager,
            "worker" => ActorRole::Worker,
            "customer_manager" => ActorRole::CustomerManager,
            "partner" => ActorRole::Partner,
            other => ActorRole::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActorRole::SystemAdmin => "system_admin",
            ActorRole::Admin => "admin",
            ActorRole::SiteManager => "site_manager",
            ActorRole::Worker => "worker",
            ActorRole::CustomerManager => "customer_manager",
            ActorRole::Partner => "partner",
            ActorRole::Unrecognized(raw) => raw,
        }
    }

    /// Partner/customer users, scoped through the partner→site mappings.
    pub fn is_external(&self) -> bool {
        matches!(self, ActorRole::Partner | ActorRole::CustomerManager)
    }
}

impl FromStr for ActorRole {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for ActorRole {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ActorRole> for String {
    fn from(value: ActorRole) -> Self {
        value.as_str().to_string()
    }
}

impl core::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw profile row, as stored. Nullable columns are `Option`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorProfile {
    pub user_id: UserId,
    pub email: String,
    pub role: String,
    pub organization_id: Option<OrganizationId>,
    pub is_restricted: Option<bool>,
    pub restricted_org_id: Option<OrganizationId>,
    pub site_id: Option<SiteId>,
    pub partner_company_id: Option<PartnerCompanyId>,
}

/// A fully resolved actor for scoping decisions.
///
/// Built fresh for every request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorContext {
    pub user_id: UserId,
    pub email: String,
    pub role: ActorRole,
    /// Home organization.
    pub organization_id: Option<OrganizationId>,
    /// Home-office staff confined to exactly one organization.
    pub is_restricted: bool,
    /// Authoritative when `is_restricted`; `None` otherwise.
    pub restricted_org_id: Option<OrganizationId>,
    /// Own assigned site (site managers, workers).
    pub site_id: Option<SiteId>,
    /// Only ever set for partner/customer-manager actors.
    pub partner_company_id: Option<PartnerCompanyId>,
}

impl ActorContext {
    /// Normalize a profile row into the context shape every consumer relies on.
    pub fn from_profile(profile: ActorProfile) -> Self {
        let role = ActorRole::parse(&profile.role);
        let is_restricted = profile.is_restricted.unwrap_or(false);
        let restricted_org_id = if is_restricted {
            profile.restricted_org_id
        } else {
            None
        };
        let partner_company_id = if role.is_external() {
            profile.partner_company_id
        } else {
            None
        };

        Self {
            user_id: profile.user_id,
            email: profile.email,
            role,
            organization_id: profile.organization_id,
            is_restricted,
            restricted_org_id,
            site_id: profile.site_id,
            partner_company_id,
        }
    }
}

/// Read access to profile rows.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load_profile(&self, user_id: UserId) -> Result<Option<ActorProfile>, StoreError>;
}

#[async_trait]
impl<S> ProfileStore for std::sync::Arc<S>
where
    S: ProfileStore + ?Sized,
{
    async fn load_profile(&self, user_id: UserId) -> Result<Option<ActorProfile>, StoreError> {
        (**self).load_profile(user_id).await
    }
}

/// Authentication collaborator: turns a (possibly absent) session into an actor.
#[async_trait]
pub trait ActorResolver: Send + Sync {
    async fn resolve_actor(&self, session: Option<&SessionClaims>) -> Result<ActorContext, AccessError>;
}

/// Standard [`ActorResolver`]: session subject → profile row → [`ActorContext`].
#[derive(Debug, Clone)]
pub struct ProfileActorResolver<P> {
    profiles: P,
}

impl<P> ProfileActorResolver<P> {
    pub fn new(profiles: P) -> Self {
        Self { profiles }
    }
}

#[async_trait]
impl<P> ActorResolver for ProfileActorResolver<P>
where
    P: ProfileStore,
{
    async fn resolve_actor(&self, session: Option<&SessionClaims>) -> Result<ActorContext, AccessError> {
        let session = session.ok_or(AccessError::Authentication)?;

        let profile = self
            .profiles
            .load_profile(session.sub)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %session.sub, "session subject has no profile row");
                AccessError::NotFound
            })?;

        Ok(ActorContext::from_profile(profile))
    }
}
