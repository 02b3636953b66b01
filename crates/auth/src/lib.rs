//! `siteops-auth`: tenant/site access-scoping policy.
//!
//! Given an authenticated actor, compute the organizations/sites the actor may
//! touch ([`AuthorizedScope`]) and gate every read/write through that scope with
//! fail-closed semantics.
//!
//! This crate is intentionally decoupled from HTTP and storage: backing state is
//! reached only through the [`MappingSource`], [`SiteDirectory`] and
//! [`ProfileStore`] seams.

pub mod actor;
pub mod claims;
pub mod directory;
pub mod error;
pub mod explain;
pub mod guard;
pub mod jwt;
pub mod mapping;
pub mod resolver;
pub mod scope;

pub use actor::{ActorContext, ActorProfile, ActorResolver, ActorRole, ProfileActorResolver, ProfileStore};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use directory::SiteDirectory;
pub use error::{AccessError, AccessErrorKind, StoreError};
pub use explain::{ScopeExplanation, explain_scope};
pub use guard::{
    NonEmptySites, ScopeCondition, ScopedResource, SiteFilter, SiteRestriction, assert_org_access,
    assert_resource_access, assert_site_access, filter_to_scope, list_in_scope,
    resolve_site_filter, verify_resource_access, with_conditional_mutation, with_scoped_mutation,
};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use mapping::{ContractStatus, LegacyPartnerSiteMapping, MappingSource, PartnerSiteMapping};
pub use resolver::{FallbackPolicy, FallbackTrigger, ScopeResolution, ScopeRule, ScopeSources, SiteSetResolver};
pub use scope::{AuthorizedScope, ScopeMode};
