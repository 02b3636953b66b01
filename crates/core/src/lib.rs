//! `siteops-core`: shared domain primitives for the site-operations workspace.
//!
//! This crate contains **pure domain** types (no infrastructure concerns):
//! identifiers, the domain error model, and small value objects.

pub mod error;
pub mod id;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::{OrganizationId, PartnerCompanyId, RecordId, SiteId, UserId};
pub use value_object::DateRange;
