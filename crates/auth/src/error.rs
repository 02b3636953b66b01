//! Access-control error taxonomy.
//!
//! Every variant is terminal for the current operation. The `Display` output is
//! for internal logs; actors only ever see [`AccessError::public_message`].

use serde::Serialize;
use thiserror::Error;

use siteops_core::DomainError;

use crate::ActorRole;

/// Failure reading backing state (profile rows, mapping rows, site directory).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("storage error: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No valid actor could be resolved.
    #[error("authentication required")]
    Authentication,

    /// Actor resolved but not permitted to touch the target organization/site/resource.
    #[error("access denied")]
    Authorization,

    /// Policy invariant violated (e.g. restricted admin without an organization).
    /// Always presented to the actor as a denial.
    #[error("access policy misconfigured: {0}")]
    Configuration(String),

    /// Malformed scoping input from the caller.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found")]
    NotFound,

    /// Backing state needed for the decision could not be read. Denies.
    #[error("authorization state unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessErrorKind {
    Authentication,
    Authorization,
    Configuration,
    Validation,
    NotFound,
    Unavailable,
}

impl AccessErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            AccessErrorKind::Authentication => "authentication_required",
            AccessErrorKind::Authorization | AccessErrorKind::Configuration => "forbidden",
            AccessErrorKind::Validation => "validation_error",
            AccessErrorKind::NotFound => "not_found",
            AccessErrorKind::Unavailable => "unavailable",
        }
    }
}

impl AccessError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn kind(&self) -> AccessErrorKind {
        match self {
            AccessError::Authentication => AccessErrorKind::Authentication,
            AccessError::Authorization => AccessErrorKind::Authorization,
            AccessError::Configuration(_) => AccessErrorKind::Configuration,
            AccessError::Validation(_) => AccessErrorKind::Validation,
            AccessError::NotFound => AccessErrorKind::NotFound,
            AccessError::Unavailable(_) => AccessErrorKind::Unavailable,
        }
    }

    /// True for every outcome that must be presented to the actor as a plain denial.
    pub fn is_denial(&self) -> bool {
        matches!(self, AccessError::Authorization | AccessError::Configuration(_))
    }

    /// Actor-facing message.
    ///
    /// Denials are generic and role-appropriate: they never name the owning
    /// organization or site, nor say which check failed.
    pub fn public_message(&self, role: Option<&ActorRole>) -> String {
        match self {
            AccessError::Authentication => "Sign in required.".to_string(),
            AccessError::Authorization | AccessError::Configuration(_) => {
                denial_message(role).to_string()
            }
            AccessError::Validation(msg) => format!("Invalid request: {msg}"),
            AccessError::NotFound => "Not found.".to_string(),
            AccessError::Unavailable(_) => {
                "Access could not be verified right now. Please try again later.".to_string()
            }
        }
    }
}

fn denial_message(role: Option<&ActorRole>) -> &'static str {
    match role {
        Some(role) if role.is_external() => "This record is not available to your company.",
        Some(ActorRole::SiteManager | ActorRole::Worker) => {
            "This record is not available for your site."
        }
        _ => "You do not have permission to access this record.",
    }
}

impl From<StoreError> for AccessError {
    fn from(value: StoreError) -> Self {
        AccessError::Unavailable(value.0)
    }
}

impl From<DomainError> for AccessError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => AccessError::Validation(msg),
            DomainError::NotFound => AccessError::NotFound,
        }
    }
}
