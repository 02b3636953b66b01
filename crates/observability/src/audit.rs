//! Access-decision audit events.
//!
//! Events go to the `siteops::audit` target so they can be routed separately
//! (`RUST_LOG=siteops::audit=info`). They may name the organization, site or
//! record involved; nothing here is ever returned to the actor.

use core::fmt::Display;

pub const AUDIT_TARGET: &str = "siteops::audit";

/// Record a denied access attempt.
pub fn denied(user_id: &dyn Display, role: &str, operation: &str, resource: &dyn Display, reason: &str) {
    tracing::warn!(
        target: AUDIT_TARGET,
        user_id = %user_id,
        role,
        operation,
        resource = %resource,
        reason,
        "access denied"
    );
}

/// Record a completed scoped mutation.
pub fn mutated(user_id: &dyn Display, operation: &str, resource: &dyn Display) {
    tracing::info!(
        target: AUDIT_TARGET,
        user_id = %user_id,
        operation,
        resource = %resource,
        "scoped mutation applied"
    );
}
