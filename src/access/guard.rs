//! Authorization checks ahead of the handler.

use async_trait::async_trait;
use tracing::debug;

use crate::pipeline::{Rejection, RequestContext, Stage};

use super::permission::Permission;
use super::principal::Principal;

/// Check a principal's mask against the required permissions.
pub fn authorize(principal: &Principal, required: Permission) -> Result<(), Rejection> {
    if principal.can(required) {
        Ok(())
    } else {
        debug!(
            identity = %principal.identity(),
            required = ?required,
            held = ?principal.permissions(),
            "Authorization denied"
        );
        Err(Rejection::Forbidden)
    }
}

/// Pipeline stage rejecting requests whose principal lacks the required mask.
///
/// Runs before the handler and before any quota is consumed.
pub struct PermissionStage {
    required: Permission,
}

impl PermissionStage {
    /// Require the given permission mask.
    pub fn new(required: Permission) -> Self {
        Self { required }
    }

    /// Require the administer bit.
    pub fn admin() -> Self {
        Self::new(Permission::ADMINISTER)
    }

    pub fn required(&self) -> Permission {
        self.required
    }
}

#[async_trait]
impl Stage for PermissionStage {
    async fn before(&self, ctx: &mut RequestContext) -> Result<(), Rejection> {
        authorize(ctx.principal(), self.required)
    }
}
