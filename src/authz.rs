//! Authorization gate: role, permission, and ownership decisions.
//!
//! Pure decision functions over verified claims. The only side effect
//! is structured denial logging (principal id, resource, reason) for
//! security auditing. Ownership lookups are delegated to an injected
//! store; admins always pass the ownership check.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AuthError;
use crate::token::Claims;

/// Closed role set. Claim changes require a new session, so a role is
/// immutable for the lifetime of the tokens that carry it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Freelancer,
    Admin,
}

impl Role {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Freelancer => "freelancer",
            Self::Admin => "admin",
        }
    }

    pub(crate) fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "client" => Some(Self::Client),
            "freelancer" => Some(Self::Freelancer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Permission set derived deterministically from the role.
    #[must_use]
    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Self::Client => &[
                Permission::ViewProjects,
                Permission::CreateProjects,
                Permission::HireFreelancers,
            ],
            Self::Freelancer => &[Permission::ViewProjects, Permission::SubmitProposals],
            Self::Admin => &[
                Permission::ViewProjects,
                Permission::CreateProjects,
                Permission::HireFreelancers,
                Permission::SubmitProposals,
                Permission::ManageUsers,
                Permission::ModerateContent,
            ],
        }
    }
}

/// Fine-grained operations a principal may perform.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewProjects,
    CreateProjects,
    HireFreelancers,
    SubmitProposals,
    ManageUsers,
    ModerateContent,
}

/// Ownership lookup delegated to the external resource store.
#[async_trait]
pub trait OwnershipStore: Send + Sync {
    async fn is_owner(
        &self,
        resource_type: &str,
        resource_id: &str,
        user_id: Uuid,
    ) -> anyhow::Result<bool>;
}

/// Reject unless the verified role is in the allowed set.
pub fn require_role(claims: &Claims, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&claims.role) {
        return Ok(());
    }
    warn!(
        user_id = %claims.sub,
        role = claims.role.as_str(),
        "authorization denied: insufficient role"
    );
    Err(AuthError::InsufficientRole)
}

/// Reject unless the derived permission set intersects the required set.
pub fn require_permission(claims: &Claims, required: &[Permission]) -> Result<(), AuthError> {
    let granted = claims.role.permissions();
    if required.iter().any(|permission| granted.contains(permission)) {
        return Ok(());
    }
    warn!(
        user_id = %claims.sub,
        role = claims.role.as_str(),
        required = ?required,
        "authorization denied: insufficient permission"
    );
    Err(AuthError::InsufficientPermission)
}

/// Reject unless the principal is admin or owns the resource.
pub async fn require_ownership(
    claims: &Claims,
    resource_type: &str,
    resource_id: &str,
    ownership: &dyn OwnershipStore,
) -> Result<(), AuthError> {
    if claims.role == Role::Admin {
        return Ok(());
    }
    let owned = ownership
        .is_owner(resource_type, resource_id, claims.sub)
        .await
        .map_err(AuthError::Internal)?;
    if owned {
        return Ok(());
    }
    warn!(
        user_id = %claims.sub,
        resource_type,
        resource_id,
        "authorization denied: ownership violation"
    );
    Err(AuthError::OwnershipViolation)
}
