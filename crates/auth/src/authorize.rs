use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_core::ShopId;

use crate::{Permission, PrincipalId, Role, ShopMembership};

/// A fully resolved principal for authorization decisions.
///
/// Construction is decoupled from storage and transport: callers derive the
/// membership from their session/claims and hand it to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub active_shop_id: ShopId,
    pub membership: ShopMembership,
}

impl Principal {
    /// Principal acting in `shop_id` with the given roles and no explicit permissions.
    pub fn with_roles(principal_id: PrincipalId, shop_id: ShopId, roles: Vec<Role>) -> Self {
        Self {
            principal_id,
            active_shop_id: shop_id,
            membership: ShopMembership {
                shop_id,
                roles,
                permissions: Vec::new(),
            },
        }
    }

    /// Anonymous shopper: no roles, no permissions.
    pub fn guest(shop_id: ShopId) -> Self {
        Self::with_roles(PrincipalId::new(), shop_id, vec![Role::GUEST])
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("shop mismatch")]
    ShopMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal for an operation on `shop_id`.
///
/// Only explicit membership permissions are consulted; role expansion is the
/// job of an [`Authorizer`].
///
/// - No IO
/// - No panics
pub fn authorize(
    principal: &Principal,
    shop_id: ShopId,
    required: &Permission,
) -> Result<(), AuthzError> {
    if principal.active_shop_id != principal.membership.shop_id
        || principal.active_shop_id != shop_id
    {
        return Err(AuthzError::ShopMismatch);
    }

    let perms: HashSet<&str> = principal
        .membership
        .permissions
        .iter()
        .map(|p| p.as_str())
        .collect();

    if perms.contains("*") || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Yes/no gate consulted by the engine before any privileged mutation.
pub trait Authorizer: Send + Sync {
    fn authorize(
        &self,
        principal: &Principal,
        shop_id: ShopId,
        required: &Permission,
    ) -> Result<(), AuthzError>;

    /// Convenience wrapper for callers that only need the boolean answer.
    fn is_allowed(&self, principal: &Principal, shop_id: ShopId, required: &Permission) -> bool {
        self.authorize(principal, shop_id, required).is_ok()
    }
}

impl<A> Authorizer for Arc<A>
where
    A: Authorizer + ?Sized,
{
    fn authorize(
        &self,
        principal: &Principal,
        shop_id: ShopId,
        required: &Permission,
    ) -> Result<(), AuthzError> {
        (**self).authorize(principal, shop_id, required)
    }
}

/// Expands roles into permissions (see [`Role::granted_permissions`]) and then
/// applies [`authorize`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn authorize(
        &self,
        principal: &Principal,
        shop_id: ShopId,
        required: &Permission,
    ) -> Result<(), AuthzError> {
        let mut effective = principal.clone();
        for role in &principal.membership.roles {
            effective.membership.permissions.extend(role.granted_permissions());
        }

        let decision = authorize(&effective, shop_id, required);
        if let Err(err) = &decision {
            tracing::debug!(
                principal_id = %principal.principal_id,
                shop_id = %shop_id,
                permission = %required,
                error = %err,
                "authorization denied"
            );
        }
        decision
    }
}

/// Grants everything. For trusted in-process callers and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _: &Principal, _: ShopId, _: &Permission) -> Result<(), AuthzError> {
        Ok(())
    }
}

/// Denies everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

impl Authorizer for DenyAll {
    fn authorize(&self, _: &Principal, _: ShopId, required: &Permission) -> Result<(), AuthzError> {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
