use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role identifier used for RBAC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const OWNER: Role = Role(Cow::Borrowed("owner"));
    pub const MANAGER: Role = Role(Cow::Borrowed("manager"));
    pub const GUEST: Role = Role(Cow::Borrowed("guest"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Permissions this role grants inside its shop.
    ///
    /// Unknown roles grant nothing.
    pub fn granted_permissions(&self) -> Vec<Permission> {
        match self.as_str() {
            "admin" | "owner" => vec![Permission::WILDCARD],
            "manager" => vec![Permission::MANAGE_STOCK],
            _ => Vec::new(),
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
