//! `stockroom-auth` — pure authorization boundary.
//!
//! Answers one question for the inventory engine: may this principal manage
//! stock in this shop? Decoupled from HTTP, sessions and storage.

pub mod authorize;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{AllowAll, Authorizer, AuthzError, DenyAll, Principal, RoleAuthorizer, authorize};
pub use permissions::Permission;
pub use principal::{PrincipalId, ShopMembership};
pub use roles::Role;
