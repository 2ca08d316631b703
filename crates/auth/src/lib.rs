//! `stagecraft-auth` — actor identity, RBAC and tenant scoping.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod actor;
pub mod authorize;
pub mod permissions;
pub mod roles;

pub use actor::{ActorContext, IdentityHeaders, request_id_or_new, resolve_actor};
pub use authorize::{
    ScopeTarget, assert_any_permission, assert_permission, assert_tenant_scope, has_permission,
    role_permissions,
};
pub use permissions::Permission;
pub use roles::Role;
