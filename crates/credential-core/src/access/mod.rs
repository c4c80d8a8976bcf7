//! Sharing and authorization: principals, roles, scopes and the policy
//! applied to every credential operation

mod policy;
mod principal;
mod sharing;

pub use policy::{
    authorize, authorize_create, authorize_share, authorize_transfer, resolve_role,
    resolve_role_in_store, Operation,
};
pub use principal::{GlobalRole, Principal, ProjectMembership, ProjectRole, Scope};
pub use sharing::{owner_of, SharingRecord, SharingRole, SharingScope};
