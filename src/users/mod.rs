//! Users, roles and the per-request authorization context.

pub mod admin;
pub mod schema;

pub use admin::{Admin, PermissionEntry};
pub use schema::{authenticate, create_user, initialize_user_tables, ADMIN_RANK, SUPER_RANK, USER_RANK};
