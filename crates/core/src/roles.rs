//! Well-known role name constants.
//!
//! These must match the seed data in the `users` migration.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_OPERATOR: &str = "operator";
pub const ROLE_VIEWER: &str = "viewer";
