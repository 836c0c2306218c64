//! Session authentication.
//!
//! Identity is established by an external provider sharing our signing
//! secret; this module only validates presented tokens and extracts the
//! `{ user_id, role }` pair the rest of the system works with.

pub mod jwt;
