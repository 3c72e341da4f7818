//! PocketBase backend access

pub mod admin;
pub mod client;
pub mod models;

pub use admin::create_shared_admin_session;
pub use client::{Credential, PocketBaseClient};
pub use models::{ShiftRecord, UserRecord};
