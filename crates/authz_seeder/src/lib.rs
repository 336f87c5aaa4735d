//! Idempotent seeding of the role/permission graph and default back-office
//! accounts.

pub mod domain;
