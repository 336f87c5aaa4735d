mod client;
mod config;
mod permission_repository;
mod role_repository;
mod user_repository;

pub use client::*;
pub use config::*;
pub use permission_repository::*;
pub use role_repository::*;
pub use user_repository::*;
