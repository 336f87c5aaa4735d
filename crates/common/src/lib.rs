pub mod auth;
pub mod domain;
pub mod memory;
pub mod postgres;
pub mod telemetry;
pub mod validation;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use auth::{MockPasswordService, MockPermissionCache};
#[cfg(any(test, feature = "testing"))]
pub use domain::{MockPermissionRepository, MockRoleRepository, MockUserRepository};
