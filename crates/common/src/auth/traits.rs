use async_trait::async_trait;

use crate::domain::DomainResult;

/// Trait for password hashing and verification
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordService: Send + Sync {
    /// Hash a plaintext password
    fn hash_password(&self, password: &str) -> DomainResult<String>;

    /// Verify a password against a hash
    fn verify_password(&self, password: &str, hash: &str) -> DomainResult<bool>;
}

/// Process-wide cached copy of the role/permission graph.
///
/// Writers of roles, permissions or user-role links call
/// `forget_cached_permissions` before mutating so later checks rebuild from storage.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PermissionCache: Send + Sync {
    async fn forget_cached_permissions(&self) -> DomainResult<()>;
}
