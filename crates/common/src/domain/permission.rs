use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A named capability scoped to a guard, e.g. ("create sales", "web")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub id: String,
    pub name: String,
    pub guard_name: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Natural key of a permission; the repository generates the id on insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOrCreatePermissionInput {
    pub name: String,
    pub guard_name: String,
}

/// Input for listing the permissions of one guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPermissionsInput {
    pub guard_name: String,
}

/// Repository trait for permission storage operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Return the permission with this (name, guard_name), inserting it first if absent.
    /// Never writes when the permission already exists.
    async fn find_or_create_permission(
        &self,
        input: FindOrCreatePermissionInput,
    ) -> DomainResult<Permission>;

    /// List all permissions of a guard, ordered by name
    async fn list_permissions(&self, input: ListPermissionsInput) -> DomainResult<Vec<Permission>>;
}
