use crate::domain::permission::Permission;
use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A named bundle of permissions scoped to a guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub guard_name: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// A user holding a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRoleAssignment {
    pub user_id: String,
    pub role_id: String,
    pub role_name: String,
    pub guard_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOrCreateRoleInput {
    pub name: String,
    pub guard_name: String,
}

/// Replace the permission set of a role with exactly `permission_names`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRolePermissionsInput {
    pub role_id: String,
    pub guard_name: String,
    pub permission_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRolePermissionsInput {
    pub role_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRolesInput {
    pub guard_name: String,
}

/// Grant a role (looked up by name within the guard) to a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignRoleToUserInput {
    pub user_id: String,
    pub role_name: String,
    pub guard_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRolesForUserInput {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRoleAssignmentsInput {
    pub guard_name: String,
}

/// Repository trait for roles, role-permission links and user-role links
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Return the role with this (name, guard_name), inserting it first if absent
    async fn find_or_create_role(&self, input: FindOrCreateRoleInput) -> DomainResult<Role>;

    /// Atomically replace the role's permissions.
    /// Fails with PermissionNotFound, leaving the role untouched, if any name is unknown
    /// for the guard. Duplicate names are ignored.
    async fn sync_role_permissions(&self, input: SyncRolePermissionsInput) -> DomainResult<()>;

    /// Permissions currently linked to a role, ordered by name
    async fn get_role_permissions(
        &self,
        input: GetRolePermissionsInput,
    ) -> DomainResult<Vec<Permission>>;

    /// All roles of a guard, ordered by name
    async fn list_roles(&self, input: ListRolesInput) -> DomainResult<Vec<Role>>;

    /// Add a role to a user. Fails with RoleNotFound if the role does not exist;
    /// a role the user already holds is left as is.
    async fn assign_role_to_user(&self, input: AssignRoleToUserInput) -> DomainResult<()>;

    /// Roles held by a user, ordered by name
    async fn get_roles_for_user(&self, input: GetRolesForUserInput) -> DomainResult<Vec<Role>>;

    /// Every user-role link of a guard
    async fn list_role_assignments(
        &self,
        input: ListRoleAssignmentsInput,
    ) -> DomainResult<Vec<UserRoleAssignment>>;
}
