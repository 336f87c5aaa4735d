use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::{
    AssignRoleToUserInput, DomainError, DomainResult, FindOrCreatePermissionInput,
    FindOrCreateRoleInput, GetRolePermissionsInput, GetRolesForUserInput, GetUserByEmailInput,
    ListPermissionsInput, ListRoleAssignmentsInput, ListRolesInput, Permission,
    PermissionRepository, RegisterUserInputWithId, Role, RoleRepository, SyncRolePermissionsInput,
    User, UserRepository, UserRoleAssignment,
};

#[derive(Default)]
struct StoreState {
    permissions: Vec<Permission>,
    roles: Vec<Role>,
    users: Vec<User>,
    // role id -> permission ids
    role_permissions: HashMap<String, BTreeSet<String>>,
    // user id -> role ids
    user_roles: HashMap<String, BTreeSet<String>>,
    mutations: usize,
}

impl StoreState {
    fn permission_by_key(&self, name: &str, guard_name: &str) -> Option<&Permission> {
        self.permissions
            .iter()
            .find(|p| p.name == name && p.guard_name == guard_name)
    }

    fn role_by_key(&self, name: &str, guard_name: &str) -> Option<&Role> {
        self.roles
            .iter()
            .find(|r| r.name == name && r.guard_name == guard_name)
    }

    fn role_by_id(&self, id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }

    fn sorted_permissions(&self, ids: &BTreeSet<String>) -> Vec<Permission> {
        let mut permissions: Vec<Permission> = self
            .permissions
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        permissions
    }
}

/// In-memory implementation of the permission, role and user repositories.
///
/// Mirrors the PostgreSQL constraints: unique (name, guard) for permissions and
/// roles, unique email for users, set semantics for both link tables.
#[derive(Clone, Default)]
pub struct InMemoryAuthorizationStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryAuthorizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn permission_count(&self) -> usize {
        self.state.read().await.permissions.len()
    }

    pub async fn role_count(&self) -> usize {
        self.state.read().await.roles.len()
    }

    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }

    /// Number of state changes applied so far. Lookups and no-op writes do not count.
    pub async fn mutation_count(&self) -> usize {
        self.state.read().await.mutations
    }
}

#[async_trait]
impl PermissionRepository for InMemoryAuthorizationStore {
    async fn find_or_create_permission(
        &self,
        input: FindOrCreatePermissionInput,
    ) -> DomainResult<Permission> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if let Some(existing) = state.permission_by_key(&input.name, &input.guard_name) {
            return Ok(existing.clone());
        }

        let permission = Permission {
            id: xid::new().to_string(),
            name: input.name,
            guard_name: input.guard_name,
            created_at: Some(Utc::now()),
        };
        state.permissions.push(permission.clone());
        state.mutations += 1;
        Ok(permission)
    }

    async fn list_permissions(&self, input: ListPermissionsInput) -> DomainResult<Vec<Permission>> {
        let state = self.state.read().await;
        let mut permissions: Vec<Permission> = state
            .permissions
            .iter()
            .filter(|p| p.guard_name == input.guard_name)
            .cloned()
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }
}

#[async_trait]
impl RoleRepository for InMemoryAuthorizationStore {
    async fn find_or_create_role(&self, input: FindOrCreateRoleInput) -> DomainResult<Role> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if let Some(existing) = state.role_by_key(&input.name, &input.guard_name) {
            return Ok(existing.clone());
        }

        let role = Role {
            id: xid::new().to_string(),
            name: input.name,
            guard_name: input.guard_name,
            created_at: Some(Utc::now()),
        };
        state.roles.push(role.clone());
        state.mutations += 1;
        Ok(role)
    }

    async fn sync_role_permissions(&self, input: SyncRolePermissionsInput) -> DomainResult<()> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        match state.role_by_id(&input.role_id) {
            Some(role) if role.guard_name == input.guard_name => {}
            _ => return Err(DomainError::RoleNotFound(input.role_id.clone())),
        }

        let mut wanted = BTreeSet::new();
        let mut missing = Vec::new();
        for name in &input.permission_names {
            match state.permission_by_key(name, &input.guard_name) {
                Some(permission) => {
                    wanted.insert(permission.id.clone());
                }
                None if !missing.contains(name) => missing.push(name.clone()),
                None => {}
            }
        }
        if !missing.is_empty() {
            missing.sort();
            return Err(DomainError::PermissionNotFound(missing.join(", ")));
        }

        let current = state.role_permissions.entry(input.role_id).or_default();
        if *current != wanted {
            *current = wanted;
            state.mutations += 1;
        }
        Ok(())
    }

    async fn get_role_permissions(
        &self,
        input: GetRolePermissionsInput,
    ) -> DomainResult<Vec<Permission>> {
        let state = self.state.read().await;
        Ok(state
            .role_permissions
            .get(&input.role_id)
            .map(|ids| state.sorted_permissions(ids))
            .unwrap_or_default())
    }

    async fn list_roles(&self, input: ListRolesInput) -> DomainResult<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state
            .roles
            .iter()
            .filter(|r| r.guard_name == input.guard_name)
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn assign_role_to_user(&self, input: AssignRoleToUserInput) -> DomainResult<()> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let role_id = state
            .role_by_key(&input.role_name, &input.guard_name)
            .map(|role| role.id.clone())
            .ok_or_else(|| DomainError::RoleNotFound(input.role_name.clone()))?;

        if !state.users.iter().any(|u| u.id == input.user_id) {
            return Err(DomainError::UserNotFound(input.user_id));
        }

        if state
            .user_roles
            .entry(input.user_id)
            .or_default()
            .insert(role_id)
        {
            state.mutations += 1;
        }
        Ok(())
    }

    async fn get_roles_for_user(&self, input: GetRolesForUserInput) -> DomainResult<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state
            .user_roles
            .get(&input.user_id)
            .map(|ids| {
                state
                    .roles
                    .iter()
                    .filter(|r| ids.contains(&r.id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn list_role_assignments(
        &self,
        input: ListRoleAssignmentsInput,
    ) -> DomainResult<Vec<UserRoleAssignment>> {
        let state = self.state.read().await;
        let mut assignments = Vec::new();
        for (user_id, role_ids) in &state.user_roles {
            for role_id in role_ids {
                if let Some(role) = state.role_by_id(role_id) {
                    if role.guard_name == input.guard_name {
                        assignments.push(UserRoleAssignment {
                            user_id: user_id.clone(),
                            role_id: role.id.clone(),
                            role_name: role.name.clone(),
                            guard_name: role.guard_name.clone(),
                        });
                    }
                }
            }
        }
        assignments.sort_by(|a, b| (&a.user_id, &a.role_name).cmp(&(&b.user_id, &b.role_name)));
        Ok(assignments)
    }
}

#[async_trait]
impl UserRepository for InMemoryAuthorizationStore {
    async fn register_user(&self, input: RegisterUserInputWithId) -> DomainResult<User> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        if state.users.iter().any(|u| u.email == input.email) {
            return Err(DomainError::UserAlreadyExists(input.email));
        }

        let now = Utc::now();
        let user = User {
            id: input.id,
            email: input.email,
            password_hash: input.password_hash,
            name: input.name,
            phone: input.phone,
            email_verified_at: input.email_verified_at,
            created_at: Some(now),
            updated_at: Some(now),
        };
        state.users.push(user.clone());
        state.mutations += 1;
        Ok(user)
    }

    async fn get_user_by_email(&self, input: GetUserByEmailInput) -> DomainResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.email == input.email).cloned())
    }
}
