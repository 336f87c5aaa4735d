use std::sync::Arc;

use async_trait::async_trait;
use casbin::{CoreApi, DefaultModel, Enforcer, MemoryAdapter, MgmtApi, RbacApi};
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, instrument};

use crate::auth::{PermissionCache, RBAC_MODEL};
use crate::domain::{
    DomainError, DomainResult, GetRolePermissionsInput, ListRoleAssignmentsInput, ListRolesInput,
    RoleRepository,
};

/// Cached role/permission graph for one guard, backed by a Casbin enforcer.
///
/// The enforcer is built from the role repository on first use and kept until
/// `forget_cached_permissions` is called; the next check then rebuilds it.
pub struct CasbinPermissionRegistrar {
    role_repository: Arc<dyn RoleRepository>,
    guard_name: String,
    enforcer: RwLock<Option<Enforcer>>,
}

impl CasbinPermissionRegistrar {
    pub fn new(role_repository: Arc<dyn RoleRepository>, guard_name: impl Into<String>) -> Self {
        Self {
            role_repository,
            guard_name: guard_name.into(),
            enforcer: RwLock::new(None),
        }
    }

    /// Check whether a user holds a role granting `permission` in this guard
    #[instrument(skip(self), fields(guard = %self.guard_name))]
    pub async fn has_permission(&self, user_id: &str, permission: &str) -> DomainResult<bool> {
        let graph = self.loaded().await?;
        let enforcer = graph.as_ref().ok_or_else(|| {
            DomainError::AuthorizationError("permission graph not loaded".to_string())
        })?;

        enforcer
            .enforce((user_id, self.guard_name.as_str(), permission))
            .map_err(|e| DomainError::AuthorizationError(format!("Enforcement error: {}", e)))
    }

    /// Role names a user holds in this guard, as seen by the cached graph
    #[instrument(skip(self), fields(guard = %self.guard_name))]
    pub async fn get_roles_for_user(&self, user_id: &str) -> DomainResult<Vec<String>> {
        // The role manager may update its own lookup cache, so take exclusive access
        let mut slot = self.enforcer.write().await;
        if slot.is_none() {
            *slot = Some(self.build_enforcer().await?);
        }

        let mut roles = slot
            .as_mut()
            .map(|enforcer| enforcer.get_roles_for_user(user_id, Some(self.guard_name.as_str())))
            .unwrap_or_default();
        roles.sort();
        Ok(roles)
    }

    /// Whether a graph is currently cached
    pub async fn is_loaded(&self) -> bool {
        self.enforcer.read().await.is_some()
    }

    /// Read access to the graph, building it first if the cache is cold
    async fn loaded(&self) -> DomainResult<RwLockReadGuard<'_, Option<Enforcer>>> {
        {
            let graph = self.enforcer.read().await;
            if graph.is_some() {
                return Ok(graph);
            }
        }

        let mut slot = self.enforcer.write().await;
        if slot.is_none() {
            *slot = Some(self.build_enforcer().await?);
        }
        Ok(slot.downgrade())
    }

    async fn build_enforcer(&self) -> DomainResult<Enforcer> {
        let model = DefaultModel::from_str(RBAC_MODEL).await.map_err(|e| {
            DomainError::AuthorizationError(format!("Failed to load model: {}", e))
        })?;

        let mut enforcer = Enforcer::new(model, MemoryAdapter::default())
            .await
            .map_err(|e| {
                DomainError::AuthorizationError(format!("Failed to create enforcer: {}", e))
            })?;

        let roles = self
            .role_repository
            .list_roles(ListRolesInput {
                guard_name: self.guard_name.clone(),
            })
            .await?;

        let mut policy_count = 0usize;
        for role in &roles {
            let permissions = self
                .role_repository
                .get_role_permissions(GetRolePermissionsInput {
                    role_id: role.id.clone(),
                })
                .await?;

            for permission in permissions {
                enforcer
                    .add_policy(vec![
                        role.name.clone(),
                        self.guard_name.clone(),
                        permission.name,
                    ])
                    .await
                    .map_err(|e| {
                        DomainError::AuthorizationError(format!("Failed to add policy: {}", e))
                    })?;
                policy_count += 1;
            }
        }

        let assignments = self
            .role_repository
            .list_role_assignments(ListRoleAssignmentsInput {
                guard_name: self.guard_name.clone(),
            })
            .await?;

        for assignment in &assignments {
            enforcer
                .add_grouping_policy(vec![
                    assignment.user_id.clone(),
                    assignment.role_name.clone(),
                    self.guard_name.clone(),
                ])
                .await
                .map_err(|e| {
                    DomainError::AuthorizationError(format!("Failed to assign role: {}", e))
                })?;
        }

        debug!(
            roles = roles.len(),
            policies = policy_count,
            assignments = assignments.len(),
            "permission graph loaded"
        );

        Ok(enforcer)
    }
}

#[async_trait]
impl PermissionCache for CasbinPermissionRegistrar {
    #[instrument(skip(self), fields(guard = %self.guard_name))]
    async fn forget_cached_permissions(&self) -> DomainResult<()> {
        let mut slot = self.enforcer.write().await;
        if slot.take().is_some() {
            debug!("cached permission graph dropped");
        }
        Ok(())
    }
}
