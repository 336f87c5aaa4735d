use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use common::auth::{PasswordService, PermissionCache};
use common::domain::{
    AssignRoleToUserInput, DomainError, DomainResult, FindOrCreatePermissionInput,
    FindOrCreateRoleInput, GetRolePermissionsInput, GetUserByEmailInput, PermissionRepository,
    RegisterUserInputWithId, Role, RoleRepository, SyncRolePermissionsInput, User,
    UserRepository,
};
use tracing::{debug, info, instrument};

use crate::domain::{DefaultUser, SeedCatalog, SeedSummary, SeededRole, SeededUser};

/// Policy lives here, not in `PasswordService`, which only rejects empty input
const MIN_PASSWORD_LENGTH: usize = 8;

/// Brings storage in line with a [`SeedCatalog`].
///
/// Every step is an upsert or a full replace, so a run can be repeated any
/// number of times and a failed run is fixed by running again.
pub struct AuthorizationSeeder {
    permission_repository: Arc<dyn PermissionRepository>,
    role_repository: Arc<dyn RoleRepository>,
    user_repository: Arc<dyn UserRepository>,
    permission_cache: Arc<dyn PermissionCache>,
    password_service: Arc<dyn PasswordService>,
    catalog: SeedCatalog,
    default_password: String,
}

impl AuthorizationSeeder {
    pub fn new(
        permission_repository: Arc<dyn PermissionRepository>,
        role_repository: Arc<dyn RoleRepository>,
        user_repository: Arc<dyn UserRepository>,
        permission_cache: Arc<dyn PermissionCache>,
        password_service: Arc<dyn PasswordService>,
        catalog: SeedCatalog,
        default_password: impl Into<String>,
    ) -> Self {
        Self {
            permission_repository,
            role_repository,
            user_repository,
            permission_cache,
            password_service,
            catalog,
            default_password: default_password.into(),
        }
    }

    /// Ensure every permission, role, role grant and default account exists.
    ///
    /// # Errors
    /// An invalid catalog or default password fails before anything is written.
    /// Any storage error aborts the run where it happened.
    #[instrument(skip(self), fields(guard = %self.catalog.guard_name))]
    pub async fn run(&self) -> DomainResult<SeedSummary> {
        self.catalog.validate()?;
        if self.default_password.len() < MIN_PASSWORD_LENGTH {
            return Err(DomainError::InvalidPassword(format!(
                "Default password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        // Nothing may be written while a stale graph is still cached
        self.permission_cache.forget_cached_permissions().await?;

        let total_permissions = self.seed_permissions().await?;
        info!(total_permissions, "permissions ensured");

        let roles = self.seed_roles().await?;
        info!(roles = roles.len(), "roles synchronized");

        let users = self.seed_users().await?;
        info!(users = users.len(), "default users ensured");

        Ok(SeedSummary {
            guard_name: self.catalog.guard_name.clone(),
            total_permissions,
            roles,
            users,
        })
    }

    /// Returns the number of distinct permission records touched
    async fn seed_permissions(&self) -> DomainResult<usize> {
        let mut ids = HashSet::new();

        // Shared names resolve to the record created by their first group
        for name in self.catalog.raw_permissions() {
            let permission = self
                .permission_repository
                .find_or_create_permission(FindOrCreatePermissionInput {
                    name: name.to_string(),
                    guard_name: self.catalog.guard_name.clone(),
                })
                .await?;
            debug!(permission = %permission.name, id = %permission.id, "permission ensured");
            ids.insert(permission.id);
        }

        Ok(ids.len())
    }

    async fn seed_roles(&self) -> DomainResult<Vec<SeededRole>> {
        let mut roles: Vec<Role> = Vec::with_capacity(self.catalog.roles.len());
        for definition in &self.catalog.roles {
            let role = self
                .role_repository
                .find_or_create_role(FindOrCreateRoleInput {
                    name: definition.name.clone(),
                    guard_name: self.catalog.guard_name.clone(),
                })
                .await?;
            debug!(role = %role.name, id = %role.id, "role ensured");
            roles.push(role);
        }

        let mut seeded = Vec::with_capacity(roles.len());
        for (definition, role) in self.catalog.roles.iter().zip(roles) {
            let permission_names = self.catalog.role_permissions(definition);
            debug!(
                role = %role.name,
                permissions = permission_names.len(),
                "replacing role permissions"
            );

            self.role_repository
                .sync_role_permissions(SyncRolePermissionsInput {
                    role_id: role.id.clone(),
                    guard_name: self.catalog.guard_name.clone(),
                    permission_names,
                })
                .await?;

            let granted = self
                .role_repository
                .get_role_permissions(GetRolePermissionsInput {
                    role_id: role.id.clone(),
                })
                .await?;

            seeded.push(SeededRole {
                name: role.name,
                description: definition.description.clone(),
                permission_count: granted.len(),
            });
        }

        Ok(seeded)
    }

    async fn seed_users(&self) -> DomainResult<Vec<SeededUser>> {
        let mut seeded = Vec::with_capacity(self.catalog.users.len());

        for default_user in &self.catalog.users {
            let (user, created) = self.find_or_create_user(default_user).await?;

            self.role_repository
                .assign_role_to_user(AssignRoleToUserInput {
                    user_id: user.id.clone(),
                    role_name: default_user.role.clone(),
                    guard_name: self.catalog.guard_name.clone(),
                })
                .await?;
            debug!(user_id = %user.id, role = %default_user.role, "role assigned");

            seeded.push(SeededUser {
                email: user.email,
                role: default_user.role.clone(),
                created,
            });
        }

        Ok(seeded)
    }

    /// Existing accounts win: nothing about them is updated
    #[instrument(skip(self, default_user), fields(email = %default_user.email))]
    async fn find_or_create_user(&self, default_user: &DefaultUser) -> DomainResult<(User, bool)> {
        if let Some(existing) = self.lookup_user(&default_user.email).await? {
            debug!(user_id = %existing.id, "user already present");
            return Ok((existing, false));
        }

        let password_hash = self.password_service.hash_password(&self.default_password)?;
        let input = RegisterUserInputWithId {
            id: xid::new().to_string(),
            email: default_user.email.clone(),
            password_hash,
            name: default_user.name.clone(),
            phone: default_user.phone.clone(),
            email_verified_at: Some(Utc::now()),
        };

        match self.user_repository.register_user(input).await {
            Ok(user) => {
                debug!(user_id = %user.id, "user created");
                Ok((user, true))
            }
            Err(DomainError::UserAlreadyExists(_)) => {
                // Another writer inserted the same email between lookup and insert
                debug!("user created concurrently, reusing it");
                let user = self
                    .lookup_user(&default_user.email)
                    .await?
                    .ok_or_else(|| DomainError::UserNotFound(default_user.email.clone()))?;
                Ok((user, false))
            }
            Err(e) => Err(e),
        }
    }

    async fn lookup_user(&self, email: &str) -> DomainResult<Option<User>> {
        self.user_repository
            .get_user_by_email(GetUserByEmailInput {
                email: email.to_string(),
            })
            .await
    }
}
