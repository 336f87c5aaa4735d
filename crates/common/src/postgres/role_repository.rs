use std::collections::HashSet;

use crate::domain::{
    AssignRoleToUserInput, DomainError, DomainResult, FindOrCreateRoleInput,
    GetRolePermissionsInput, GetRolesForUserInput, ListRoleAssignmentsInput, ListRolesInput,
    Permission, Role, RoleRepository, SyncRolePermissionsInput, UserRoleAssignment,
};
use crate::postgres::{PermissionRow, PostgresClient};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{debug, instrument};

/// Role row for PostgreSQL storage
#[derive(Debug, Clone)]
pub struct RoleRow {
    pub id: String,
    pub name: String,
    pub guard_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Row> for RoleRow {
    fn from(row: &Row) -> Self {
        RoleRow {
            id: row.get("id"),
            name: row.get("name"),
            guard_name: row.get("guard_name"),
            created_at: row.get("created_at"),
        }
    }
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: row.id,
            name: row.name,
            guard_name: row.guard_name,
            created_at: Some(row.created_at),
        }
    }
}

/// PostgreSQL implementation of RoleRepository trait
#[derive(Clone)]
pub struct PostgresRoleRepository {
    client: PostgresClient,
}

impl PostgresRoleRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }

    async fn connection(&self) -> DomainResult<deadpool_postgres::Client> {
        self.client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)
    }
}

async fn select_role(
    conn: &deadpool_postgres::Client,
    name: &str,
    guard_name: &str,
) -> DomainResult<Option<Role>> {
    let row = conn
        .query_opt(
            "SELECT id, name, guard_name, created_at
             FROM roles
             WHERE name = $1 AND guard_name = $2",
            &[&name, &guard_name],
        )
        .await
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

    Ok(row.map(|row| RoleRow::from(&row).into()))
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    #[instrument(skip(self, input), fields(role = %input.name, guard = %input.guard_name))]
    async fn find_or_create_role(&self, input: FindOrCreateRoleInput) -> DomainResult<Role> {
        let conn = self.connection().await?;

        if let Some(existing) = select_role(&conn, &input.name, &input.guard_name).await? {
            return Ok(existing);
        }

        let id = xid::new().to_string();
        let now = Utc::now();

        let inserted = conn
            .execute(
                "INSERT INTO roles (id, name, guard_name, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $4)
                 ON CONFLICT (name, guard_name) DO NOTHING",
                &[&id, &input.name, &input.guard_name, &now],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(inserted = inserted == 1, "role stored");

        select_role(&conn, &input.name, &input.guard_name)
            .await?
            .ok_or_else(|| DomainError::RoleNotFound(input.name.clone()))
    }

    #[instrument(skip(self, input), fields(role_id = %input.role_id, permissions = input.permission_names.len()))]
    async fn sync_role_permissions(&self, input: SyncRolePermissionsInput) -> DomainResult<()> {
        let mut conn = self.connection().await?;

        let mut names = input.permission_names.clone();
        names.sort();
        names.dedup();

        let transaction = conn
            .transaction()
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        // Lock the role row so concurrent syncs of the same role serialize
        let role = transaction
            .query_opt(
                "SELECT id FROM roles WHERE id = $1 AND guard_name = $2 FOR UPDATE",
                &[&input.role_id, &input.guard_name],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;
        if role.is_none() {
            return Err(DomainError::RoleNotFound(input.role_id.clone()));
        }

        let rows = transaction
            .query(
                "SELECT id, name FROM permissions WHERE guard_name = $1 AND name = ANY($2)",
                &[&input.guard_name, &names],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        if rows.len() != names.len() {
            let found: HashSet<String> = rows.iter().map(|row| row.get("name")).collect();
            let missing: Vec<&str> = names
                .iter()
                .filter(|name| !found.contains(*name))
                .map(String::as_str)
                .collect();
            // Dropping the transaction rolls it back
            return Err(DomainError::PermissionNotFound(missing.join(", ")));
        }

        let permission_ids: Vec<String> = rows.iter().map(|row| row.get("id")).collect();

        let detached = transaction
            .execute(
                "DELETE FROM role_has_permissions
                 WHERE role_id = $1 AND NOT (permission_id = ANY($2))",
                &[&input.role_id, &permission_ids],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        let attached = transaction
            .execute(
                "INSERT INTO role_has_permissions (role_id, permission_id)
                 SELECT $1::text, UNNEST($2::text[])
                 ON CONFLICT (role_id, permission_id) DO NOTHING",
                &[&input.role_id, &permission_ids],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        transaction
            .commit()
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(role_id = %input.role_id, attached, detached, "role permissions synced");
        Ok(())
    }

    #[instrument(skip(self, input), fields(role_id = %input.role_id))]
    async fn get_role_permissions(
        &self,
        input: GetRolePermissionsInput,
    ) -> DomainResult<Vec<Permission>> {
        let conn = self.connection().await?;

        let rows = conn
            .query(
                "SELECT p.id, p.name, p.guard_name, p.created_at
                 FROM permissions p
                 JOIN role_has_permissions rp ON rp.permission_id = p.id
                 WHERE rp.role_id = $1
                 ORDER BY p.name",
                &[&input.role_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(rows
            .iter()
            .map(|row| PermissionRow::from(row).into())
            .collect())
    }

    #[instrument(skip(self, input), fields(guard = %input.guard_name))]
    async fn list_roles(&self, input: ListRolesInput) -> DomainResult<Vec<Role>> {
        let conn = self.connection().await?;

        let rows = conn
            .query(
                "SELECT id, name, guard_name, created_at
                 FROM roles
                 WHERE guard_name = $1
                 ORDER BY name",
                &[&input.guard_name],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(rows.iter().map(|row| RoleRow::from(row).into()).collect())
    }

    #[instrument(skip(self, input), fields(user_id = %input.user_id, role = %input.role_name))]
    async fn assign_role_to_user(&self, input: AssignRoleToUserInput) -> DomainResult<()> {
        let conn = self.connection().await?;

        let role = select_role(&conn, &input.role_name, &input.guard_name)
            .await?
            .ok_or_else(|| DomainError::RoleNotFound(input.role_name.clone()))?;

        let now = Utc::now();
        let result = conn
            .execute(
                "INSERT INTO user_has_roles (user_id, role_id, created_at)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (user_id, role_id) DO NOTHING",
                &[&input.user_id, &role.id, &now],
            )
            .await;

        match result {
            Ok(inserted) => {
                debug!(inserted = inserted == 1, "role assignment stored");
                Ok(())
            }
            Err(e) => {
                if let Some(db_err) = e.as_db_error() {
                    // PostgreSQL error code 23503 is foreign_key_violation
                    if db_err.code().code() == "23503" {
                        return Err(DomainError::UserNotFound(input.user_id.clone()));
                    }
                }
                Err(DomainError::RepositoryError(e.into()))
            }
        }
    }

    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    async fn get_roles_for_user(&self, input: GetRolesForUserInput) -> DomainResult<Vec<Role>> {
        let conn = self.connection().await?;

        let rows = conn
            .query(
                "SELECT r.id, r.name, r.guard_name, r.created_at
                 FROM roles r
                 JOIN user_has_roles ur ON ur.role_id = r.id
                 WHERE ur.user_id = $1
                 ORDER BY r.name",
                &[&input.user_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(rows.iter().map(|row| RoleRow::from(row).into()).collect())
    }

    #[instrument(skip(self, input), fields(guard = %input.guard_name))]
    async fn list_role_assignments(
        &self,
        input: ListRoleAssignmentsInput,
    ) -> DomainResult<Vec<UserRoleAssignment>> {
        let conn = self.connection().await?;

        let rows = conn
            .query(
                "SELECT ur.user_id, r.id AS role_id, r.name AS role_name, r.guard_name
                 FROM user_has_roles ur
                 JOIN roles r ON r.id = ur.role_id
                 WHERE r.guard_name = $1
                 ORDER BY ur.user_id, r.name",
                &[&input.guard_name],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(rows
            .iter()
            .map(|row| UserRoleAssignment {
                user_id: row.get("user_id"),
                role_id: row.get("role_id"),
                role_name: row.get("role_name"),
                guard_name: row.get("guard_name"),
            })
            .collect())
    }
}
