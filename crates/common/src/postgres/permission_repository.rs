use crate::domain::{
    DomainError, DomainResult, FindOrCreatePermissionInput, ListPermissionsInput, Permission,
    PermissionRepository,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{debug, instrument};

/// Permission row for PostgreSQL storage
#[derive(Debug, Clone)]
pub struct PermissionRow {
    pub id: String,
    pub name: String,
    pub guard_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Row> for PermissionRow {
    fn from(row: &Row) -> Self {
        PermissionRow {
            id: row.get("id"),
            name: row.get("name"),
            guard_name: row.get("guard_name"),
            created_at: row.get("created_at"),
        }
    }
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Permission {
            id: row.id,
            name: row.name,
            guard_name: row.guard_name,
            created_at: Some(row.created_at),
        }
    }
}

/// PostgreSQL implementation of PermissionRepository trait
#[derive(Clone)]
pub struct PostgresPermissionRepository {
    client: PostgresClient,
}

impl PostgresPermissionRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

async fn select_permission(
    conn: &deadpool_postgres::Client,
    name: &str,
    guard_name: &str,
) -> DomainResult<Option<Permission>> {
    let row = conn
        .query_opt(
            "SELECT id, name, guard_name, created_at
             FROM permissions
             WHERE name = $1 AND guard_name = $2",
            &[&name, &guard_name],
        )
        .await
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

    Ok(row.map(|row| PermissionRow::from(&row).into()))
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    #[instrument(skip(self, input), fields(permission = %input.name, guard = %input.guard_name))]
    async fn find_or_create_permission(
        &self,
        input: FindOrCreatePermissionInput,
    ) -> DomainResult<Permission> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        if let Some(existing) = select_permission(&conn, &input.name, &input.guard_name).await? {
            return Ok(existing);
        }

        let id = xid::new().to_string();
        let now = Utc::now();

        // A concurrent seeder may insert the same key between the lookup and here
        let inserted = conn
            .execute(
                "INSERT INTO permissions (id, name, guard_name, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $4)
                 ON CONFLICT (name, guard_name) DO NOTHING",
                &[&id, &input.name, &input.guard_name, &now],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(inserted = inserted == 1, "permission stored");

        select_permission(&conn, &input.name, &input.guard_name)
            .await?
            .ok_or_else(|| DomainError::PermissionNotFound(input.name.clone()))
    }

    #[instrument(skip(self, input), fields(guard = %input.guard_name))]
    async fn list_permissions(&self, input: ListPermissionsInput) -> DomainResult<Vec<Permission>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT id, name, guard_name, created_at
                 FROM permissions
                 WHERE guard_name = $1
                 ORDER BY name",
                &[&input.guard_name],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(rows
            .iter()
            .map(|row| PermissionRow::from(row).into())
            .collect())
    }
}
