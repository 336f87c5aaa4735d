use crate::domain::{
    DomainError, DomainResult, GetUserByEmailInput, RegisterUserInputWithId, User, UserRepository,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use tracing::{debug, instrument};

/// User row for PostgreSQL storage
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Row> for UserRow {
    fn from(row: &Row) -> Self {
        UserRow {
            id: row.get("id"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            name: row.get("name"),
            phone: row.get("phone"),
            email_verified_at: row.get("email_verified_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            phone: row.phone,
            email_verified_at: row.email_verified_at,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

/// PostgreSQL implementation of UserRepository trait
#[derive(Clone)]
pub struct PostgresUserRepository {
    client: PostgresClient,
}

impl PostgresUserRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, input), fields(user_id = %input.id, email = %input.email))]
    async fn register_user(&self, input: RegisterUserInputWithId) -> DomainResult<User> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        // Timestamps come from the column defaults
        let row = conn
            .query_one(
                "INSERT INTO users (id, email, password_hash, name, phone, email_verified_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING id, email, password_hash, name, phone, email_verified_at, created_at, updated_at",
                &[
                    &input.id,
                    &input.email,
                    &input.password_hash,
                    &input.name,
                    &input.phone,
                    &input.email_verified_at,
                ],
            )
            .await
            .map_err(|e| {
                // 23505 is unique_violation, here on users_email_unique
                let taken = e
                    .as_db_error()
                    .is_some_and(|db_err| db_err.code().code() == "23505");
                if taken {
                    DomainError::UserAlreadyExists(input.email.clone())
                } else {
                    DomainError::RepositoryError(e.into())
                }
            })?;

        debug!(user_id = %input.id, "user registered in database");
        Ok(UserRow::from(&row).into())
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn get_user_by_email(&self, input: GetUserByEmailInput) -> DomainResult<Option<User>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        debug!(email = %input.email, "fetching user by email from database");

        let row = conn
            .query_opt(
                "SELECT id, email, password_hash, name, phone, email_verified_at, created_at, updated_at
                 FROM users
                 WHERE email = $1",
                &[&input.email],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.map(|row| UserRow::from(&row).into()))
    }
}
