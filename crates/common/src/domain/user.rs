use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// User domain entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Internal input with generated ID and hashed password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUserInputWithId {
    pub id: String,
    pub email: String,
    pub password_hash: String, // Already hashed
    pub name: String,
    pub phone: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
}

/// Input for getting a user by email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetUserByEmailInput {
    pub email: String,
}

/// Repository trait for user storage operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. A taken email yields UserAlreadyExists.
    async fn register_user(&self, input: RegisterUserInputWithId) -> DomainResult<User>;

    /// Get a user by email
    async fn get_user_by_email(&self, input: GetUserByEmailInput) -> DomainResult<Option<User>>;
}
