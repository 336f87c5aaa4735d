use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Permission not found: {0}")]
    PermissionNotFound(String),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Password hashing error: {0}")]
    PasswordHashingError(String),

    #[error("Invalid seed catalog: {0}")]
    InvalidCatalog(String),

    #[error("Authorization error: {0}")]
    AuthorizationError(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
