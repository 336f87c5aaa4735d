use std::collections::HashSet;
use std::path::Path;

use common::domain::{DomainError, DomainResult};
use common::validation::validate_struct;
use config::{Config, File, FileFormat};
use garde::Validate;
use serde::{Deserialize, Serialize};

/// Catalog compiled into the binary; used unless a path override is configured
pub const BUILTIN_CATALOG: &str = include_str!("../../seed/authorization.toml");

/// Named bundle of permissions. The name only exists for role grants to refer to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PermissionGroup {
    pub name: String,
    pub permissions: Vec<String>,
}

/// A role and the grants that make up its full permission set
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoleDefinition {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Grant every permission in the catalog
    #[serde(default)]
    pub all_permissions: bool,

    /// Whole groups granted by name
    #[serde(default)]
    pub groups: Vec<String>,

    /// Individual permissions on top of the groups
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Account ensured by the seed; attributes apply on creation only
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Validate)]
pub struct DefaultUser {
    #[garde(email)]
    pub email: String,

    #[garde(length(min = 1))]
    pub name: String,

    #[serde(default)]
    #[garde(skip)]
    pub phone: Option<String>,

    #[garde(length(min = 1))]
    pub role: String,
}

/// Declarative description of everything the seed ensures exists
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SeedCatalog {
    pub guard_name: String,

    #[serde(default)]
    pub groups: Vec<PermissionGroup>,

    #[serde(default)]
    pub roles: Vec<RoleDefinition>,

    #[serde(default)]
    pub users: Vec<DefaultUser>,
}

impl SeedCatalog {
    pub fn builtin() -> DomainResult<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn from_toml_str(source: &str) -> DomainResult<Self> {
        Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| DomainError::InvalidCatalog(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(true))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| DomainError::InvalidCatalog(format!("{}: {}", path.display(), e)))
    }

    /// Loads the override when one is given, the built-in catalog otherwise
    pub fn load(path: Option<&str>) -> DomainResult<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    /// Every group's permissions concatenated in catalog order, duplicates included
    pub fn raw_permissions(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|group| group.permissions.iter().map(String::as_str))
    }

    /// Distinct permission names in first-seen order
    pub fn permission_names(&self) -> Vec<String> {
        dedup(self.raw_permissions())
    }

    pub fn group(&self, name: &str) -> Option<&PermissionGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn role(&self, name: &str) -> Option<&RoleDefinition> {
        self.roles.iter().find(|role| role.name == name)
    }

    /// The complete, duplicate-free permission set a role must end up with.
    ///
    /// Unknown group names are skipped here; [`SeedCatalog::validate`] rejects
    /// them before a run starts.
    pub fn role_permissions(&self, role: &RoleDefinition) -> Vec<String> {
        let mut granted: Vec<&str> = Vec::new();

        if role.all_permissions {
            granted.extend(self.raw_permissions());
        }
        for group_name in &role.groups {
            if let Some(group) = self.group(group_name) {
                granted.extend(group.permissions.iter().map(String::as_str));
            }
        }
        granted.extend(role.permissions.iter().map(String::as_str));

        dedup(granted)
    }

    /// Structural and referential checks. Nothing may be written for a catalog
    /// that fails here.
    pub fn validate(&self) -> DomainResult<()> {
        if self.guard_name.trim().is_empty() {
            return Err(invalid("guard_name must not be empty"));
        }

        let mut group_names = HashSet::new();
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(invalid("permission group with an empty name"));
            }
            if !group_names.insert(group.name.as_str()) {
                return Err(invalid(format!("duplicate permission group '{}'", group.name)));
            }
            if let Some(blank) = group.permissions.iter().find(|p| p.trim().is_empty()) {
                return Err(invalid(format!(
                    "group '{}' lists an empty permission name '{}'",
                    group.name, blank
                )));
            }
        }

        let known_permissions: HashSet<&str> = self.raw_permissions().collect();

        let mut role_names = HashSet::new();
        for role in &self.roles {
            if role.name.trim().is_empty() {
                return Err(invalid("role with an empty name"));
            }
            if !role_names.insert(role.name.as_str()) {
                return Err(invalid(format!("duplicate role '{}'", role.name)));
            }
            if let Some(missing) = role.groups.iter().find(|g| self.group(g).is_none()) {
                return Err(invalid(format!(
                    "role '{}' grants unknown group '{}'",
                    role.name, missing
                )));
            }
            if let Some(missing) = role
                .permissions
                .iter()
                .find(|p| !known_permissions.contains(p.as_str()))
            {
                return Err(invalid(format!(
                    "role '{}' grants unknown permission '{}'",
                    role.name, missing
                )));
            }
        }

        let mut emails = HashSet::new();
        for user in &self.users {
            validate_struct(user).map_err(|e| match e {
                DomainError::ValidationError(message) => {
                    invalid(format!("user '{}': {}", user.email, message))
                }
                other => other,
            })?;
            // Exact match, as enforced by the stores
            if !emails.insert(user.email.as_str()) {
                return Err(invalid(format!("duplicate user '{}'", user.email)));
            }
            if !role_names.contains(user.role.as_str()) {
                return Err(invalid(format!(
                    "user '{}' references unknown role '{}'",
                    user.email, user.role
                )));
            }
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> DomainError {
    DomainError::InvalidCatalog(message.into())
}

fn dedup<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}
