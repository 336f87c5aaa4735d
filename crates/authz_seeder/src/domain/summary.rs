use std::fmt;

/// Role state after a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRole {
    pub name: String,
    pub description: String,
    pub permission_count: usize,
}

/// Default account state after a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededUser {
    pub email: String,
    pub role: String,
    /// False when the account already existed and was left untouched
    pub created: bool,
}

/// What a seed run ensured, printed once the run completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub guard_name: String,
    pub total_permissions: usize,
    pub roles: Vec<SeededRole>,
    pub users: Vec<SeededUser>,
}

impl SeedSummary {
    pub fn role(&self, name: &str) -> Option<&SeededRole> {
        self.roles.iter().find(|role| role.name == name)
    }

    pub fn user(&self, email: &str) -> Option<&SeededUser> {
        self.users.iter().find(|user| user.email == email)
    }

    pub fn created_users(&self) -> usize {
        self.users.iter().filter(|user| user.created).count()
    }
}

const RULE: &str = "==================================================";

impl fmt::Display for SeedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Roles and permissions seeded (guard: {})", self.guard_name)?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "Total permissions: {}", self.total_permissions)?;
        writeln!(f)?;

        writeln!(f, "Roles:")?;
        for role in &self.roles {
            if role.description.is_empty() {
                writeln!(f, "  - {}: {} permissions", role.name, role.permission_count)?;
            } else {
                writeln!(
                    f,
                    "  - {} ({}): {} permissions",
                    role.name, role.description, role.permission_count
                )?;
            }
        }
        writeln!(f)?;

        writeln!(f, "Default users:")?;
        for user in &self.users {
            let state = if user.created {
                "created"
            } else {
                "already present"
            };
            writeln!(f, "  - {} [{}] {}", user.email, user.role, state)?;
        }
        write!(f, "{}", RULE)
    }
}
