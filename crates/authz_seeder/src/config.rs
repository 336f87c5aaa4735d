use common::postgres::PostgresConfig;
use common::telemetry::TelemetryConfig;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

/// Where the seed writes to
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    /// Throwaway in-process store, useful to preview the report
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// JSON log lines; compact text when false
    #[serde(default = "default_log_json")]
    pub log_json: bool,

    // OpenTelemetry configuration
    #[serde(default)]
    pub otel_enabled: bool,

    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,

    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,

    // PostgreSQL configuration
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    #[serde(default = "default_postgres_max_pool_size")]
    pub postgres_max_pool_size: usize,

    /// Apply goose migrations before seeding
    #[serde(default = "default_postgres_run_migrations")]
    pub postgres_run_migrations: bool,

    #[serde(default = "default_postgres_migrations_dir")]
    pub postgres_migrations_dir: String,

    #[serde(default = "default_postgres_goose_binary_path")]
    pub postgres_goose_binary_path: String,

    /// Alternative seed catalog (TOML); the built-in one is used when unset
    #[serde(default)]
    pub catalog_path: Option<String>,

    /// Password given to default accounts when they are first created
    #[serde(default = "default_password")]
    pub default_password: String,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("SEEDER"))
            .build()?
            .try_deserialize()
    }

    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig {
            host: self.postgres_host.clone(),
            port: self.postgres_port,
            database: self.postgres_database.clone(),
            username: self.postgres_username.clone(),
            password: self.postgres_password.clone(),
            max_pool_size: self.postgres_max_pool_size,
            run_migrations: self.postgres_run_migrations,
            migrations_dir: self.postgres_migrations_dir.clone(),
            goose_binary_path: self.postgres_goose_binary_path.clone(),
        }
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.otel_service_name.clone(),
            otel_endpoint: self.otel_endpoint.clone(),
            otel_enabled: self.otel_enabled,
            log_level: self.log_level.clone(),
            json_logs: self.log_json,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_json() -> bool {
    true
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "authz-seed".to_string()
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Postgres
}

fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "pos".to_string()
}

fn default_postgres_username() -> String {
    "pos".to_string()
}

fn default_postgres_password() -> String {
    "pos".to_string()
}

fn default_postgres_max_pool_size() -> usize {
    5
}

fn default_postgres_run_migrations() -> bool {
    true
}

fn default_postgres_migrations_dir() -> String {
    "migrations/postgres".to_string()
}

fn default_postgres_goose_binary_path() -> String {
    "goose".to_string()
}

fn default_password() -> String {
    "password".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 5] = [
        "SEEDER_LOG_LEVEL",
        "SEEDER_STORAGE_BACKEND",
        "SEEDER_POSTGRES_PORT",
        "SEEDER_POSTGRES_RUN_MIGRATIONS",
        "SEEDER_CATALOG_PATH",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(config.postgres_port, 5432);
        assert!(config.postgres_run_migrations);
        assert!(config.catalog_path.is_none());
        assert_eq!(config.default_password, "password");
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        std::env::set_var("SEEDER_LOG_LEVEL", "debug");
        std::env::set_var("SEEDER_STORAGE_BACKEND", "memory");
        std::env::set_var("SEEDER_POSTGRES_PORT", "6543");
        std::env::set_var("SEEDER_POSTGRES_RUN_MIGRATIONS", "false");
        std::env::set_var("SEEDER_CATALOG_PATH", "/etc/pos/authorization.toml");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.postgres_port, 6543);
        assert!(!config.postgres_run_migrations);
        assert_eq!(
            config.catalog_path.as_deref(),
            Some("/etc/pos/authorization.toml")
        );

        clear_env();
    }

    #[test]
    fn test_derived_configs() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        let config = ServiceConfig::from_env().unwrap();

        let postgres = config.postgres_config();
        assert_eq!(postgres.host, "localhost");
        assert_eq!(postgres.max_pool_size, 5);
        assert_eq!(postgres.migrations_dir, "migrations/postgres");

        let telemetry = config.telemetry_config();
        assert_eq!(telemetry.service_name, "authz-seed");
        assert!(!telemetry.otel_enabled);
        assert!(telemetry.json_logs);
    }
}
