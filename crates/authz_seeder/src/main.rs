mod config;

use std::sync::Arc;

use authz_seeder::domain::{AuthorizationSeeder, SeedCatalog, SeedSummary};
use common::auth::{Argon2PasswordService, CasbinPermissionRegistrar};
use common::domain::{PermissionRepository, RoleRepository, UserRepository};
use common::memory::InMemoryAuthorizationStore;
use common::postgres::{
    PostgresClient, PostgresConfig, PostgresPermissionRepository, PostgresRoleRepository,
    PostgresUserRepository,
};
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryProviders};
use crate::config::{ServiceConfig, StorageBackend};
use goose::MigrationRunner;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let telemetry_providers: Option<TelemetryProviders> =
        match init_telemetry(&config.telemetry_config()) {
            Ok(providers) => providers,
            Err(e) => {
                eprintln!("Failed to initialize telemetry: {}", e);
                std::process::exit(1);
            }
        };

    info!(
        storage_backend = ?config.storage_backend,
        otel_enabled = config.otel_enabled,
        "Starting authorization seed"
    );

    let exit_code = match seed(&config).await {
        Ok(summary) => {
            info!(
                total_permissions = summary.total_permissions,
                created_users = summary.created_users(),
                "Authorization seed complete"
            );
            println!("{}", summary);
            0
        }
        Err(e) => {
            error!("Authorization seed failed: {:#}", e);
            1
        }
    };

    // Flush pending traces and logs before the process ends
    shutdown_telemetry(telemetry_providers);
    std::process::exit(exit_code);
}

struct Repositories {
    permission: Arc<dyn PermissionRepository>,
    role: Arc<dyn RoleRepository>,
    user: Arc<dyn UserRepository>,
}

async fn seed(config: &ServiceConfig) -> anyhow::Result<SeedSummary> {
    let catalog = SeedCatalog::load(config.catalog_path.as_deref())?;
    debug!(
        groups = catalog.groups.len(),
        roles = catalog.roles.len(),
        users = catalog.users.len(),
        "seed catalog loaded"
    );

    let repositories = initialize_repositories(config).await?;
    let permission_cache = Arc::new(CasbinPermissionRegistrar::new(
        repositories.role.clone(),
        catalog.guard_name.clone(),
    ));

    let seeder = AuthorizationSeeder::new(
        repositories.permission,
        repositories.role,
        repositories.user,
        permission_cache,
        Arc::new(Argon2PasswordService::new()),
        catalog,
        config.default_password.clone(),
    );

    Ok(seeder.run().await?)
}

async fn initialize_repositories(config: &ServiceConfig) -> anyhow::Result<Repositories> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            info!("Initializing PostgreSQL...");
            let postgres_config = config.postgres_config();
            if postgres_config.run_migrations {
                run_postgres_migrations(&postgres_config).await?;
            }

            let client = PostgresClient::from_config(&postgres_config)?;
            client.ping().await?;

            Ok(Repositories {
                permission: Arc::new(PostgresPermissionRepository::new(client.clone())),
                role: Arc::new(PostgresRoleRepository::new(client.clone())),
                user: Arc::new(PostgresUserRepository::new(client)),
            })
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store; nothing will be persisted");
            let store = InMemoryAuthorizationStore::new();
            Ok(Repositories {
                permission: Arc::new(store.clone()),
                role: Arc::new(store.clone()),
                user: Arc::new(store),
            })
        }
    }
}

async fn run_postgres_migrations(config: &PostgresConfig) -> anyhow::Result<()> {
    let runner = MigrationRunner::for_postgres(
        config.goose_binary_path.clone(),
        config.migrations_dir.clone(),
        &config.host,
        config.port,
        &config.database,
        &config.username,
        &config.password,
    );
    runner.run_migrations().await
}
