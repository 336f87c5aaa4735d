#![cfg(feature = "integration-tests")]

use std::sync::Arc;

use authz_seeder::domain::{AuthorizationSeeder, SeedCatalog};
use common::auth::{Argon2PasswordService, CasbinPermissionRegistrar};
use common::domain::{
    GetUserByEmailInput, ListPermissionsInput, ListRolesInput, PermissionRepository,
    RoleRepository, UserRepository,
};
use common::postgres::{
    PostgresClient, PostgresPermissionRepository, PostgresRoleRepository, PostgresUserRepository,
};
use goose::MigrationRunner;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

async fn setup_test_db() -> (ContainerAsync<Postgres>, PostgresClient) {
    let postgres = Postgres::default().start().await.unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let migrations_dir = format!("{}/../../migrations/postgres", env!("CARGO_MANIFEST_DIR"));
    let goose_path = which::which("goose").expect("goose binary not found");

    MigrationRunner::for_postgres(
        goose_path.to_string_lossy().to_string(),
        migrations_dir,
        &host.to_string(),
        port,
        "postgres",
        "postgres",
        "postgres",
    )
    .run_migrations()
    .await
    .expect("Migrations failed");

    let client = PostgresClient::new(
        &host.to_string(),
        port,
        "postgres",
        "postgres",
        "postgres",
        5,
    )
    .expect("Failed to create client");
    client.ping().await.expect("Postgres not reachable");

    (postgres, client)
}

fn seeder(client: &PostgresClient, registrar: Arc<CasbinPermissionRegistrar>) -> AuthorizationSeeder {
    AuthorizationSeeder::new(
        Arc::new(PostgresPermissionRepository::new(client.clone())),
        Arc::new(PostgresRoleRepository::new(client.clone())),
        Arc::new(PostgresUserRepository::new(client.clone())),
        registrar,
        Arc::new(Argon2PasswordService::new()),
        SeedCatalog::builtin().unwrap(),
        "password",
    )
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_seed_twice_against_postgres() {
    let (_container, client) = setup_test_db().await;
    let roles = Arc::new(PostgresRoleRepository::new(client.clone()));
    let registrar = Arc::new(CasbinPermissionRegistrar::new(roles.clone(), "web"));
    let seeder = seeder(&client, registrar.clone());

    let first = seeder.run().await.unwrap();
    let second = seeder.run().await.unwrap();

    assert_eq!(first.total_permissions, 79);
    assert_eq!(first.created_users(), 5);
    assert_eq!(second.created_users(), 0);
    for (before, after) in first.roles.iter().zip(&second.roles) {
        assert_eq!(before.permission_count, after.permission_count, "{}", before.name);
    }

    let permissions = PostgresPermissionRepository::new(client.clone())
        .list_permissions(ListPermissionsInput {
            guard_name: "web".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(permissions.len(), 79);

    let stored_roles = roles
        .list_roles(ListRolesInput {
            guard_name: "web".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(stored_roles.len(), 3);
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_registrar_reflects_seeded_grants() {
    let (_container, client) = setup_test_db().await;
    let roles = Arc::new(PostgresRoleRepository::new(client.clone()));
    let registrar = Arc::new(CasbinPermissionRegistrar::new(roles, "web"));

    seeder(&client, registrar.clone()).run().await.unwrap();

    let cashier = PostgresUserRepository::new(client.clone())
        .get_user_by_email(GetUserByEmailInput {
            email: "cashier@example.com".to_string(),
        })
        .await
        .unwrap()
        .unwrap();

    assert!(registrar.has_permission(&cashier.id, "create sales").await.unwrap());
    assert!(!registrar.has_permission(&cashier.id, "manage backup").await.unwrap());
}
