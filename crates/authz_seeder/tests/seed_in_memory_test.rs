use std::collections::BTreeSet;
use std::sync::Arc;

use authz_seeder::domain::{AuthorizationSeeder, SeedCatalog};
use common::auth::{
    Argon2PasswordService, CasbinPermissionRegistrar, PasswordService, PermissionCache,
};
use common::domain::{
    DomainResult, FindOrCreateRoleInput, GetRolePermissionsInput, GetRolesForUserInput,
    GetUserByEmailInput, ListPermissionsInput, PermissionRepository, RegisterUserInputWithId,
    RoleRepository, SyncRolePermissionsInput, User, UserRepository,
};
use common::memory::InMemoryAuthorizationStore;

const GUARD: &str = "web";

/// Skips Argon2 so the suites stay fast; one test below covers real hashing
struct PlainPasswordService;

impl PasswordService for PlainPasswordService {
    fn hash_password(&self, password: &str) -> DomainResult<String> {
        Ok(format!("plain:{}", password))
    }

    fn verify_password(&self, password: &str, hash: &str) -> DomainResult<bool> {
        Ok(hash == format!("plain:{}", password))
    }
}

fn seeder_with(
    store: &InMemoryAuthorizationStore,
    cache: Arc<dyn PermissionCache>,
    password_service: Arc<dyn PasswordService>,
) -> AuthorizationSeeder {
    AuthorizationSeeder::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        cache,
        password_service,
        SeedCatalog::builtin().unwrap(),
        "password",
    )
}

fn seeder(store: &InMemoryAuthorizationStore) -> AuthorizationSeeder {
    let registrar = CasbinPermissionRegistrar::new(Arc::new(store.clone()), GUARD);
    seeder_with(store, Arc::new(registrar), Arc::new(PlainPasswordService))
}

async fn role_permission_names(store: &InMemoryAuthorizationStore, role: &str) -> BTreeSet<String> {
    let role = store
        .find_or_create_role(FindOrCreateRoleInput {
            name: role.to_string(),
            guard_name: GUARD.to_string(),
        })
        .await
        .unwrap();
    store
        .get_role_permissions(GetRolePermissionsInput { role_id: role.id })
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect()
}

async fn user(store: &InMemoryAuthorizationStore, email: &str) -> User {
    store
        .get_user_by_email(GetUserByEmailInput {
            email: email.to_string(),
        })
        .await
        .unwrap()
        .unwrap()
}

async fn role_names_for(store: &InMemoryAuthorizationStore, email: &str) -> Vec<String> {
    let user = user(store, email).await;
    store
        .get_roles_for_user(GetRolesForUserInput { user_id: user.id })
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect()
}

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_fresh_store_single_run() {
    let store = InMemoryAuthorizationStore::new();

    let summary = seeder(&store).run().await.unwrap();

    assert_eq!(store.permission_count().await, 79);
    assert_eq!(store.role_count().await, 3);
    assert_eq!(store.user_count().await, 5);

    assert_eq!(summary.total_permissions, 79);
    assert_eq!(summary.role("Cashier").unwrap().permission_count, 15);
    assert_eq!(summary.role("Admin").unwrap().permission_count, 74);
    assert_eq!(summary.role("Super Admin").unwrap().permission_count, 79);
    assert_eq!(summary.created_users(), 5);
    assert_eq!(summary.role("Super Admin").unwrap().description, "full access");
}

#[tokio::test]
async fn test_every_group_permission_exists_once() {
    let store = InMemoryAuthorizationStore::new();
    seeder(&store).run().await.unwrap();

    let stored = store
        .list_permissions(ListPermissionsInput {
            guard_name: GUARD.to_string(),
        })
        .await
        .unwrap();
    let catalog = SeedCatalog::builtin().unwrap();

    for group in &catalog.groups {
        for name in &group.permissions {
            let matches = stored.iter().filter(|p| &p.name == name).count();
            assert_eq!(matches, 1, "{} in group {}", name, group.name);
        }
    }
    assert!(stored.iter().all(|p| p.guard_name == GUARD));
}

#[tokio::test]
async fn test_cashier_has_exactly_its_fifteen_permissions() {
    let store = InMemoryAuthorizationStore::new();
    seeder(&store).run().await.unwrap();

    let expected = names(&[
        "view products",
        "search products",
        "view sales",
        "create sales",
        "view daily sales",
        "apply discounts",
        "view invoices",
        "create invoices",
        "print invoices",
        "view customers",
        "create customers",
        "view customer history",
        "view loyalty points",
        "redeem loyalty points",
        "view cashier dashboard",
    ]);
    assert_eq!(role_permission_names(&store, "Cashier").await, expected);
}

#[tokio::test]
async fn test_admin_excludes_system_administration() {
    let store = InMemoryAuthorizationStore::new();
    seeder(&store).run().await.unwrap();

    let admin = role_permission_names(&store, "Admin").await;

    for excluded in [
        "manage roles",
        "manage backup",
        "view system logs",
        "view super admin dashboard",
    ] {
        assert!(!admin.contains(excluded), "Admin must not hold {}", excluded);
    }
    for included in [
        "manage riders",
        "send bulk sms",
        "export reports",
        "view admin dashboard",
        "manage users",
        "manage system settings",
    ] {
        assert!(admin.contains(included), "Admin must hold {}", included);
    }
    assert_eq!(admin.len(), 74);
}

#[tokio::test]
async fn test_super_admin_holds_entire_catalog() {
    let store = InMemoryAuthorizationStore::new();
    seeder(&store).run().await.unwrap();

    let catalog: BTreeSet<String> = SeedCatalog::builtin()
        .unwrap()
        .permission_names()
        .into_iter()
        .collect();

    assert_eq!(role_permission_names(&store, "Super Admin").await, catalog);
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let store = InMemoryAuthorizationStore::new();
    let seeder = seeder(&store);

    seeder.run().await.unwrap();
    let mutations = store.mutation_count().await;
    let cashier = role_permission_names(&store, "Cashier").await;
    let admin = role_permission_names(&store, "Admin").await;

    let summary = seeder.run().await.unwrap();

    assert_eq!(store.mutation_count().await, mutations);
    assert_eq!(store.permission_count().await, 79);
    assert_eq!(store.role_count().await, 3);
    assert_eq!(store.user_count().await, 5);
    assert_eq!(role_permission_names(&store, "Cashier").await, cashier);
    assert_eq!(role_permission_names(&store, "Admin").await, admin);
    assert_eq!(summary.created_users(), 0);
}

#[tokio::test]
async fn test_default_accounts_hold_their_roles() {
    let store = InMemoryAuthorizationStore::new();
    seeder(&store).run().await.unwrap();

    assert_eq!(role_names_for(&store, "cashier@example.com").await, vec!["Cashier"]);
    assert_eq!(
        role_names_for(&store, "superadmin@example.com").await,
        vec!["Super Admin"]
    );
    assert_eq!(role_names_for(&store, "inventory@example.com").await, vec!["Admin"]);
    assert_eq!(role_names_for(&store, "crm@example.com").await, vec!["Admin"]);

    let cashier = user(&store, "cashier@example.com").await;
    assert_eq!(cashier.name, "Cashier User");
    assert_eq!(cashier.phone.as_deref(), Some("+1234567892"));
    assert!(cashier.email_verified_at.is_some());
}

#[tokio::test]
async fn test_existing_account_keeps_its_attributes() {
    let store = InMemoryAuthorizationStore::new();
    store
        .register_user(RegisterUserInputWithId {
            id: "user-admin".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: "custom-hash".to_string(),
            name: "Head of Operations".to_string(),
            phone: None,
            email_verified_at: None,
        })
        .await
        .unwrap();

    let summary = seeder(&store).run().await.unwrap();

    let admin = user(&store, "admin@example.com").await;
    assert_eq!(admin.id, "user-admin");
    assert_eq!(admin.name, "Head of Operations");
    assert_eq!(admin.password_hash, "custom-hash");
    assert!(admin.phone.is_none());
    assert_eq!(role_names_for(&store, "admin@example.com").await, vec!["Admin"]);

    assert_eq!(summary.created_users(), 4);
    assert!(!summary.user("admin@example.com").unwrap().created);
}

#[tokio::test]
async fn test_drifted_role_is_reconciled() {
    let store = InMemoryAuthorizationStore::new();
    let seeder = seeder(&store);
    seeder.run().await.unwrap();

    let cashier = store
        .find_or_create_role(FindOrCreateRoleInput {
            name: "Cashier".to_string(),
            guard_name: GUARD.to_string(),
        })
        .await
        .unwrap();
    let mut drifted: Vec<String> = role_permission_names(&store, "Cashier")
        .await
        .into_iter()
        .filter(|name| name != "view sales")
        .collect();
    drifted.push("manage backup".to_string());
    store
        .sync_role_permissions(SyncRolePermissionsInput {
            role_id: cashier.id,
            guard_name: GUARD.to_string(),
            permission_names: drifted,
        })
        .await
        .unwrap();
    assert!(role_permission_names(&store, "Cashier").await.contains("manage backup"));

    seeder.run().await.unwrap();

    let reconciled = role_permission_names(&store, "Cashier").await;
    assert_eq!(reconciled.len(), 15);
    assert!(reconciled.contains("view sales"));
    assert!(!reconciled.contains("manage backup"));
}

#[tokio::test]
async fn test_warm_registrar_sees_seeded_graph() {
    let store = InMemoryAuthorizationStore::new();
    let registrar = Arc::new(CasbinPermissionRegistrar::new(Arc::new(store.clone()), GUARD));

    // Warm the cache against the empty store
    assert!(!registrar.has_permission("nobody", "view sales").await.unwrap());
    assert!(registrar.is_loaded().await);

    seeder_with(&store, registrar.clone(), Arc::new(PlainPasswordService))
        .run()
        .await
        .unwrap();

    let cashier = user(&store, "cashier@example.com").await;
    let super_admin = user(&store, "superadmin@example.com").await;

    assert!(registrar.has_permission(&cashier.id, "create sales").await.unwrap());
    assert!(!registrar.has_permission(&cashier.id, "manage roles").await.unwrap());
    assert!(registrar.has_permission(&super_admin.id, "manage roles").await.unwrap());
    assert_eq!(
        registrar.get_roles_for_user(&cashier.id).await.unwrap(),
        vec!["Cashier".to_string()]
    );
}

#[tokio::test]
async fn test_default_password_verifies_with_argon2() {
    let store = InMemoryAuthorizationStore::new();
    let registrar = CasbinPermissionRegistrar::new(Arc::new(store.clone()), GUARD);
    let argon2 = Arc::new(Argon2PasswordService::new());

    seeder_with(&store, Arc::new(registrar), argon2.clone())
        .run()
        .await
        .unwrap();

    let cashier = user(&store, "cashier@example.com").await;
    assert!(cashier.password_hash.starts_with("$argon2"));
    assert!(argon2.verify_password("password", &cashier.password_hash).unwrap());
    assert!(!argon2.verify_password("wrong-password", &cashier.password_hash).unwrap());
}

#[tokio::test]
async fn test_overridden_catalog_seeds_only_what_it_lists() {
    let store = InMemoryAuthorizationStore::new();
    let catalog = SeedCatalog::from_toml_str(
        r#"
        guard_name = "api"

        [[groups]]
        name = "reports"
        permissions = ["export reports", "schedule reports"]

        [[roles]]
        name = "Auditor"
        description = "read-only reporting"
        groups = ["reports"]

        [[users]]
        email = "auditor@example.com"
        name = "Audit User"
        role = "Auditor"
        "#,
    )
    .unwrap();

    let seeder = AuthorizationSeeder::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(CasbinPermissionRegistrar::new(Arc::new(store.clone()), "api")),
        Arc::new(PlainPasswordService),
        catalog,
        "password",
    );
    let summary = seeder.run().await.unwrap();

    assert_eq!(summary.guard_name, "api");
    assert_eq!(summary.total_permissions, 2);
    assert_eq!(store.role_count().await, 1);
    assert!(user(&store, "auditor@example.com").await.phone.is_none());
}
