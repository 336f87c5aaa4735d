use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::debug;

/// Applies goose SQL migrations by spawning the goose binary.
///
/// Only the PostgreSQL driver is exercised by the seeder, but the runner passes
/// the driver name through untouched so any goose-supported database works.
pub struct MigrationRunner {
    /// Path to the goose binary ("goose" if it is on PATH)
    goose_binary_path: String,

    /// Directory containing the `-- +goose Up` SQL files
    migrations_dir: String,

    /// goose driver name, e.g. "postgres"
    driver: String,

    /// Connection string in the driver's own format
    dsn: String,
}

impl MigrationRunner {
    pub fn new(
        goose_binary_path: String,
        migrations_dir: String,
        driver: String,
        dsn: String,
    ) -> Self {
        Self {
            goose_binary_path,
            migrations_dir,
            driver,
            dsn,
        }
    }

    /// Builds a runner for a PostgreSQL database reachable without TLS.
    pub fn for_postgres(
        goose_binary_path: String,
        migrations_dir: String,
        host: &str,
        port: u16,
        database: &str,
        username: &str,
        password: &str,
    ) -> Self {
        let dsn = format!(
            "postgres://{}:{}@{}:{}/{}?sslmode=disable",
            username, password, host, port, database
        );
        Self::new(
            goose_binary_path,
            migrations_dir,
            "postgres".to_string(),
            dsn,
        )
    }

    /// Runs every pending migration (`goose -dir {dir} {driver} {dsn} up`).
    ///
    /// # Errors
    /// Fails when the goose binary cannot be spawned or exits non-zero; the
    /// error carries goose's stdout and stderr.
    pub async fn run_migrations(&self) -> Result<()> {
        debug!(migrations_dir = %self.migrations_dir, driver = %self.driver, "running migrations");

        let stdout = self.goose("up").await?;
        debug!("migrations completed successfully:\n{}", stdout);

        Ok(())
    }

    async fn goose(&self, subcommand: &str) -> Result<String> {
        let output = Command::new(&self.goose_binary_path)
            .arg("-dir")
            .arg(&self.migrations_dir)
            .arg(&self.driver)
            .arg(&self.dsn)
            .arg(subcommand)
            .output()
            .await
            .with_context(|| format!("failed to spawn {}", self.goose_binary_path))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "goose {} failed.\nstdout: {}\nstderr: {}",
                subcommand,
                stdout,
                stderr
            );
        }

        Ok(stdout)
    }
}
