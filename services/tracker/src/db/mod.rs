//! Postgres persistence: the connection pool, runtime migrations, and
//! [`PgStore`].

mod pg_store;

use std::path::PathBuf;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::store::StoreError;

pub use pg_store::PgStore;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/mailbox";

/// Connection settings for the campaign database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,

    /// Pool size. The tracker holds one connection per in-flight open.
    pub max_connections: u32,

    /// How long a caller waits for a pooled connection.
    pub acquire_timeout: Duration,

    /// Overrides the bundled `migrations/` directory.
    pub migrations_dir: Option<PathBuf>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            migrations_dir: None,
        }
    }
}

impl DbConfig {
    /// `DATABASE_URL`, `DB_MAX_CONNECTIONS`, `DB_ACQUIRE_TIMEOUT_MS` and
    /// `MAILBOX_MIGRATIONS_DIR`. Unset or unparsable values keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_connections),
            acquire_timeout: lookup("DB_ACQUIRE_TIMEOUT_MS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.acquire_timeout),
            migrations_dir: lookup("MAILBOX_MIGRATIONS_DIR").map(PathBuf::from),
        }
    }

    fn resolved_migrations_dir(&self) -> PathBuf {
        match &self.migrations_dir {
            Some(dir) => dir.clone(),
            None => PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations"),
        }
    }
}

/// Pooled connection to the campaign database.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    migrations_dir: PathBuf,
}

impl Database {
    pub async fn connect(config: &DbConfig) -> Result<Self, StoreError> {
        info!(
            max_connections = config.max_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
            .map_err(StoreError::Connect)?;

        Ok(Self {
            pool,
            migrations_dir: config.resolved_migrations_dir(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations, loaded from disk at runtime so builds do not
    /// need a database.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        let migrator = Migrator::new(self.migrations_dir.clone())
            .await
            .map_err(|source| StoreError::MigrationDir {
                dir: self.migrations_dir.display().to_string(),
                source,
            })?;

        migrator
            .run(&self.pool)
            .await
            .map_err(StoreError::Migration)?;
        info!(migrations_dir = %self.migrations_dir.display(), "Database migrations complete");

        Ok(())
    }

    pub fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_unset_env_keeps_defaults() {
        let config = DbConfig::from_lookup(lookup(&[]));
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert!(config
            .resolved_migrations_dir()
            .ends_with("services/tracker/migrations"));
    }

    #[test]
    fn test_env_overrides() {
        let config = DbConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/mail"),
            ("DB_MAX_CONNECTIONS", "3"),
            ("DB_ACQUIRE_TIMEOUT_MS", "250"),
            ("MAILBOX_MIGRATIONS_DIR", "/srv/migrations"),
        ]));
        assert_eq!(config.database_url, "postgres://db/mail");
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.acquire_timeout, Duration::from_millis(250));
        assert_eq!(
            config.resolved_migrations_dir(),
            PathBuf::from("/srv/migrations")
        );
    }

    #[test]
    fn test_unparsable_pool_size_falls_back() {
        let config = DbConfig::from_lookup(lookup(&[("DB_MAX_CONNECTIONS", "many")]));
        assert_eq!(config.max_connections, 10);
    }
}
