//! Postgres connection pooling for the tournament and wallet stores.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::{sync::Arc, time::Duration};

pub mod config;

pub use config::DatabaseConfig;

/// Schema for tournaments, wallets and wallet entries
const SCHEMA: &str = include_str!("../../migrations/0001_tournaments.sql");

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Connect a new pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use guild_tournaments::db::{Database, DatabaseConfig};
    /// use guild_tournaments::store::PgTournamentStore;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let db = Database::new(&DatabaseConfig::from_env()).await?;
    ///     db.ensure_schema().await?;
    ///     let store = PgTournamentStore::new(db.pool());
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        log::info!(
            "Connected to Postgres (pool {}..{})",
            config.min_connections,
            config.max_connections
        );

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Shared handle to the pool, as the stores and the wallet manager take it
    pub fn pool(&self) -> Arc<PgPool> {
        Arc::clone(&self.pool)
    }

    /// Create the tables and indexes if they do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA).execute(self.pool.as_ref()).await?;
        Ok(())
    }

    /// Check that the database answers
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
