//! Postgres tournament store.
//!
//! The aggregate is stored as JSONB next to the columns the store needs to
//! query and constrain on. The one-active-per-scope rule is the partial unique
//! index `tournaments_one_active_per_scope` (see `migrations/`).
#![allow(clippy::needless_raw_string_hashes)]

use super::{StoreError, StoreResult, TournamentStore};
use crate::tournament::models::{Tournament, TournamentId};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::sync::Arc;

/// Tournament store backed by Postgres
#[derive(Clone)]
pub struct PgTournamentStore {
    pool: Arc<PgPool>,
}

impl PgTournamentStore {
    /// Create a new store
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    fn decode(row: &PgRow) -> StoreResult<Tournament> {
        let aggregate: serde_json::Value = row.get("aggregate");
        Ok(serde_json::from_value(aggregate)?)
    }
}

#[async_trait]
impl TournamentStore for PgTournamentStore {
    async fn insert(&self, tournament: &Tournament) -> StoreResult<()> {
        let aggregate = serde_json::to_value(tournament)?;

        sqlx::query(
            r#"
            INSERT INTO tournaments (id, scope_id, status, version, aggregate, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            "#,
        )
        .bind(tournament.id)
        .bind(&tournament.scope_id)
        .bind(tournament.status.as_str())
        .bind(tournament.version as i64)
        .bind(aggregate)
        .bind(tournament.created_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::ActiveConflict(tournament.scope_id.clone())
            }
            other => StoreError::Database(other),
        })?;

        Ok(())
    }

    async fn find(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        let row = sqlx::query("SELECT aggregate FROM tournaments WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        row.as_ref().map(Self::decode).transpose()
    }

    async fn find_active(&self, scope_id: &str) -> StoreResult<Option<Tournament>> {
        let row = sqlx::query(
            r#"
            SELECT aggregate FROM tournaments
            WHERE scope_id = $1 AND status IN ('registration', 'in_progress')
            "#,
        )
        .bind(scope_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.as_ref().map(Self::decode).transpose()
    }

    async fn list_by_scope(&self, scope_id: &str) -> StoreResult<Vec<Tournament>> {
        let rows = sqlx::query(
            r#"
            SELECT aggregate FROM tournaments
            WHERE scope_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(scope_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(Self::decode).collect()
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        tournament: &Tournament,
    ) -> StoreResult<bool> {
        let aggregate = serde_json::to_value(tournament)?;

        let result = sqlx::query(
            r#"
            UPDATE tournaments
            SET status = $1, version = $2, aggregate = $3, updated_at = NOW()
            WHERE id = $4 AND version = $5
            "#,
        )
        .bind(tournament.status.as_str())
        .bind(tournament.version as i64)
        .bind(aggregate)
        .bind(tournament.id)
        .bind(expected_version as i64)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
