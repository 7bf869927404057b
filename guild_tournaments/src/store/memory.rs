//! In-process tournament store.

use super::{StoreError, StoreResult, TournamentStore};
use crate::tournament::models::{Tournament, TournamentId};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Tournament store kept in process memory.
///
/// All checks and writes happen under one write lock, which gives the same
/// guarantees as the unique index and versioned update of the Postgres store.
#[derive(Default)]
pub struct InMemoryTournamentStore {
    tournaments: RwLock<HashMap<TournamentId, Tournament>>,
}

impl InMemoryTournamentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentStore for InMemoryTournamentStore {
    async fn insert(&self, tournament: &Tournament) -> StoreResult<()> {
        let mut tournaments = self.tournaments.write().await;

        let scope_taken = tournaments
            .values()
            .any(|t| t.scope_id == tournament.scope_id && t.status.is_active());
        if scope_taken && tournament.status.is_active() {
            return Err(StoreError::ActiveConflict(tournament.scope_id.clone()));
        }

        tournaments.insert(tournament.id, tournament.clone());
        Ok(())
    }

    async fn find(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self.tournaments.read().await.get(&id).cloned())
    }

    async fn find_active(&self, scope_id: &str) -> StoreResult<Option<Tournament>> {
        Ok(self
            .tournaments
            .read()
            .await
            .values()
            .find(|t| t.scope_id == scope_id && t.status.is_active())
            .cloned())
    }

    async fn list_by_scope(&self, scope_id: &str) -> StoreResult<Vec<Tournament>> {
        let mut found: Vec<Tournament> = self
            .tournaments
            .read()
            .await
            .values()
            .filter(|t| t.scope_id == scope_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        tournament: &Tournament,
    ) -> StoreResult<bool> {
        let mut tournaments = self.tournaments.write().await;

        match tournaments.get_mut(&tournament.id) {
            Some(stored) if stored.version == expected_version => {
                *stored = tournament.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
