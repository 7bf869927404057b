//! Tournament aggregate persistence.
//!
//! The whole aggregate (roster, matches, counters) is stored as one unit with a
//! version number. Writers read a version, mutate a copy and commit it with
//! [`TournamentStore::compare_and_swap`], which only succeeds if nobody else
//! committed in between. The one-active-tournament-per-scope rule is enforced by
//! the store itself at insert time.

pub mod errors;
pub mod memory;
pub mod postgres;

pub use errors::{StoreError, StoreResult};
pub use memory::InMemoryTournamentStore;
pub use postgres::PgTournamentStore;

use crate::tournament::models::{Tournament, TournamentId};
use async_trait::async_trait;

/// Persistence for tournament aggregates
#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Insert a new tournament.
    ///
    /// Fails with [`StoreError::ActiveConflict`] if the scope already has a
    /// tournament in registration or in progress.
    async fn insert(&self, tournament: &Tournament) -> StoreResult<()>;

    /// Load a tournament by id
    async fn find(&self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// Load the registration or in-progress tournament of a scope
    async fn find_active(&self, scope_id: &str) -> StoreResult<Option<Tournament>>;

    /// Every tournament of a scope, newest first
    async fn list_by_scope(&self, scope_id: &str) -> StoreResult<Vec<Tournament>>;

    /// Replace the stored aggregate if its version still equals
    /// `expected_version`. Returns `false` when another writer got there first.
    async fn compare_and_swap(
        &self,
        expected_version: u64,
        tournament: &Tournament,
    ) -> StoreResult<bool>;
}
