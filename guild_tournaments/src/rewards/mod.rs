//! Experience and achievement collaborators.
//!
//! Settlement grants experience through an [`ExperienceService`] and reports
//! placements to an [`AchievementService`]. Both are best-effort from the
//! tournament's point of view: a failure is logged and never undoes settlement.

use crate::tournament::models::{ParticipantId, Placement, TournamentId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

/// Leveling service
#[async_trait]
pub trait ExperienceService: Send + Sync {
    /// Grant experience once per idempotency key
    async fn grant_experience(
        &self,
        user_id: ParticipantId,
        amount: i64,
        idempotency_key: &str,
    ) -> anyhow::Result<()>;
}

/// Badge and achievement service
#[async_trait]
pub trait AchievementService: Send + Sync {
    /// Record where a user finished in a tournament
    async fn record_placement(
        &self,
        user_id: ParticipantId,
        tournament_id: TournamentId,
        placement: Placement,
    ) -> anyhow::Result<()>;
}

/// Services that accept and drop everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRewards;

#[async_trait]
impl ExperienceService for NoopRewards {
    async fn grant_experience(&self, _: ParticipantId, _: i64, _: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl AchievementService for NoopRewards {
    async fn record_placement(
        &self,
        _: ParticipantId,
        _: TournamentId,
        _: Placement,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct ExperienceState {
    totals: HashMap<ParticipantId, i64>,
    applied_keys: HashSet<String>,
}

/// Experience totals kept in process memory
#[derive(Default)]
pub struct InMemoryExperience {
    state: Mutex<ExperienceState>,
}

impl InMemoryExperience {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total experience granted to a user
    pub async fn experience(&self, user_id: ParticipantId) -> i64 {
        self.state
            .lock()
            .await
            .totals
            .get(&user_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ExperienceService for InMemoryExperience {
    async fn grant_experience(
        &self,
        user_id: ParticipantId,
        amount: i64,
        idempotency_key: &str,
    ) -> anyhow::Result<()> {
        anyhow::ensure!(amount >= 0, "negative experience grant: {amount}");

        let mut state = self.state.lock().await;
        if !state.applied_keys.insert(idempotency_key.to_string()) {
            return Ok(());
        }
        *state.totals.entry(user_id).or_insert(0) += amount;
        Ok(())
    }
}

/// Placements kept in process memory
#[derive(Default)]
pub struct InMemoryAchievements {
    placements: Mutex<Vec<(ParticipantId, TournamentId, Placement)>>,
}

impl InMemoryAchievements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placements recorded for a user, oldest first
    pub async fn placements(&self, user_id: ParticipantId) -> Vec<(TournamentId, Placement)> {
        self.placements
            .lock()
            .await
            .iter()
            .filter(|(user, _, _)| *user == user_id)
            .map(|(_, tournament, placement)| (*tournament, *placement))
            .collect()
    }
}

#[async_trait]
impl AchievementService for InMemoryAchievements {
    async fn record_placement(
        &self,
        user_id: ParticipantId,
        tournament_id: TournamentId,
        placement: Placement,
    ) -> anyhow::Result<()> {
        let mut placements = self.placements.lock().await;
        let entry = (user_id, tournament_id, placement);
        if !placements.contains(&entry) {
            placements.push(entry);
        }
        Ok(())
    }
}
