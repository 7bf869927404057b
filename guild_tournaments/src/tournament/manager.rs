//! Tournament manager: persistence, locking and money movement around the
//! aggregate's state machine.

use super::{
    config::TournamentSettings,
    errors::{TournamentError, TournamentResult},
    models::{
        BracketView, CreateTournamentRequest, MatchId, ParticipantId, Placement, Refund,
        Tournament, TournamentId, TournamentStatus,
    },
    state_machine::{ResultOutcome, StartOutcome},
};
use crate::{
    rewards::{AchievementService, ExperienceService, NoopRewards},
    store::{StoreError, TournamentStore},
    wallet::{BalanceLedger, EntryType, WalletError, WalletResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use uuid::Uuid;

/// A ledger credit that failed and is waiting to be replayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransfer {
    pub tournament_id: TournamentId,
    pub participant_id: ParticipantId,
    pub amount: i64,
    pub entry_type: EntryType,
    /// Same key on every attempt, so a transfer that did land is not repeated
    pub idempotency_key: String,
    pub attempts: u32,
    pub last_error: String,
    pub queued_at: DateTime<Utc>,
}

type LockMap = HashMap<TournamentId, Arc<Mutex<()>>>;

/// Tournament manager
///
/// Every state change loads the aggregate, applies one state-machine method to
/// a copy and commits the copy with a versioned compare-and-swap. Changes to
/// the same tournament are additionally serialized by a per-tournament lock, so
/// swaps only conflict across processes.
#[derive(Clone)]
pub struct TournamentManager {
    store: Arc<dyn TournamentStore>,
    ledger: Arc<dyn BalanceLedger>,
    experience: Arc<dyn ExperienceService>,
    achievements: Arc<dyn AchievementService>,
    settings: TournamentSettings,
    locks: Arc<Mutex<LockMap>>,
    pending: Arc<Mutex<Vec<PendingTransfer>>>,
}

impl TournamentManager {
    /// Create a manager with default settings and no experience or
    /// achievement services
    pub fn new(store: Arc<dyn TournamentStore>, ledger: Arc<dyn BalanceLedger>) -> Self {
        Self {
            store,
            ledger,
            experience: Arc::new(NoopRewards),
            achievements: Arc::new(NoopRewards),
            settings: TournamentSettings::default(),
            locks: Arc::new(Mutex::new(HashMap::new())),
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_settings(mut self, settings: TournamentSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_experience(mut self, experience: Arc<dyn ExperienceService>) -> Self {
        self.experience = experience;
        self
    }

    pub fn with_achievements(mut self, achievements: Arc<dyn AchievementService>) -> Self {
        self.achievements = achievements;
        self
    }

    pub fn settings(&self) -> &TournamentSettings {
        &self.settings
    }

    /// Create a tournament in registration
    ///
    /// # Errors
    ///
    /// * `TournamentError::AlreadyActive` - The scope already has a tournament
    ///   in registration or in progress
    /// * `TournamentError::InvalidConfig` - The request is malformed
    pub async fn create_tournament(
        &self,
        request: CreateTournamentRequest,
    ) -> TournamentResult<Tournament> {
        let tournament = Tournament::new(request, &self.settings, Utc::now())?;

        self.store.insert(&tournament).await.map_err(|e| match e {
            StoreError::ActiveConflict(scope) => TournamentError::AlreadyActive(scope),
            other => TournamentError::Store(other),
        })?;

        log::info!(
            "Created tournament {} ({}) in scope {}: {}-{} participants, entry fee {}",
            tournament.id,
            tournament.name,
            tournament.scope_id,
            tournament.min_participants,
            tournament.max_participants,
            tournament.entry_fee
        );

        Ok(tournament)
    }

    /// Register a participant in the scope's active tournament.
    ///
    /// The entry fee is withdrawn before the roster changes. If the roster
    /// change is then rejected (for example the last seat went to a concurrent
    /// registration) the fee is refunded.
    ///
    /// # Errors
    ///
    /// * `TournamentError::RegistrationClosed` - Not in registration or past the deadline
    /// * `TournamentError::DuplicateParticipant` - Already registered
    /// * `TournamentError::CapacityExceeded` - Roster is full
    /// * `TournamentError::InsufficientFunds` - The entry fee could not be withdrawn
    pub async fn register_participant(
        &self,
        scope_id: &str,
        participant_id: ParticipantId,
        display_name: &str,
    ) -> TournamentResult<Tournament> {
        let now = Utc::now();
        let active = self.active_in(scope_id).await?;
        active.ensure_can_register(participant_id, now)?;

        let receipt = if active.entry_fee > 0 {
            let key = entry_fee_key(active.id, participant_id);
            self.withdraw_entry_fee(participant_id, active.entry_fee, &key)
                .await?;
            Some(key)
        } else {
            None
        };

        let committed = self
            .commit(active.id, |t| {
                t.register(participant_id, display_name.to_string(), receipt.clone(), now)
                    .map(|p| p.seed)
            })
            .await;

        match committed {
            Ok((tournament, seed)) => {
                log::info!(
                    "Participant {} joined tournament {} as seed {}",
                    participant_id,
                    tournament.id,
                    seed
                );
                Ok(tournament)
            }
            Err(e) => {
                if let Some(entry_receipt) = receipt {
                    log::warn!(
                        "Registration of {} in tournament {} rejected after payment ({}), refunding",
                        participant_id,
                        active.id,
                        e
                    );
                    self.pay_refund(
                        active.id,
                        Refund {
                            participant_id,
                            amount: active.entry_fee,
                            entry_receipt,
                        },
                    )
                    .await;
                }
                Err(e)
            }
        }
    }

    /// Remove a participant during registration and refund their fee
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotRegistered` - Participant is not on the roster
    /// * `TournamentError::NotInRegistration` - Tournament already started
    pub async fn unregister_participant(
        &self,
        scope_id: &str,
        participant_id: ParticipantId,
    ) -> TournamentResult<Tournament> {
        let active = self.active_in(scope_id).await?;
        let (tournament, refund) = self
            .commit(active.id, |t| t.unregister(participant_id))
            .await?;

        log::info!(
            "Participant {} left tournament {}",
            participant_id,
            tournament.id
        );

        if let Some(refund) = refund {
            self.pay_refund(tournament.id, refund).await;
        }

        Ok(tournament)
    }

    /// Close registration, seed the roster and build the bracket.
    ///
    /// A lone participant is declared champion and paid out immediately.
    ///
    /// # Errors
    ///
    /// * `TournamentError::NoActiveTournament` - Nothing to start in this scope.
    ///   This is the not-found case of the scope-keyed lookup; `NotFound` is
    ///   reserved for lookups by tournament id.
    /// * `TournamentError::InsufficientParticipants` - Roster below the minimum
    pub async fn start_tournament(&self, scope_id: &str) -> TournamentResult<Tournament> {
        let active = self.active_in(scope_id).await?;
        let now = Utc::now();
        let (tournament, outcome) = self
            .commit(active.id, |t| t.start(&mut rand::rng(), now))
            .await?;

        if outcome == StartOutcome::Settled {
            self.execute_settlement(&tournament).await;
        }

        Ok(tournament)
    }

    /// Move a ready match to in-progress
    pub async fn mark_match_in_progress(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
    ) -> TournamentResult<Tournament> {
        let (tournament, ()) = self
            .commit(tournament_id, |t| t.mark_match_in_progress(match_id))
            .await?;
        Ok(tournament)
    }

    /// Record the winner of a match
    ///
    /// Submitting the same winner again returns the tournament unchanged.
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Unknown tournament
    /// * `TournamentError::MatchNotFound` - Unknown match
    /// * `TournamentError::MatchAlreadyCompleted` - A different winner was recorded
    /// * `TournamentError::InvalidWinner` - Winner is not playing in the match
    /// * `TournamentError::TerminalState` - Tournament is completed or cancelled
    pub async fn record_match_result(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        winner_id: ParticipantId,
    ) -> TournamentResult<Tournament> {
        self.record(tournament_id, match_id, winner_id, None).await
    }

    /// Record the winner of a match together with both players' scores
    pub async fn record_match_result_with_scores(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        winner_id: ParticipantId,
        scores: (i64, i64),
    ) -> TournamentResult<Tournament> {
        self.record(tournament_id, match_id, winner_id, Some(scores))
            .await
    }

    async fn record(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        winner_id: ParticipantId,
        scores: Option<(i64, i64)>,
    ) -> TournamentResult<Tournament> {
        let now = Utc::now();
        let (tournament, outcome) = self
            .commit(tournament_id, |t| {
                t.record_result(match_id, winner_id, scores, now)
            })
            .await?;

        match outcome {
            ResultOutcome::Settled => self.execute_settlement(&tournament).await,
            ResultOutcome::Replayed => log::debug!(
                "Tournament {}: result of match {} resubmitted",
                tournament_id,
                match_id
            ),
            ResultOutcome::Recorded => {}
        }

        Ok(tournament)
    }

    /// Cancel the scope's active tournament and refund every entry fee.
    ///
    /// Refunds are best-effort: one that fails is queued and does not block
    /// the others or the cancellation.
    ///
    /// # Errors
    ///
    /// * `TournamentError::NoActiveTournament` - Nothing to cancel in this scope.
    ///   This is the not-found case of the scope-keyed lookup; `NotFound` is
    ///   reserved for lookups by tournament id.
    pub async fn cancel_tournament(&self, scope_id: &str) -> TournamentResult<Tournament> {
        let active = self.active_in(scope_id).await?;
        let now = Utc::now();
        let (tournament, refunds) = self.commit(active.id, |t| t.cancel(now)).await?;

        for refund in refunds {
            self.pay_refund(tournament.id, refund).await;
        }

        Ok(tournament)
    }

    /// Re-run the payouts of a completed tournament.
    ///
    /// Payouts are keyed per participant and placement, so credits that already
    /// landed are skipped by the ledger.
    pub async fn replay_settlement(&self, tournament_id: TournamentId) -> TournamentResult<()> {
        let tournament = self.get_tournament(tournament_id).await?;
        if tournament.settlement.is_none() {
            return Err(TournamentError::NotSettled(tournament_id));
        }
        self.execute_settlement(&tournament).await;
        Ok(())
    }

    /// Re-pay the entry-fee refunds of a cancelled tournament.
    ///
    /// Refunds are re-derived from the stored receipts and keyed
    /// `{receipt}:refund`, so refunds that already landed are skipped by the
    /// ledger. Returns how many refunds are settled after this pass; the rest
    /// are queued.
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Unknown tournament
    /// * `TournamentError::NotCancelled` - The tournament was not cancelled
    pub async fn replay_refunds(&self, tournament_id: TournamentId) -> TournamentResult<usize> {
        let tournament = self.get_tournament(tournament_id).await?;
        if tournament.status != TournamentStatus::Cancelled {
            return Err(TournamentError::NotCancelled(tournament_id));
        }

        let refunds = tournament.fee_refunds();
        let owed = refunds.len();
        let mut paid = 0;
        for refund in refunds {
            if self.pay_refund(tournament_id, refund).await {
                paid += 1;
            }
        }

        log::info!(
            "Tournament {}: replayed refunds, {} of {} settled",
            tournament_id,
            paid,
            owed
        );

        Ok(paid)
    }

    /// The scope's tournament in registration or in progress, if any
    pub async fn get_active_tournament(&self, scope_id: &str) -> TournamentResult<Option<Tournament>> {
        Ok(self.store.find_active(scope_id).await?)
    }

    pub async fn get_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.store
            .find(tournament_id)
            .await?
            .ok_or(TournamentError::NotFound(tournament_id))
    }

    /// Every tournament of a scope, newest first
    pub async fn list_tournaments(&self, scope_id: &str) -> TournamentResult<Vec<Tournament>> {
        Ok(self.store.list_by_scope(scope_id).await?)
    }

    pub async fn bracket_view(&self, tournament_id: TournamentId) -> TournamentResult<BracketView> {
        Ok(self.get_tournament(tournament_id).await?.bracket_view())
    }

    /// Transfers waiting to be replayed, oldest first
    pub async fn pending_transfers(&self) -> Vec<PendingTransfer> {
        self.pending.lock().await.clone()
    }

    /// Replay every queued transfer once, returning how many went through.
    /// Transfers that fail again stay queued.
    pub async fn retry_pending_transfers(&self) -> usize {
        let queued = std::mem::take(&mut *self.pending.lock().await);
        let mut completed = 0;
        let mut still_failing = Vec::new();

        for mut transfer in queued {
            transfer.attempts += 1;
            match self.credit(&transfer).await {
                Ok(()) => {
                    log::info!(
                        "Transfer {} to {} completed after {} attempts",
                        transfer.idempotency_key,
                        transfer.participant_id,
                        transfer.attempts
                    );
                    completed += 1;
                }
                Err(e) => {
                    transfer.last_error = e.to_string();
                    still_failing.push(transfer);
                }
            }
        }

        if !still_failing.is_empty() {
            log::error!(
                "{} transfers still failing after retry",
                still_failing.len()
            );
            self.pending.lock().await.extend(still_failing);
        }

        completed
    }

    async fn active_in(&self, scope_id: &str) -> TournamentResult<Tournament> {
        self.store
            .find_active(scope_id)
            .await?
            .ok_or_else(|| TournamentError::NoActiveTournament(scope_id.to_string()))
    }

    async fn lock_for(&self, tournament_id: TournamentId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(tournament_id).or_default())
    }

    /// Apply `apply` to the latest aggregate and commit it.
    ///
    /// An error from `apply` aborts without writing. A mutation that changes
    /// nothing is not written either.
    async fn commit<T, F>(
        &self,
        tournament_id: TournamentId,
        mut apply: F,
    ) -> TournamentResult<(Tournament, T)>
    where
        F: FnMut(&mut Tournament) -> TournamentResult<T> + Send,
        T: Send,
    {
        let lock = self.lock_for(tournament_id).await;
        let _guard = lock.lock().await;

        for attempt in 1..=self.settings.commit_attempts.max(1) {
            let current = self.get_tournament(tournament_id).await?;
            let mut next = current.clone();
            let output = apply(&mut next)?;

            if next == current {
                return Ok((current, output));
            }

            next.version = current.version + 1;
            if self.store.compare_and_swap(current.version, &next).await? {
                if next.status.is_terminal() {
                    self.locks.lock().await.remove(&tournament_id);
                }
                return Ok((next, output));
            }

            log::debug!(
                "Tournament {} changed during update (attempt {}), retrying",
                tournament_id,
                attempt
            );
        }

        log::warn!(
            "Tournament {} update gave up after {} attempts",
            tournament_id,
            self.settings.commit_attempts
        );
        Err(TournamentError::ConcurrentModification(tournament_id))
    }

    async fn withdraw_entry_fee(
        &self,
        participant_id: ParticipantId,
        fee: i64,
        key: &str,
    ) -> TournamentResult<()> {
        match self
            .ledger
            .withdraw(participant_id, fee, key, EntryType::EntryFee)
            .await
        {
            Ok(_) => Ok(()),
            Err(WalletError::InsufficientBalance {
                available,
                required,
                ..
            }) => Err(TournamentError::InsufficientFunds {
                required,
                available,
            }),
            Err(WalletError::WalletNotFound(_)) => Err(TournamentError::InsufficientFunds {
                required: fee,
                available: 0,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn pay_refund(&self, tournament_id: TournamentId, refund: Refund) -> bool {
        let transfer = PendingTransfer {
            tournament_id,
            participant_id: refund.participant_id,
            amount: refund.amount,
            entry_type: EntryType::Refund,
            idempotency_key: format!("{}:refund", refund.entry_receipt),
            attempts: 1,
            last_error: String::new(),
            queued_at: Utc::now(),
        };
        self.transfer_or_queue(transfer).await
    }

    /// Credit a transfer; a key the ledger already applied counts as done
    async fn credit(&self, transfer: &PendingTransfer) -> WalletResult<()> {
        match self
            .ledger
            .credit(
                transfer.participant_id,
                transfer.amount,
                &transfer.idempotency_key,
                transfer.entry_type,
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_duplicate() => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn transfer_or_queue(&self, mut transfer: PendingTransfer) -> bool {
        match self.credit(&transfer).await {
            Ok(()) => true,
            Err(e) => {
                log::error!(
                    "Tournament {}: {} of {} to participant {} failed, queued for retry: {}",
                    transfer.tournament_id,
                    transfer.entry_type,
                    transfer.amount,
                    transfer.participant_id,
                    e
                );
                transfer.last_error = e.to_string();
                transfer.queued_at = Utc::now();
                self.pending.lock().await.push(transfer);
                false
            }
        }
    }

    /// Pay out a settled tournament. Coin credits that fail are queued; failed
    /// experience grants and achievements are logged and dropped.
    async fn execute_settlement(&self, tournament: &Tournament) {
        let Some(settlement) = &tournament.settlement else {
            log::error!(
                "Tournament {} completed without a settlement record",
                tournament.id
            );
            return;
        };

        let mut credited = 0;
        let mut queued = 0;

        for payout in &settlement.payouts {
            let reward = payout.reward;

            if reward.coins > 0 {
                let entry_type = match payout.placement {
                    Placement::Participation => EntryType::Participation,
                    _ => EntryType::Prize,
                };
                let transfer = PendingTransfer {
                    tournament_id: tournament.id,
                    participant_id: payout.participant_id,
                    amount: reward.coins,
                    entry_type,
                    idempotency_key: payout.idempotency_key.clone(),
                    attempts: 1,
                    last_error: String::new(),
                    queued_at: Utc::now(),
                };
                if self.transfer_or_queue(transfer).await {
                    credited += 1;
                } else {
                    queued += 1;
                }
            }

            if reward.experience > 0 {
                let key = format!("{}:xp", payout.idempotency_key);
                if let Err(e) = self
                    .experience
                    .grant_experience(payout.participant_id, reward.experience, &key)
                    .await
                {
                    log::warn!(
                        "Tournament {}: experience grant to {} failed: {}",
                        tournament.id,
                        payout.participant_id,
                        e
                    );
                }
            }

            if let Err(e) = self
                .achievements
                .record_placement(payout.participant_id, tournament.id, payout.placement)
                .await
            {
                log::warn!(
                    "Tournament {}: achievement for {} failed: {}",
                    tournament.id,
                    payout.participant_id,
                    e
                );
            }
        }

        log::info!(
            "Tournament {} paid out: {} credits, {} queued, champion {}",
            tournament.id,
            credited,
            queued,
            settlement.winner_id
        );
    }

    #[cfg(test)]
    async fn tracked_locks(&self) -> usize {
        self.locks.lock().await.len()
    }
}

/// Ledger key of an entry-fee withdrawal. The nonce keeps a participant who
/// leaves and re-joins from colliding with their earlier payment.
fn entry_fee_key(tournament_id: TournamentId, participant_id: ParticipantId) -> String {
    format!(
        "tournament:{tournament_id}:entry:{participant_id}:{}",
        Uuid::new_v4().simple()
    )
}
