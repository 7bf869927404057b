//! Tournament lifecycle transitions.
//!
//! Every method here is a synchronous mutation of one aggregate. Callers that
//! persist the aggregate apply them to a copy and commit the copy atomically, so
//! a method that returns an error leaves nothing behind.

use super::{
    bracket::generate_bracket,
    config::TournamentSettings,
    errors::{TournamentError, TournamentResult},
    models::{
        CreateTournamentRequest, MatchId, MatchStatus, Participant, ParticipantId, PoolBonus,
        Refund, Tournament, TournamentStatus,
    },
    seeding::{SeedShuffler, reseed},
    settlement,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

/// Result of starting a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Bracket built, first round open
    Started,
    /// A lone participant was declared champion and the tournament settled
    Settled,
}

/// Result of recording a match result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOutcome {
    /// Result applied, bracket advanced
    Recorded,
    /// Result applied and it decided the final
    Settled,
    /// Same result was already recorded; nothing changed
    Replayed,
}

impl Tournament {
    /// Create a tournament in registration
    pub fn new(
        request: CreateTournamentRequest,
        settings: &TournamentSettings,
        now: DateTime<Utc>,
    ) -> TournamentResult<Self> {
        settings.validate_request(&request)?;

        Ok(Self {
            id: Uuid::new_v4(),
            name: request.name,
            tournament_type: request.tournament_type,
            scope_id: request.scope_id,
            creator_id: request.creator_id,
            min_participants: request.min_participants,
            max_participants: request.max_participants,
            entry_fee: request.entry_fee,
            prize_pool: 0,
            bracket: true,
            status: TournamentStatus::Registration,
            current_round: 0,
            total_rounds: 0,
            matches: Vec::new(),
            participants: Vec::new(),
            winner_id: None,
            second_id: None,
            third_id: None,
            rewards: request.rewards.unwrap_or(settings.default_rewards),
            pool_bonus: None,
            settlement: None,
            registration_deadline: now + Duration::minutes(request.registration_minutes),
            created_at: now,
            started_at: None,
            completed_at: None,
            version: 0,
        })
    }

    fn ensure_not_terminal(&self) -> TournamentResult<()> {
        if self.status.is_terminal() {
            return Err(TournamentError::TerminalState(self.status));
        }
        Ok(())
    }

    /// Check every registration precondition without changing anything.
    ///
    /// Used before the entry fee is withdrawn so that a rejected registration
    /// never touches the participant's balance.
    pub fn ensure_can_register(
        &self,
        participant_id: ParticipantId,
        now: DateTime<Utc>,
    ) -> TournamentResult<()> {
        self.ensure_not_terminal()?;

        if self.status != TournamentStatus::Registration || now >= self.registration_deadline {
            return Err(TournamentError::RegistrationClosed);
        }

        if self.is_registered(participant_id) {
            return Err(TournamentError::DuplicateParticipant(participant_id));
        }

        if self.participants.len() >= self.max_participants {
            return Err(TournamentError::CapacityExceeded {
                max: self.max_participants,
            });
        }

        Ok(())
    }

    /// Add a participant. `entry_receipt` is the idempotency key of the fee
    /// withdrawal and must be present whenever the tournament charges a fee.
    pub fn register(
        &mut self,
        participant_id: ParticipantId,
        display_name: String,
        entry_receipt: Option<String>,
        now: DateTime<Utc>,
    ) -> TournamentResult<&Participant> {
        self.ensure_can_register(participant_id, now)?;

        if self.entry_fee > 0 && entry_receipt.is_none() {
            return Err(TournamentError::invariant(format!(
                "participant {participant_id} registered without paying the entry fee"
            )));
        }

        let prize_pool = self.prize_pool.checked_add(self.entry_fee).ok_or_else(|| {
            TournamentError::invariant(format!(
                "prize pool {} cannot take another entry fee of {}",
                self.prize_pool, self.entry_fee
            ))
        })?;

        let seed = self.participants.len() as u32 + 1;
        let mut participant = Participant::new(participant_id, display_name, seed, now);
        if self.entry_fee > 0 {
            participant.entry_receipt = entry_receipt;
            self.prize_pool = prize_pool;
        }
        self.participants.push(participant);

        log::debug!(
            "Tournament {}: registered participant {} as seed {}",
            self.id,
            participant_id,
            seed
        );

        let last = self.participants.len() - 1;
        Ok(&self.participants[last])
    }

    /// Remove a participant during registration, returning the fee to refund
    pub fn unregister(&mut self, participant_id: ParticipantId) -> TournamentResult<Option<Refund>> {
        self.ensure_not_terminal()?;

        if self.status != TournamentStatus::Registration {
            return Err(TournamentError::NotInRegistration);
        }

        let idx = self
            .participants
            .iter()
            .position(|p| p.id == participant_id)
            .ok_or(TournamentError::NotRegistered(participant_id))?;

        let removed = self.participants.remove(idx);
        reseed(&mut self.participants);

        let refund = removed.entry_receipt.map(|entry_receipt| {
            self.prize_pool -= self.entry_fee;
            Refund {
                participant_id,
                amount: self.entry_fee,
                entry_receipt,
            }
        });

        Ok(refund)
    }

    /// Freeze the roster, shuffle seeds, build the bracket and fold the pool
    /// into the podium rewards.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> TournamentResult<StartOutcome> {
        self.ensure_not_terminal()?;

        if self.status != TournamentStatus::Registration {
            return Err(TournamentError::AlreadyStarted);
        }

        if self.participants.len() < self.min_participants || self.participants.is_empty() {
            return Err(TournamentError::InsufficientParticipants {
                needed: self.min_participants.max(1),
                current: self.participants.len(),
            });
        }

        let bonus = PoolBonus::from_pool(self.prize_pool);
        let mut rewards = self.rewards;
        bonus.apply(&mut rewards)?;

        SeedShuffler::new(rng).shuffle(&mut self.participants);
        let seeded: Vec<ParticipantId> = self.participants.iter().map(|p| p.id).collect();
        let bracket = generate_bracket(&seeded);

        self.matches = bracket.matches;
        self.total_rounds = bracket.layout.total_rounds;
        self.status = TournamentStatus::InProgress;
        self.started_at = Some(now);

        self.rewards = rewards;
        self.pool_bonus = Some(bonus);

        log::info!(
            "Tournament {} started: {} participants, bracket of {}, {} byes, {} rounds",
            self.id,
            seeded.len(),
            bracket.layout.bracket_size,
            bracket.layout.byes_needed,
            bracket.layout.total_rounds
        );

        if self.total_rounds == 0 {
            settlement::settle(self, now)?;
            return Ok(StartOutcome::Settled);
        }

        self.current_round = 1;

        let byes: Vec<(u32, ParticipantId)> = self
            .round_matches(1)
            .filter(|m| m.status == MatchStatus::Bye)
            .filter_map(|m| m.winner.map(|w| (m.position, w)))
            .collect();
        for (position, winner) in byes {
            self.advance_winner(1, position, winner)?;
        }

        Ok(StartOutcome::Started)
    }

    /// Move a ready match to in-progress
    pub fn mark_match_in_progress(&mut self, match_id: MatchId) -> TournamentResult<()> {
        self.ensure_not_terminal()?;

        let m = self
            .matches
            .get_mut(match_id as usize)
            .ok_or(TournamentError::MatchNotFound(match_id))?;

        match m.status {
            MatchStatus::Completed | MatchStatus::Bye => {
                Err(TournamentError::MatchAlreadyCompleted(match_id))
            }
            MatchStatus::InProgress => Ok(()),
            MatchStatus::Pending if !m.is_ready() => Err(TournamentError::MatchNotReady(match_id)),
            MatchStatus::Pending => {
                m.status = MatchStatus::InProgress;
                Ok(())
            }
        }
    }

    /// Record the winner of a match and advance the bracket.
    ///
    /// Resubmitting the winner of an already decided match is a no-op.
    pub fn record_result(
        &mut self,
        match_id: MatchId,
        winner_id: ParticipantId,
        scores: Option<(i64, i64)>,
        now: DateTime<Utc>,
    ) -> TournamentResult<ResultOutcome> {
        let m = self
            .get_match(match_id)
            .ok_or(TournamentError::MatchNotFound(match_id))?;

        if m.is_resolved() {
            if m.winner == Some(winner_id) {
                return Ok(ResultOutcome::Replayed);
            }
            return Err(TournamentError::MatchAlreadyCompleted(match_id));
        }

        self.ensure_not_terminal()?;

        let (player1, player2) = match (m.player1, m.player2) {
            (Some(p1), Some(p2)) => (p1, p2),
            _ => return Err(TournamentError::MatchNotReady(match_id)),
        };

        let loser_id = if winner_id == player1 {
            player2
        } else if winner_id == player2 {
            player1
        } else {
            return Err(TournamentError::InvalidWinner {
                match_id,
                winner_id,
            });
        };

        let (round, position) = (m.round, m.position);
        let is_final = round == self.total_rounds;
        if !is_final {
            self.check_advance_target(round, position)?;
        }

        {
            let m = &mut self.matches[match_id as usize];
            m.winner = Some(winner_id);
            m.status = MatchStatus::Completed;
            m.completed_at = Some(now);
            if let Some((score1, score2)) = scores {
                m.player1_score = Some(score1);
                m.player2_score = Some(score2);
            }
        }

        self.participant_mut(winner_id)?.wins += 1;
        let loser = self.participant_mut(loser_id)?;
        loser.losses += 1;
        loser.eliminated = true;
        loser.eliminated_round = Some(round);

        log::debug!(
            "Tournament {}: match {} (round {}) won by {} over {}",
            self.id,
            match_id,
            round,
            winner_id,
            loser_id
        );

        if is_final {
            settlement::settle(self, now)?;
            return Ok(ResultOutcome::Settled);
        }

        self.advance_winner(round, position, winner_id)?;
        self.refresh_current_round();

        Ok(ResultOutcome::Recorded)
    }

    /// One refund per participant who paid an entry fee. Receipts survive
    /// cancellation, so a cancelled tournament can re-derive what it owes.
    pub fn fee_refunds(&self) -> Vec<Refund> {
        self.participants
            .iter()
            .filter_map(|p| {
                p.entry_receipt.as_ref().map(|receipt| Refund {
                    participant_id: p.id,
                    amount: self.entry_fee,
                    entry_receipt: receipt.clone(),
                })
            })
            .collect()
    }

    /// Cancel from registration or in-progress, returning every fee to refund
    pub fn cancel(&mut self, now: DateTime<Utc>) -> TournamentResult<Vec<Refund>> {
        self.ensure_not_terminal()?;

        let refunds = self.fee_refunds();

        self.prize_pool -= refunds.iter().map(|r| r.amount).sum::<i64>();
        self.status = TournamentStatus::Cancelled;
        self.completed_at = Some(now);

        log::info!(
            "Tournament {} cancelled with {} refunds",
            self.id,
            refunds.len()
        );

        Ok(refunds)
    }

    fn participant_mut(&mut self, participant_id: ParticipantId) -> TournamentResult<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.id == participant_id)
            .ok_or_else(|| {
                TournamentError::invariant(format!(
                    "participant {participant_id} is in the bracket but not on the roster"
                ))
            })
    }

    /// Arena index and slot of the match a winner of `(round, position)` moves to
    fn advance_target(&self, round: u32, position: u32) -> (usize, bool) {
        let index = self.layout().match_index(round + 1, position / 2);
        (index, position % 2 == 0)
    }

    fn check_advance_target(&self, round: u32, position: u32) -> TournamentResult<()> {
        let (index, first_slot) = self.advance_target(round, position);
        let target = self.matches.get(index).ok_or_else(|| {
            TournamentError::invariant(format!("no match at index {index} for round {}", round + 1))
        })?;
        let slot = if first_slot {
            target.player1
        } else {
            target.player2
        };
        if slot.is_some() {
            return Err(TournamentError::invariant(format!(
                "match {} slot already filled while advancing from round {round} position {position}",
                target.id
            )));
        }
        Ok(())
    }

    fn advance_winner(
        &mut self,
        round: u32,
        position: u32,
        winner_id: ParticipantId,
    ) -> TournamentResult<()> {
        self.check_advance_target(round, position)?;
        let (index, first_slot) = self.advance_target(round, position);
        let target = &mut self.matches[index];
        if first_slot {
            target.player1 = Some(winner_id);
        } else {
            target.player2 = Some(winner_id);
        }
        Ok(())
    }

    fn refresh_current_round(&mut self) {
        while self.current_round < self.total_rounds
            && self
                .round_matches(self.current_round)
                .all(|m| m.is_resolved())
        {
            self.current_round += 1;
            log::info!(
                "Tournament {} advanced to round {}",
                self.id,
                self.current_round
            );
        }
    }
}
