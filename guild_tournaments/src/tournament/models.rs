//! Tournament data models: the aggregate, its participants and its match arena.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tournament ID type
pub type TournamentId = Uuid;

/// Participant ID type (platform user id)
pub type ParticipantId = i64;

/// Match ID type (index into the tournament's match arena)
pub type MatchId = u32;

/// Tournament lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Accepting registrations
    Registration,
    /// Bracket frozen, results being recorded
    InProgress,
    /// Final decided and rewards settled
    Completed,
    /// Aborted before completion
    Cancelled,
}

impl TournamentStatus {
    /// Whether this status counts towards the one-active-per-scope rule
    pub fn is_active(self) -> bool {
        matches!(self, Self::Registration | Self::InProgress)
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Competition type. Selects which external resolver decides matches; the bracket
/// mechanics are identical for every type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentType {
    Combat,
    Fishing,
    Mining,
}

impl std::fmt::Display for TournamentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentType::Combat => write!(f, "combat"),
            TournamentType::Fishing => write!(f, "fishing"),
            TournamentType::Mining => write!(f, "mining"),
        }
    }
}

/// Coins and experience granted for one placement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub coins: i64,
    pub experience: i64,
}

impl Reward {
    pub fn new(coins: i64, experience: i64) -> Self {
        Self { coins, experience }
    }
}

/// Rewards per placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSchedule {
    pub first: Reward,
    pub second: Reward,
    pub third: Reward,
    /// Paid to every participant who did not place
    pub participation: Reward,
}

impl RewardSchedule {
    /// Reward for a placement
    pub fn for_placement(&self, placement: Placement) -> Reward {
        match placement {
            Placement::First => self.first,
            Placement::Second => self.second,
            Placement::Third => self.third,
            Placement::Participation => self.participation,
        }
    }

    pub(crate) fn has_negative(&self) -> bool {
        [self.first, self.second, self.third, self.participation]
            .iter()
            .any(|r| r.coins < 0 || r.experience < 0)
    }
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            first: Reward::new(1000, 500),
            second: Reward::new(500, 250),
            third: Reward::new(250, 100),
            participation: Reward::new(50, 25),
        }
    }
}

/// Final standing used for payouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    First,
    Second,
    Third,
    Participation,
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placement::First => write!(f, "first"),
            Placement::Second => write!(f, "second"),
            Placement::Third => write!(f, "third"),
            Placement::Participation => write!(f, "participation"),
        }
    }
}

/// Registered participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    /// 1-based, dense across the roster
    pub seed: u32,
    pub eliminated: bool,
    pub eliminated_round: Option<u32>,
    pub wins: u32,
    pub losses: u32,
    pub registered_at: DateTime<Utc>,
    /// Idempotency key of the entry-fee withdrawal, if a fee was paid
    pub entry_receipt: Option<String>,
}

impl Participant {
    pub fn new(
        id: ParticipantId,
        display_name: String,
        seed: u32,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            display_name,
            seed,
            eliminated: false,
            eliminated_round: None,
            wins: 0,
            losses: 0,
            registered_at,
            entry_receipt: None,
        }
    }
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    InProgress,
    Completed,
    Bye,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStatus::Pending => write!(f, "pending"),
            MatchStatus::InProgress => write!(f, "in_progress"),
            MatchStatus::Completed => write!(f, "completed"),
            MatchStatus::Bye => write!(f, "bye"),
        }
    }
}

/// One 1v1 contest in the bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    /// 1-based
    pub round: u32,
    /// 0-based index within the round
    pub position: u32,
    pub player1: Option<ParticipantId>,
    pub player2: Option<ParticipantId>,
    pub player1_score: Option<i64>,
    pub player2_score: Option<i64>,
    pub winner: Option<ParticipantId>,
    pub status: MatchStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Empty placeholder awaiting advancement
    pub fn placeholder(id: MatchId, round: u32, position: u32) -> Self {
        Self {
            id,
            round,
            position,
            player1: None,
            player2: None,
            player1_score: None,
            player2_score: None,
            winner: None,
            status: MatchStatus::Pending,
            completed_at: None,
        }
    }

    /// Completed or bye
    pub fn is_resolved(&self) -> bool {
        matches!(self.status, MatchStatus::Completed | MatchStatus::Bye)
    }

    /// Both slots filled and not yet decided
    pub fn is_ready(&self) -> bool {
        !self.is_resolved() && self.player1.is_some() && self.player2.is_some()
    }

    pub fn has_player(&self, participant_id: ParticipantId) -> bool {
        self.player1 == Some(participant_id) || self.player2 == Some(participant_id)
    }

    /// The slot that did not win, once decided
    pub fn loser(&self) -> Option<ParticipantId> {
        match (self.status, self.winner) {
            (MatchStatus::Completed, Some(winner)) if self.player1 == Some(winner) => self.player2,
            (MatchStatus::Completed, Some(winner)) if self.player2 == Some(winner) => self.player1,
            _ => None,
        }
    }
}

/// Amounts taken from the entry-fee pool at start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolBonus {
    pub first: i64,
    pub second: i64,
    pub third: i64,
    /// Kept by the platform, never paid out
    pub retained: i64,
}

/// A single planned credit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub participant_id: ParticipantId,
    pub placement: Placement,
    pub reward: Reward,
    /// Ledger idempotency key, stable across retries
    pub idempotency_key: String,
}

/// Outcome of settlement, stored on the completed aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub winner_id: ParticipantId,
    pub second_id: Option<ParticipantId>,
    pub third_id: Option<ParticipantId>,
    pub payouts: Vec<Payout>,
    pub settled_at: DateTime<Utc>,
}

/// Fee to give back to a participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub participant_id: ParticipantId,
    pub amount: i64,
    /// Idempotency key of the original withdrawal
    pub entry_receipt: String,
}

/// Tournament aggregate. Participants and matches have no existence outside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub tournament_type: TournamentType,
    /// Guild or channel the tournament belongs to
    pub scope_id: String,
    pub creator_id: ParticipantId,
    pub min_participants: usize,
    pub max_participants: usize,
    pub entry_fee: i64,
    pub prize_pool: i64,
    /// Always true; score-based formats are not implemented
    pub bracket: bool,
    pub status: TournamentStatus,
    pub current_round: u32,
    pub total_rounds: u32,
    pub matches: Vec<Match>,
    pub participants: Vec<Participant>,
    pub winner_id: Option<ParticipantId>,
    pub second_id: Option<ParticipantId>,
    pub third_id: Option<ParticipantId>,
    pub rewards: RewardSchedule,
    pub pool_bonus: Option<PoolBonus>,
    pub settlement: Option<Settlement>,
    pub registration_deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency version, bumped on every committed change
    pub version: u64,
}

impl Tournament {
    pub fn participant(&self, participant_id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == participant_id)
    }

    pub fn is_registered(&self, participant_id: ParticipantId) -> bool {
        self.participant(participant_id).is_some()
    }

    pub fn get_match(&self, match_id: MatchId) -> Option<&Match> {
        self.matches.get(match_id as usize)
    }

    /// Matches of one round, in bracket order
    pub fn round_matches(&self, round: u32) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(move |m| m.round == round)
    }

    /// Matches that can be played right now
    pub fn ready_matches(&self) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.is_ready()).collect()
    }

    /// The final, once the bracket exists
    pub fn final_match(&self) -> Option<&Match> {
        self.matches.last()
    }
}

/// Options for creating a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
    pub tournament_type: TournamentType,
    pub scope_id: String,
    pub creator_id: ParticipantId,
    pub max_participants: usize,
    pub min_participants: usize,
    pub entry_fee: i64,
    pub registration_minutes: i64,
    /// Falls back to the configured default schedule
    pub rewards: Option<RewardSchedule>,
}

impl CreateTournamentRequest {
    /// Free 2-16 player tournament with a 30 minute registration window
    pub fn new(
        name: impl Into<String>,
        tournament_type: TournamentType,
        scope_id: impl Into<String>,
        creator_id: ParticipantId,
    ) -> Self {
        Self {
            name: name.into(),
            tournament_type,
            scope_id: scope_id.into(),
            creator_id,
            max_participants: 16,
            min_participants: 2,
            entry_fee: 0,
            registration_minutes: 30,
            rewards: None,
        }
    }

    pub fn with_capacity(mut self, min_participants: usize, max_participants: usize) -> Self {
        self.min_participants = min_participants;
        self.max_participants = max_participants;
        self
    }

    pub fn with_entry_fee(mut self, entry_fee: i64) -> Self {
        self.entry_fee = entry_fee;
        self
    }

    pub fn with_registration_minutes(mut self, minutes: i64) -> Self {
        self.registration_minutes = minutes;
        self
    }

    pub fn with_rewards(mut self, rewards: RewardSchedule) -> Self {
        self.rewards = Some(rewards);
        self
    }
}

/// Read-only bracket projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketView {
    pub tournament_id: TournamentId,
    pub name: String,
    pub status: TournamentStatus,
    pub current_round: u32,
    pub total_rounds: u32,
    pub rounds: Vec<RoundView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundView {
    pub round: u32,
    /// "Final", "Semifinal", "Quarterfinal" or "Round N"
    pub name: String,
    pub matches: Vec<MatchView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchView {
    pub match_id: MatchId,
    pub position: u32,
    pub player1: Option<String>,
    pub player2: Option<String>,
    pub winner: Option<String>,
    pub status: MatchStatus,
}
