//! Single-elimination tournaments.
//!
//! This module provides:
//! - The [`Tournament`] aggregate and its state machine
//! - Bracket generation with byes and index-based advancement
//! - Random seeding
//! - Placement and reward settlement, including the entry-fee pool bonus
//! - The [`TournamentManager`], which persists changes and moves money
//!
//! ## Example
//!
//! ```
//! use guild_tournaments::store::InMemoryTournamentStore;
//! use guild_tournaments::tournament::{CreateTournamentRequest, TournamentManager, TournamentType};
//! use guild_tournaments::wallet::InMemoryLedger;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = TournamentManager::new(
//!         Arc::new(InMemoryTournamentStore::new()),
//!         Arc::new(InMemoryLedger::new()),
//!     );
//!
//!     let request = CreateTournamentRequest::new("Arena Cup", TournamentType::Combat, "guild-1", 1);
//!     let tournament = manager.create_tournament(request).await?;
//!
//!     for (id, name) in [(10, "Ayla"), (11, "Bram"), (12, "Cato")] {
//!         manager.register_participant("guild-1", id, name).await?;
//!     }
//!
//!     let started = manager.start_tournament("guild-1").await?;
//!     assert_eq!(started.total_rounds, 2);
//!
//!     let view = manager.bracket_view(tournament.id).await?;
//!     assert_eq!(view.rounds[1].name, "Final");
//!     Ok(())
//! }
//! ```

pub mod bracket;
pub mod config;
pub mod errors;
pub mod manager;
pub mod models;
pub mod seeding;
pub mod settlement;
pub mod state_machine;

pub use bracket::{Bracket, BracketLayout, generate_bracket, round_name};
pub use config::TournamentSettings;
pub use errors::{TournamentError, TournamentResult};
pub use manager::{PendingTransfer, TournamentManager};
pub use models::{
    BracketView, CreateTournamentRequest, Match, MatchId, MatchStatus, MatchView, Participant,
    ParticipantId, Payout, Placement, PoolBonus, Refund, Reward, RewardSchedule, RoundView,
    Settlement, Tournament, TournamentId, TournamentStatus, TournamentType,
};
pub use seeding::SeedShuffler;
pub use settlement::{Placements, determine_placements, plan_payouts};
pub use state_machine::{ResultOutcome, StartOutcome};
