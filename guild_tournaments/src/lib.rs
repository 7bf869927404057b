//! # Guild Tournaments
//!
//! Single-elimination tournaments for community servers: asynchronous registration
//! inside a time window, bracket generation with byes, round-by-round advancement
//! driven by recorded match results, and settlement of placement rewards funded by
//! a fixed schedule plus an entry-fee pool.
//!
//! ## Architecture
//!
//! A tournament is a single aggregate (roster, match arena, counters) that moves
//! through four states:
//!
//! - **Registration**: participants join or leave, entry fees are pooled
//! - **InProgress**: the bracket is frozen and results advance winners
//! - **Completed**: the final was decided and rewards were settled
//! - **Cancelled**: aborted before completion, fees refunded
//!
//! Every transition is a pure method on [`tournament::Tournament`]; the
//! [`tournament::TournamentManager`] wraps those methods in an optimistic
//! compare-and-swap against a [`store::TournamentStore`] and performs the money
//! movements through a [`wallet::BalanceLedger`].
//!
//! ## Core Modules
//!
//! - [`tournament`]: aggregate, bracket generator, state machine, settlement, manager
//! - [`wallet`]: idempotent balance ledger (Postgres and in-memory)
//! - [`store`]: aggregate persistence with compare-and-swap
//! - [`rewards`]: experience and achievement collaborators
//! - [`db`]: Postgres connection pooling
//!
//! ## Example
//!
//! ```
//! use guild_tournaments::tournament::bracket::BracketLayout;
//!
//! let layout = BracketLayout::for_participants(5);
//! assert_eq!(layout.bracket_size, 8);
//! assert_eq!(layout.byes_needed, 3);
//! ```

/// Postgres connection pooling and configuration.
pub mod db;

/// Experience and achievement services consumed by settlement.
pub mod rewards;

/// Tournament aggregate persistence.
pub mod store;

/// Tournament lifecycle, bracket and settlement.
pub mod tournament;

/// Balance ledger used for entry fees, refunds and prizes.
pub mod wallet;

pub use tournament::{
    CreateTournamentRequest, Tournament, TournamentError, TournamentManager, TournamentResult,
    TournamentSettings, TournamentStatus,
};
