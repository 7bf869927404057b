//! Tournament error types.

use super::models::{MatchId, ParticipantId, TournamentId, TournamentStatus};
use crate::{store::StoreError, wallet::WalletError};
use thiserror::Error;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Tournament not found: {0}")]
    NotFound(TournamentId),

    #[error("No active tournament in scope {0}")]
    NoActiveTournament(String),

    #[error("A tournament is already active in scope {0}")]
    AlreadyActive(String),

    #[error("Registration is closed")]
    RegistrationClosed,

    #[error("Participant {0} is already registered")]
    DuplicateParticipant(ParticipantId),

    #[error("Tournament is full ({max} participants)")]
    CapacityExceeded { max: usize },

    #[error("Insufficient funds: entry fee {required}, available {available}")]
    InsufficientFunds { required: i64, available: i64 },

    #[error("Participant {0} is not registered")]
    NotRegistered(ParticipantId),

    #[error("Tournament is no longer in registration")]
    NotInRegistration,

    #[error("Tournament already started")]
    AlreadyStarted,

    #[error("Insufficient participants: need {needed}, have {current}")]
    InsufficientParticipants { needed: usize, current: usize },

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Match {0} is already completed")]
    MatchAlreadyCompleted(MatchId),

    #[error("Match {0} is still waiting for its players")]
    MatchNotReady(MatchId),

    #[error("Participant {winner_id} is not playing in match {match_id}")]
    InvalidWinner {
        match_id: MatchId,
        winner_id: ParticipantId,
    },

    #[error("Tournament is {0}")]
    TerminalState(TournamentStatus),

    #[error("Tournament {0} has not been settled")]
    NotSettled(TournamentId),

    #[error("Tournament {0} has not been cancelled")]
    NotCancelled(TournamentId),

    #[error("Invalid tournament configuration: {0}")]
    InvalidConfig(String),

    #[error("Tournament invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Tournament {0} kept changing underneath the update")]
    ConcurrentModification(TournamentId),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl TournamentError {
    /// Build an invariant violation and log it; these are programming errors.
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!("Tournament invariant violated: {}", message);
        TournamentError::InvariantViolation(message)
    }

    /// Whether the error is a rejected precondition the caller can act on
    pub fn is_precondition(&self) -> bool {
        !matches!(
            self,
            TournamentError::InvariantViolation(_)
                | TournamentError::ConcurrentModification(_)
                | TournamentError::Wallet(_)
                | TournamentError::Store(_)
        )
    }

    /// Get a client-safe error message
    ///
    /// Storage and invariant failures are reduced to a generic message so that
    /// internals never reach the command layer.
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Store(_) => "Internal server error".to_string(),
            TournamentError::InvariantViolation(_) => "Internal tournament error".to_string(),
            TournamentError::Wallet(e) => e.client_message(),
            TournamentError::ConcurrentModification(_) => {
                "Tournament is busy, please retry".to_string()
            }
            _ => self.to_string(),
        }
    }
}

pub type TournamentResult<T> = Result<T, TournamentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_client_message_hides_storage_details() {
        let err = TournamentError::Store(StoreError::Unavailable("connection refused".into()));
        assert_eq!(err.client_message(), "Internal server error");
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_precondition_messages_are_verbatim() {
        let err = TournamentError::InvalidWinner {
            match_id: 3,
            winner_id: 42,
        };
        assert!(err.is_precondition());
        assert_eq!(err.client_message(), err.to_string());
        assert_eq!(err.to_string(), "Participant 42 is not playing in match 3");
    }

    #[test]
    fn test_terminal_state_names_status() {
        let err = TournamentError::TerminalState(TournamentStatus::Cancelled);
        assert_eq!(err.to_string(), "Tournament is cancelled");
    }

    #[test]
    fn test_invariant_is_not_precondition() {
        let err = TournamentError::invariant("slot already filled");
        assert!(!err.is_precondition());
        assert_eq!(err.client_message(), "Internal tournament error");
        let busy = TournamentError::ConcurrentModification(Uuid::nil());
        assert_eq!(busy.client_message(), "Tournament is busy, please retry");
    }
}
