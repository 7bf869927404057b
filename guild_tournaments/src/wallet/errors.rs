//! Wallet error types.

use thiserror::Error;

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Insufficient balance
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance {
        user_id: i64,
        available: i64,
        required: i64,
    },

    /// Wallet not found
    #[error("Wallet not found for user {0}")]
    WalletNotFound(i64),

    /// Duplicate transaction (idempotency key already used)
    #[error("Duplicate transaction: {0}")]
    DuplicateTransaction(String),

    /// Invalid amount (must be positive)
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Credit would overflow the balance
    #[error("Balance overflow")]
    BalanceOverflow,

    /// Ledger could not be reached
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

impl WalletError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database errors are sanitized to prevent information disclosure about
    /// the internal system structure, and user IDs are redacted.
    pub fn client_message(&self) -> String {
        match self {
            WalletError::Database(_) | WalletError::Unavailable(_) => {
                "Internal server error".to_string()
            }
            WalletError::WalletNotFound(_) => "Wallet not found".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the operation with this key was already applied
    pub fn is_duplicate(&self) -> bool {
        matches!(self, WalletError::DuplicateTransaction(_))
    }
}

/// Result type for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_redacts_user() {
        assert_eq!(
            WalletError::WalletNotFound(77).client_message(),
            "Wallet not found"
        );
        assert_eq!(
            WalletError::Unavailable("timeout".into()).client_message(),
            "Internal server error"
        );
    }

    #[test]
    fn test_duplicate_detection() {
        assert!(WalletError::DuplicateTransaction("k".into()).is_duplicate());
        assert!(!WalletError::InvalidAmount(0).is_duplicate());
    }
}
