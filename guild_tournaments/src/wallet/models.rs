//! Wallet data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wallet model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: i64,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Wallet entry model (one row per balance movement)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletEntry {
    pub id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub balance_after: i64,
    pub direction: EntryDirection,
    pub entry_type: EntryType,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

/// Entry direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    Debit,
    Credit,
}

impl std::fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryDirection::Debit => write!(f, "debit"),
            EntryDirection::Credit => write!(f, "credit"),
        }
    }
}

/// Entry type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Tournament entry fee
    EntryFee,
    /// Entry fee returned on unregister or cancellation
    Refund,
    /// Podium reward
    Prize,
    /// Flat reward for non-placing participants
    Participation,
}

impl EntryType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "entry_fee" => Some(EntryType::EntryFee),
            "refund" => Some(EntryType::Refund),
            "prize" => Some(EntryType::Prize),
            "participation" => Some(EntryType::Participation),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryType::EntryFee => write!(f, "entry_fee"),
            EntryType::Refund => write!(f, "refund"),
            EntryType::Prize => write!(f, "prize"),
            EntryType::Participation => write!(f, "participation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_round_trips_through_text() {
        for entry_type in [
            EntryType::EntryFee,
            EntryType::Refund,
            EntryType::Prize,
            EntryType::Participation,
        ] {
            assert_eq!(EntryType::parse(&entry_type.to_string()), Some(entry_type));
        }
        assert_eq!(EntryType::parse("rake"), None);
    }
}
