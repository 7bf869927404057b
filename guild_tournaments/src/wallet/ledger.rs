//! Balance ledger abstraction and an in-process implementation.

use super::{
    errors::{WalletError, WalletResult},
    models::{EntryDirection, EntryType, WalletEntry},
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

/// Idempotent balance movements.
///
/// Every call carries an idempotency key. Re-submitting a key that was already
/// applied fails with [`WalletError::DuplicateTransaction`] and moves nothing,
/// so callers may retry freely and treat that error as success.
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    /// Debit `amount` from the user's balance, returning the new balance
    async fn withdraw(
        &self,
        user_id: i64,
        amount: i64,
        idempotency_key: &str,
        entry_type: EntryType,
    ) -> WalletResult<i64>;

    /// Credit `amount` to the user's balance, returning the new balance
    async fn credit(
        &self,
        user_id: i64,
        amount: i64,
        idempotency_key: &str,
        entry_type: EntryType,
    ) -> WalletResult<i64>;
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<i64, i64>,
    applied_keys: HashSet<String>,
    entries: Vec<WalletEntry>,
}

impl LedgerState {
    fn record(
        &mut self,
        user_id: i64,
        amount: i64,
        balance_after: i64,
        direction: EntryDirection,
        entry_type: EntryType,
        idempotency_key: &str,
    ) {
        self.applied_keys.insert(idempotency_key.to_string());
        let id = self.entries.len() as i64 + 1;
        self.entries.push(WalletEntry {
            id,
            user_id,
            amount,
            balance_after,
            direction,
            entry_type,
            idempotency_key: idempotency_key.to_string(),
            created_at: Utc::now(),
        });
    }
}

/// Ledger kept in process memory
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or overwrite) a wallet with a starting balance
    pub async fn open_wallet(&self, user_id: i64, balance: i64) {
        self.state.lock().await.balances.insert(user_id, balance);
    }

    /// Current balance, if the wallet exists
    pub async fn balance(&self, user_id: i64) -> Option<i64> {
        self.state.lock().await.balances.get(&user_id).copied()
    }

    /// Entries for a user, oldest first
    pub async fn entries(&self, user_id: i64) -> Vec<WalletEntry> {
        self.state
            .lock()
            .await
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Sum of every balance; movements only ever shift value between users and
    /// the tournament pool, so tests use this to check conservation.
    pub async fn total_balance(&self) -> i64 {
        self.state.lock().await.balances.values().sum()
    }
}

#[async_trait]
impl BalanceLedger for InMemoryLedger {
    async fn withdraw(
        &self,
        user_id: i64,
        amount: i64,
        idempotency_key: &str,
        entry_type: EntryType,
    ) -> WalletResult<i64> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        let mut state = self.state.lock().await;
        if state.applied_keys.contains(idempotency_key) {
            return Err(WalletError::DuplicateTransaction(idempotency_key.to_string()));
        }

        let balance = state
            .balances
            .get_mut(&user_id)
            .ok_or(WalletError::WalletNotFound(user_id))?;
        if *balance < amount {
            return Err(WalletError::InsufficientBalance {
                user_id,
                available: *balance,
                required: amount,
            });
        }
        *balance -= amount;
        let new_balance = *balance;

        state.record(
            user_id,
            -amount,
            new_balance,
            EntryDirection::Debit,
            entry_type,
            idempotency_key,
        );
        Ok(new_balance)
    }

    async fn credit(
        &self,
        user_id: i64,
        amount: i64,
        idempotency_key: &str,
        entry_type: EntryType,
    ) -> WalletResult<i64> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        let mut state = self.state.lock().await;
        if state.applied_keys.contains(idempotency_key) {
            return Err(WalletError::DuplicateTransaction(idempotency_key.to_string()));
        }

        let balance = state.balances.entry(user_id).or_insert(0);
        let new_balance = balance
            .checked_add(amount)
            .ok_or(WalletError::BalanceOverflow)?;
        *balance = new_balance;

        state.record(
            user_id,
            amount,
            new_balance,
            EntryDirection::Credit,
            entry_type,
            idempotency_key,
        );
        Ok(new_balance)
    }
}
