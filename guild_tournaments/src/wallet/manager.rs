//! Postgres-backed wallet ledger.
#![allow(clippy::needless_raw_string_hashes)]

use super::{
    errors::{WalletError, WalletResult},
    ledger::BalanceLedger,
    models::{EntryDirection, EntryType, Wallet, WalletEntry},
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;

/// Wallet manager
#[derive(Clone)]
pub struct WalletManager {
    pool: Arc<PgPool>,
}

impl WalletManager {
    /// Create a new wallet manager
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Get wallet balance for a user
    ///
    /// # Errors
    ///
    /// * `WalletError::WalletNotFound` - User has no wallet
    pub async fn get_wallet(&self, user_id: i64) -> WalletResult<Wallet> {
        let row = sqlx::query(
            r#"
            SELECT user_id, balance, created_at, updated_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(WalletError::WalletNotFound(user_id))?;

        Ok(Wallet {
            user_id: row.get("user_id"),
            balance: row.get("balance"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
        })
    }

    /// Get wallet entries for a user, newest first
    pub async fn get_entries(&self, user_id: i64, limit: i64) -> WalletResult<Vec<WalletEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, amount, balance_after, direction, entry_type, idempotency_key, created_at
            FROM wallet_entries
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        let entries = rows
            .into_iter()
            .map(|row| WalletEntry {
                id: row.get("id"),
                user_id: row.get("user_id"),
                amount: row.get("amount"),
                balance_after: row.get("balance_after"),
                direction: match row.get::<String, _>("direction").as_str() {
                    "debit" => EntryDirection::Debit,
                    _ => EntryDirection::Credit,
                },
                entry_type: EntryType::parse(&row.get::<String, _>("entry_type"))
                    .unwrap_or(EntryType::Refund),
                idempotency_key: row.get("idempotency_key"),
                created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            })
            .collect();

        Ok(entries)
    }

    /// Fail with `DuplicateTransaction` if the key was already applied
    async fn check_idempotency(
        tx: &mut Transaction<'_, Postgres>,
        idempotency_key: &str,
    ) -> WalletResult<()> {
        let existing = sqlx::query("SELECT id FROM wallet_entries WHERE idempotency_key = $1")
            .bind(idempotency_key)
            .fetch_optional(&mut **tx)
            .await?;

        if existing.is_some() {
            return Err(WalletError::DuplicateTransaction(idempotency_key.to_string()));
        }
        Ok(())
    }

    /// Create a wallet entry
    async fn create_entry(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        amount: i64,
        balance_after: i64,
        direction: EntryDirection,
        entry_type: EntryType,
        idempotency_key: &str,
    ) -> WalletResult<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO wallet_entries (user_id, amount, balance_after, direction, entry_type, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(balance_after)
        .bind(direction.to_string())
        .bind(entry_type.to_string())
        .bind(idempotency_key)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| match e {
            // A concurrent transaction applied the same key first
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                WalletError::DuplicateTransaction(idempotency_key.to_string())
            }
            other => WalletError::Database(other),
        })?;

        Ok(row.get("id"))
    }
}

#[async_trait]
impl BalanceLedger for WalletManager {
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

        let mut tx = self.pool.begin().await?;
        Self::check_idempotency(&mut tx, idempotency_key).await?;

        // Check and debit in one statement so concurrent withdrawals cannot overdraw
        let wallet_result = sqlx::query(
            "UPDATE wallets
             SET balance = balance - $1, updated_at = NOW()
             WHERE user_id = $2 AND balance >= $1
             RETURNING balance",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let new_balance: i64 = match wallet_result {
            Some(row) => row.get("balance"),
            None => {
                let check_wallet = sqlx::query("SELECT balance FROM wallets WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;

                return match check_wallet {
                    Some(row) => Err(WalletError::InsufficientBalance {
                        user_id,
                        available: row.get("balance"),
                        required: amount,
                    }),
                    None => Err(WalletError::WalletNotFound(user_id)),
                };
            }
        };

        Self::create_entry(
            &mut tx,
            user_id,
            -amount,
            new_balance,
            EntryDirection::Debit,
            entry_type,
            idempotency_key,
        )
        .await?;

        tx.commit().await?;

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

        let mut tx = self.pool.begin().await?;
        Self::check_idempotency(&mut tx, idempotency_key).await?;

        // Insert or add in one statement; the returned balance includes any
        // credit that committed first
        let new_balance: i64 = sqlx::query(
            "INSERT INTO wallets (user_id, balance, updated_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT (user_id)
             DO UPDATE SET
                balance = wallets.balance + EXCLUDED.balance,
                updated_at = NOW()
             RETURNING balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            // numeric_value_out_of_range
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some("22003") => {
                WalletError::BalanceOverflow
            }
            other => WalletError::Database(other),
        })?
        .get("balance");

        Self::create_entry(
            &mut tx,
            user_id,
            amount,
            new_balance,
            EntryDirection::Credit,
            entry_type,
            idempotency_key,
        )
        .await?;

        tx.commit().await?;

        Ok(new_balance)
    }
}
