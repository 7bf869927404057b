//! Wallet module providing the balance ledger tournaments charge and pay through.
//!
//! This module implements:
//! - The [`BalanceLedger`] trait: idempotent withdraw and credit
//! - A Postgres ledger with one entry row per movement
//! - An in-memory ledger for development and tests
//!
//! ## Example
//!
//! ```
//! use guild_tournaments::wallet::{BalanceLedger, EntryType, InMemoryLedger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ledger = InMemoryLedger::new();
//!     ledger.open_wallet(1, 1000).await;
//!
//!     let balance = ledger
//!         .withdraw(1, 100, "tournament:entry:1", EntryType::EntryFee)
//!         .await?;
//!     assert_eq!(balance, 900);
//!
//!     // Replaying the key is rejected and moves nothing
//!     let replay = ledger
//!         .withdraw(1, 100, "tournament:entry:1", EntryType::EntryFee)
//!         .await;
//!     assert!(replay.is_err());
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod ledger;
pub mod manager;
pub mod models;

pub use errors::{WalletError, WalletResult};
pub use ledger::{BalanceLedger, InMemoryLedger};
pub use manager::WalletManager;
pub use models::{EntryDirection, EntryType, Wallet, WalletEntry};
