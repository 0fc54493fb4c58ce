//! Collaborator contracts for account and transaction persistence.
//!
//! Services only talk to these traits, so the same workflow runs against the
//! in-memory store (tests/dev) and Postgres (production).

use async_trait::async_trait;
use thiserror::Error;

use piggybank_banking::{Account, BalanceChange, NewTransaction, Transaction};
use piggybank_core::{AccountId, DomainError, UserId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryBankStore;
pub use postgres::PostgresBankStore;

/// Store operation error.
///
/// Infrastructure failures (storage, concurrency). Domain rejections raised
/// while applying a change inside the store are carried in `Domain`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("rejected by domain rules: {0}")]
    Domain(#[from] DomainError),

    #[error("concurrent modification: {0}")]
    Concurrency(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn account_not_found(id: AccountId) -> Self {
        Self::NotFound(format!("account {id}"))
    }
}

/// Lookup and mutation of accounts.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Accounts owned by `user_id`, ordered by account id.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Account>, StoreError>;

    /// Apply one directed balance change and return the updated account.
    ///
    /// Fails with `NotFound` when the account does not exist.
    async fn update_balance(&self, change: BalanceChange) -> Result<Account, StoreError>;

    async fn rename(&self, id: AccountId, name: &str) -> Result<Account, StoreError>;
}

/// The append-only ledger of transactions.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Transaction>, StoreError>;

    async fn save(&self, transaction: NewTransaction) -> Result<Transaction, StoreError>;
}

/// Atomic "post both sides and record" unit for transfers.
///
/// Implementations must apply every posting and insert the record together:
/// either all of it is visible afterwards or none of it is. Concurrent
/// transfers touching the same account must serialize.
#[async_trait]
pub trait TransferStore: Send + Sync {
    async fn apply_transfer(
        &self,
        postings: [BalanceChange; 2],
        record: NewTransaction,
    ) -> Result<Transaction, StoreError>;
}
