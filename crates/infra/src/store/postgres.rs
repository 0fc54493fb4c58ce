//! Postgres-backed accounts + ledger.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (serialization failure / deadlock) | `40001` / `40P01` | `Concurrency` |
//! | Database (foreign key violation) | `23503` | `NotFound` |
//! | Database (numeric value out of range) | `22003` | `Domain(InvariantViolation)` |
//! | Database (other) | Any other | `Database` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` |
//! | Other | N/A | `Database` |
//!
//! ## Transfers
//!
//! `apply_transfer` runs in one SQL transaction: both account rows are locked
//! with `SELECT ... FOR UPDATE` in ascending id order, both balances are
//! updated, the transaction row is inserted, then the whole unit commits.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row};
use tracing::instrument;

use piggybank_banking::{Account, BalanceChange, Currency, NewTransaction, Transaction};
use piggybank_core::{AccountId, DomainError, TransactionId, UserId};

use super::{AccountDirectory, StoreError, TransactionStore, TransferStore};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Clone)]
pub struct PostgresBankStore {
    pool: Arc<PgPool>,
}

impl PostgresBankStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for PostgresBankStore {
    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn find(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT id, user_id, name, balance FROM accounts WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_account", e))?;

        row.as_ref().map(account_from_row).transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, user_id, name, balance FROM accounts WHERE user_id = $1 ORDER BY id ASC",
        )
        .bind(user_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_accounts_by_user", e))?;

        rows.iter().map(account_from_row).collect()
    }

    #[instrument(
        skip(self),
        fields(account_id = %change.account_id, direction = %change.direction),
        err
    )]
    async fn update_balance(&self, change: BalanceChange) -> Result<Account, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE accounts SET balance = balance + $2
            WHERE id = $1
            RETURNING id, user_id, name, balance
            "#,
        )
        .bind(change.account_id.get())
        .bind(change.signed_amount())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_balance", e))?;

        match row {
            Some(row) => account_from_row(&row),
            None => Err(StoreError::account_not_found(change.account_id)),
        }
    }

    #[instrument(skip(self, name), fields(account_id = %id), err)]
    async fn rename(&self, id: AccountId, name: &str) -> Result<Account, StoreError> {
        let name = piggybank_banking::validate_account_name(name)?;

        let row = sqlx::query(
            "UPDATE accounts SET name = $2 WHERE id = $1 RETURNING id, user_id, name, balance",
        )
        .bind(id.get())
        .bind(&name)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("rename_account", e))?;

        match row {
            Some(row) => account_from_row(&row),
            None => Err(StoreError::account_not_found(id)),
        }
    }
}

#[async_trait]
impl TransactionStore for PostgresBankStore {
    #[instrument(skip(self), err)]
    async fn find_all(&self) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, sender_account_id, receiver_account_id, amount, currency, description, date_time
            FROM transactions
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_all_transactions", e))?;

        rows.iter().map(transaction_from_row).collect()
    }

    #[instrument(skip(self, transaction), err)]
    async fn save(&self, transaction: NewTransaction) -> Result<Transaction, StoreError> {
        let id = insert_transaction(&*self.pool, &transaction).await?;
        Ok(transaction.into_transaction(id))
    }
}

#[async_trait]
impl TransferStore for PostgresBankStore {
    #[instrument(
        skip(self, postings, record),
        fields(
            sender = %record.sender_account_id,
            receiver = %record.receiver_account_id,
            amount = %record.amount
        ),
        err
    )]
    async fn apply_transfer(
        &self,
        postings: [BalanceChange; 2],
        record: NewTransaction,
    ) -> Result<Transaction, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Lock in ascending id order so two opposite transfers cannot deadlock.
        let mut lock_order: Vec<i64> = postings.iter().map(|p| p.account_id.get()).collect();
        lock_order.sort_unstable();
        lock_order.dedup();

        let locked = sqlx::query("SELECT id FROM accounts WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(lock_order.as_slice())
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_accounts", e))?;

        if locked.len() != lock_order.len() {
            let found: Vec<i64> = locked
                .iter()
                .map(|r| r.try_get::<i64, _>("id"))
                .collect::<Result<_, _>>()
                .map_err(|e| map_sqlx_error("lock_accounts", e))?;
            let missing = postings
                .iter()
                .map(|p| p.account_id)
                .find(|id| !found.contains(&id.get()))
                .unwrap_or(postings[0].account_id);
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::account_not_found(missing));
        }

        for posting in &postings {
            sqlx::query("UPDATE accounts SET balance = balance + $2 WHERE id = $1")
                .bind(posting.account_id.get())
                .bind(posting.signed_amount())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("post_balance_change", e))?;
        }

        let id = insert_transaction(&mut *tx, &record).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(record.into_transaction(id))
    }
}

async fn insert_transaction<'e, E>(executor: E, record: &NewTransaction) -> Result<TransactionId, StoreError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let row = sqlx::query(
        r#"
        INSERT INTO transactions (
            sender_account_id,
            receiver_account_id,
            amount,
            currency,
            description,
            date_time
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(record.sender_account_id.get())
    .bind(record.receiver_account_id.get())
    .bind(record.amount)
    .bind(record.currency.code())
    .bind(record.description.clone())
    .bind(record.date_time)
    .fetch_one(executor)
    .await
    .map_err(|e| map_sqlx_error("insert_transaction", e))?;

    let id: i64 = row
        .try_get("id")
        .map_err(|e| map_sqlx_error("insert_transaction", e))?;
    Ok(TransactionId::new(id))
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let read = |e: sqlx::Error| map_sqlx_error("read_account_row", e);
    let id: i64 = row.try_get("id").map_err(read)?;
    let user_id: i64 = row.try_get("user_id").map_err(read)?;
    let name: String = row.try_get("name").map_err(read)?;
    let balance: Decimal = row.try_get("balance").map_err(read)?;

    Ok(Account::new(AccountId::new(id), UserId::new(user_id), name, balance))
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction, StoreError> {
    let read = |e: sqlx::Error| map_sqlx_error("read_transaction_row", e);
    let currency: String = row.try_get("currency").map_err(read)?;
    let currency = Currency::from_str(&currency)
        .map_err(|e| StoreError::Database(format!("stored transaction has {e}")))?;
    let date_time: DateTime<Utc> = row.try_get("date_time").map_err(read)?;

    Ok(Transaction {
        id: TransactionId::new(row.try_get("id").map_err(read)?),
        sender_account_id: AccountId::new(row.try_get("sender_account_id").map_err(read)?),
        receiver_account_id: AccountId::new(row.try_get("receiver_account_id").map_err(read)?),
        amount: row.try_get("amount").map_err(read)?,
        currency,
        description: row.try_get("description").map_err(read)?,
        date_time,
    })
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            map_database_code(db_err.code().as_deref(), msg)
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{} in {}", err, operation))
        }
        _ => StoreError::Database(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn map_database_code(code: Option<&str>, msg: String) -> StoreError {
    match code {
        Some("40001") | Some("40P01") => StoreError::Concurrency(msg),
        Some("23503") => StoreError::NotFound(msg),
        // Balances live in NUMERIC(20, 2); leaving that range is an overflow.
        Some("22003") => StoreError::Domain(DomainError::invariant(msg)),
        _ => StoreError::Database(msg),
    }
}
