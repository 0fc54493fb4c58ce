use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;

use piggybank_banking::{Account, BalanceChange, NewTransaction, Transaction};
use piggybank_core::{AccountId, Entity, TransactionId, UserId};

use super::{AccountDirectory, StoreError, TransactionStore, TransferStore};

#[derive(Debug, Default)]
struct State {
    accounts: BTreeMap<AccountId, Account>,
    transactions: Vec<Transaction>,
    last_account_id: i64,
    last_transaction_id: i64,
}

/// In-memory accounts + ledger.
///
/// Intended for tests/dev. One lock guards both accounts and transactions, so
/// a transfer holds it across both postings and the insert.
#[derive(Debug, Default)]
pub struct InMemoryBankStore {
    state: RwLock<State>,
}

impl InMemoryBankStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with three users and a handful of accounts.
    pub fn with_demo_data() -> Self {
        let mut state = State::default();
        for (user, name, balance) in [
            (1, "Savings", 1000),
            (1, "Checking", 500),
            (2, "Sara Ravestein", 750),
            (3, "Holiday fund", 250),
        ] {
            state.open_account(UserId::new(user), name, Decimal::from(balance));
        }
        Self {
            state: RwLock::new(state),
        }
    }

    /// Create an account with the next id. Accounts are otherwise managed
    /// outside this service; this is how tests get them.
    pub fn insert_account(
        &self,
        user_id: UserId,
        name: impl Into<String>,
        balance: Decimal,
    ) -> Result<Account, StoreError> {
        Ok(self.write()?.open_account(user_id, name, balance))
    }

    /// Insert an already-built transaction (keeps its id and timestamp).
    pub fn insert_transaction(&self, transaction: Transaction) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.last_transaction_id = state.last_transaction_id.max(transaction.id.get());
        state.transactions.push(transaction);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

impl State {
    fn open_account(&mut self, user_id: UserId, name: impl Into<String>, balance: Decimal) -> Account {
        self.last_account_id += 1;
        let account = Account::new(AccountId::new(self.last_account_id), user_id, name, balance);
        self.accounts.insert(account.id(), account.clone());
        account
    }

    fn append(&mut self, record: NewTransaction) -> Transaction {
        self.last_transaction_id += 1;
        let transaction = record.into_transaction(TransactionId::new(self.last_transaction_id));
        self.transactions.push(transaction.clone());
        transaction
    }

    fn posted(&self, change: &BalanceChange) -> Result<Account, StoreError> {
        let mut account = self
            .accounts
            .get(&change.account_id)
            .cloned()
            .ok_or_else(|| StoreError::account_not_found(change.account_id))?;
        account.apply(change.amount, change.direction)?;
        Ok(account)
    }
}

#[async_trait]
impl AccountDirectory for InMemoryBankStore {
    async fn find(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Account>, StoreError> {
        Ok(self
            .read()?
            .accounts
            .values()
            .filter(|a| a.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn update_balance(&self, change: BalanceChange) -> Result<Account, StoreError> {
        let mut state = self.write()?;
        let updated = state.posted(&change)?;
        state.accounts.insert(updated.id(), updated.clone());
        Ok(updated)
    }

    async fn rename(&self, id: AccountId, name: &str) -> Result<Account, StoreError> {
        let mut state = self.write()?;
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::account_not_found(id))?;
        account.rename(name)?;
        Ok(account.clone())
    }
}

#[async_trait]
impl TransactionStore for InMemoryBankStore {
    async fn find_all(&self) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.read()?.transactions.clone())
    }

    async fn save(&self, transaction: NewTransaction) -> Result<Transaction, StoreError> {
        Ok(self.write()?.append(transaction))
    }
}

#[async_trait]
impl TransferStore for InMemoryBankStore {
    async fn apply_transfer(
        &self,
        postings: [BalanceChange; 2],
        record: NewTransaction,
    ) -> Result<Transaction, StoreError> {
        let mut state = self.write()?;

        // Compute both sides before touching state; any failure leaves it as is.
        let first = state.posted(&postings[0])?;
        let mut second = state.posted(&postings[1])?;
        if first.id() == second.id() {
            second.apply(postings[0].amount, postings[0].direction)?;
        } else {
            state.accounts.insert(first.id(), first);
        }
        state.accounts.insert(second.id(), second);

        Ok(state.append(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use piggybank_banking::Currency;

    fn record(from: AccountId, to: AccountId, amount: i64) -> NewTransaction {
        NewTransaction::new(from, to, Decimal::from(amount), Currency::EUR, "test", Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn assigns_sequential_ids() {
        let store = InMemoryBankStore::new();
        let a = store.insert_account(UserId::new(1), "A", Decimal::ZERO).unwrap();
        let b = store.insert_account(UserId::new(1), "B", Decimal::ZERO).unwrap();
        assert_eq!(a.id(), AccountId::new(1));
        assert_eq!(b.id(), AccountId::new(2));

        let t1 = store.save(record(a.id(), b.id(), 5)).await.unwrap();
        let t2 = store.save(record(b.id(), a.id(), 5)).await.unwrap();
        assert_eq!(t1.id, TransactionId::new(1));
        assert_eq!(t2.id, TransactionId::new(2));
    }

    #[tokio::test]
    async fn find_by_user_only_returns_owned_accounts() {
        let store = InMemoryBankStore::with_demo_data();
        let accounts = store.find_by_user(UserId::new(1)).await.unwrap();
        let names: Vec<_> = accounts.iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["Savings", "Checking"]);

        assert!(store.find_by_user(UserId::new(42)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn demo_data_continues_the_id_sequence() {
        let store = InMemoryBankStore::with_demo_data();
        let holiday = store.find(AccountId::new(4)).await.unwrap().unwrap();
        assert_eq!(holiday.name(), "Holiday fund");
        assert_eq!(holiday.balance(), Decimal::from(250));

        let next = store.insert_account(UserId::new(3), "Travel", Decimal::ZERO).unwrap();
        assert_eq!(next.id(), AccountId::new(5));
    }

    #[tokio::test]
    async fn update_balance_on_missing_account_is_not_found() {
        let store = InMemoryBankStore::new();
        let change = BalanceChange::credit(AccountId::new(9), Decimal::ONE).unwrap();
        let err = store.update_balance(change).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_transfer_leaves_state_untouched() {
        let store = InMemoryBankStore::new();
        let a = store.insert_account(UserId::new(1), "A", Decimal::from(10)).unwrap();
        let b = store.insert_account(UserId::new(2), "B", Decimal::MAX).unwrap();

        // Second posting overflows; the first must not be applied either.
        let postings = [
            BalanceChange::debit(a.id(), Decimal::from(5)).unwrap(),
            BalanceChange::credit(b.id(), Decimal::from(5)).unwrap(),
        ];
        let err = store
            .apply_transfer(postings, record(a.id(), b.id(), 5))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(_)));

        let a_after = store.find(a.id()).await.unwrap().unwrap();
        assert_eq!(a_after.balance(), Decimal::from(10));
        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rename_rejects_blank_name() {
        let store = InMemoryBankStore::with_demo_data();
        let err = store.rename(AccountId::new(1), "  ").await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(_)));
        let account = store.find(AccountId::new(1)).await.unwrap().unwrap();
        assert_eq!(account.name(), "Savings");
    }
}
