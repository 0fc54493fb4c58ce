use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, instrument};

use piggybank_banking::{Account, BalanceChange, Direction};
use piggybank_core::{AccountId, UserId};

use super::ServiceError;
use crate::store::AccountDirectory;

/// Account retrieval, rename and directed balance changes.
#[derive(Clone)]
pub struct AccountService {
    directory: Arc<dyn AccountDirectory>,
}

impl AccountService {
    pub fn new(directory: Arc<dyn AccountDirectory>) -> Self {
        Self { directory }
    }

    /// `None` when no account has this id.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>, ServiceError> {
        Ok(self.directory.find(id).await?)
    }

    pub async fn get_accounts_by_user_id(&self, user_id: UserId) -> Result<Vec<Account>, ServiceError> {
        Ok(self.directory.find_by_user(user_id).await?)
    }

    /// Credit adds `amount`, Debit subtracts it. No overdraft check.
    #[instrument(skip(self), err)]
    pub async fn update_balance(
        &self,
        account_id: AccountId,
        amount: Decimal,
        direction: Direction,
    ) -> Result<Account, ServiceError> {
        let change = BalanceChange::new(account_id, amount, direction)?;
        let account = self.directory.update_balance(change).await?;
        debug!(balance = %account.balance(), "balance updated");
        Ok(account)
    }

    #[instrument(skip(self), err)]
    pub async fn update_account_name(
        &self,
        account_id: AccountId,
        name: &str,
    ) -> Result<Account, ServiceError> {
        let name = piggybank_banking::validate_account_name(name)?;
        Ok(self.directory.rename(account_id, &name).await?)
    }
}
