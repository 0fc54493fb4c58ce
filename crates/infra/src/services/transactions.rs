//! The transaction ledger: transfers between accounts and recency queries.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use piggybank_banking::{
    filter_and_limit_transactions, BalanceChange, Currency, CurrencyConverter, NewTransaction,
    Transaction,
};
use piggybank_core::{AccountId, Entity};

use super::ServiceError;
use crate::store::{AccountDirectory, TransactionStore, TransferStore};

/// Input of the transfer workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTransaction {
    pub sender_account_id: AccountId,
    pub receiver_account_id: AccountId,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
}

#[derive(Clone)]
pub struct TransactionService {
    accounts: Arc<dyn AccountDirectory>,
    transactions: Arc<dyn TransactionStore>,
    transfers: Arc<dyn TransferStore>,
    converter: Arc<dyn CurrencyConverter>,
}

impl TransactionService {
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        transactions: Arc<dyn TransactionStore>,
        transfers: Arc<dyn TransferStore>,
        converter: Arc<dyn CurrencyConverter>,
    ) -> Self {
        Self {
            accounts,
            transactions,
            transfers,
            converter,
        }
    }

    /// Most recent transactions involving `account_id`, at most `limit`.
    ///
    /// A `limit` of zero or less yields an empty list.
    #[instrument(skip(self), err)]
    pub async fn get_transactions(
        &self,
        limit: i64,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, ServiceError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let all = self.transactions.find_all().await?;
        Ok(self.filter_and_limit_transactions(&all, account_id, limit))
    }

    /// Same filter/sort/limit as [`Self::get_transactions`] over an already
    /// fetched list.
    pub fn filter_and_limit_transactions(
        &self,
        transactions: &[Transaction],
        account_id: AccountId,
        limit: usize,
    ) -> Vec<Transaction> {
        filter_and_limit_transactions(transactions, account_id, limit)
    }

    /// Transfer workflow.
    ///
    /// Both accounts must exist; the amount is converted to the reference
    /// currency and that converted amount is what gets posted and recorded.
    ///
    /// Posting convention: the **sender is credited** and the **receiver is
    /// debited**. This is the established behaviour of this ledger and is kept
    /// on purpose even though it reads inverted for a "sender pays" model.
    ///
    /// Both postings and the ledger insert go through
    /// [`TransferStore::apply_transfer`] as one atomic unit.
    #[instrument(
        skip(self, request),
        fields(
            sender = %request.sender_account_id,
            receiver = %request.receiver_account_id,
            currency = %request.currency
        ),
        err
    )]
    pub async fn create_transaction(
        &self,
        request: CreateTransaction,
    ) -> Result<Transaction, ServiceError> {
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::Validation(
                "transaction amount must be positive".to_string(),
            ));
        }

        let sender = self.require_account(request.sender_account_id).await?;
        let receiver = self.require_account(request.receiver_account_id).await?;

        let amount = self.converter.convert(request.currency, request.amount)?;

        let postings = [
            BalanceChange::credit(sender, amount)?,
            BalanceChange::debit(receiver, amount)?,
        ];
        let record = NewTransaction::new(
            sender,
            receiver,
            amount,
            request.currency,
            request.description,
            Utc::now(),
        )?;

        let transaction = self.transfers.apply_transfer(postings, record).await?;

        info!(
            transaction_id = %transaction.id,
            amount = %transaction.amount,
            "transaction created"
        );
        Ok(transaction)
    }

    async fn require_account(&self, id: AccountId) -> Result<AccountId, ServiceError> {
        match self.accounts.find(id).await? {
            Some(account) => Ok(account.id()),
            None => Err(ServiceError::NotFound(format!("account {id}"))),
        }
    }
}
