use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use piggybank_banking::{Account, Currency, Transaction};
use piggybank_core::{AccountId, Entity, TransactionId};

/// Transaction lists are cut to this many entries unless `limit` is given.
pub const DEFAULT_TRANSACTION_LIMIT: i64 = 10;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub account_id: AccountId,
    pub account_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub sender_account_id: AccountId,
    pub receiver_account_id: AccountId,
    pub amount: Decimal,
    /// Parsed by the handler so an unknown code maps to a conversion error.
    pub currency: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<i64>,
}

impl TransactionsQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT)
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: AccountId,
    pub name: String,
    pub balance: Decimal,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id(),
            name: account.name().to_string(),
            balance: account.balance(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountsResponse {
    pub accounts: Vec<AccountResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: TransactionId,
    pub sender_account_id: AccountId,
    pub receiver_account_id: AccountId,
    pub description: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub date_time: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            sender_account_id: t.sender_account_id,
            receiver_account_id: t.receiver_account_id,
            description: t.description,
            amount: t.amount,
            currency: t.currency,
            date_time: t.date_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<TransactionResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use piggybank_core::UserId;
    use serde_json::json;

    #[test]
    fn account_response_keeps_decimal_as_string() {
        let account = Account::new(AccountId::new(3), UserId::new(1), "Savings", Decimal::new(100050, 2));
        let value = serde_json::to_value(AccountResponse::from(&account)).unwrap();
        assert_eq!(value, json!({ "id": 3, "name": "Savings", "balance": "1000.50" }));
    }

    #[test]
    fn create_request_reads_camel_case_and_numeric_amounts() {
        let req: CreateTransactionRequest = serde_json::from_value(json!({
            "senderAccountId": 1,
            "receiverAccountId": 2,
            "amount": 90,
            "currency": "USD"
        }))
        .unwrap();
        assert_eq!(req.sender_account_id, AccountId::new(1));
        assert_eq!(req.amount, Decimal::from(90));
        assert!(req.description.is_empty());
    }

    #[test]
    fn missing_limit_uses_default() {
        assert_eq!(TransactionsQuery { limit: None }.limit(), DEFAULT_TRANSACTION_LIMIT);
        assert_eq!(TransactionsQuery { limit: Some(0) }.limit(), 0);
    }
}
