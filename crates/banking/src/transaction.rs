use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use piggybank_core::{AccountId, DomainError, DomainResult, TransactionId};

use crate::currency::{fits_money_scale, Currency};

/// A persisted transfer between two accounts (immutable).
///
/// The transaction references its accounts by id; it does not own them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub sender_account_id: AccountId,
    pub receiver_account_id: AccountId,
    /// Amount in the reference currency.
    pub amount: Decimal,
    /// Currency the transfer was requested in.
    pub currency: Currency,
    pub description: String,
    pub date_time: DateTime<Utc>,
}

impl Transaction {
    /// True when `account_id` is the sender or the receiver.
    pub fn involves(&self, account_id: AccountId) -> bool {
        self.sender_account_id == account_id || self.receiver_account_id == account_id
    }
}

/// A transaction that has not been assigned an id by the store yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub sender_account_id: AccountId,
    pub receiver_account_id: AccountId,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    pub date_time: DateTime<Utc>,
}

impl NewTransaction {
    pub fn new(
        sender_account_id: AccountId,
        receiver_account_id: AccountId,
        amount: Decimal,
        currency: Currency,
        description: impl Into<String>,
        date_time: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::validation("transaction amount must be positive"));
        }
        if !fits_money_scale(amount) {
            return Err(DomainError::validation("transaction amount has more than two decimal places"));
        }
        if sender_account_id == receiver_account_id {
            return Err(DomainError::validation("sender and receiver must be different accounts"));
        }

        Ok(Self {
            sender_account_id,
            receiver_account_id,
            amount,
            currency,
            description: description.into(),
            date_time,
        })
    }

    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            sender_account_id: self.sender_account_id,
            receiver_account_id: self.receiver_account_id,
            amount: self.amount,
            currency: self.currency,
            description: self.description,
            date_time: self.date_time,
        }
    }
}

/// Keep the transactions involving `account_id`, most recent first, at most `limit`.
///
/// The sort is stable: transactions with equal timestamps keep their input order.
pub fn filter_and_limit_transactions(
    transactions: &[Transaction],
    account_id: AccountId,
    limit: usize,
) -> Vec<Transaction> {
    if limit == 0 {
        return Vec::new();
    }

    let mut matching: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.involves(account_id))
        .cloned()
        .collect();

    matching.sort_by(|a, b| b.date_time.cmp(&a.date_time));
    matching.truncate(limit);
    matching
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn tx(id: i64, from: i64, to: i64, at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: TransactionId::new(id),
            sender_account_id: AccountId::new(from),
            receiver_account_id: AccountId::new(to),
            amount: Decimal::from(10),
            currency: Currency::EUR,
            description: format!("tx {id}"),
            date_time: at,
        }
    }

    #[test]
    fn most_recent_matching_transaction_comes_first() {
        let now = Utc::now();
        let t1 = tx(1, 1, 2, now);
        let t2 = tx(2, 2, 1, now - Duration::seconds(60));

        let result = filter_and_limit_transactions(&[t2.clone(), t1.clone()], AccountId::new(1), 1);
        assert_eq!(result, vec![t1]);
    }

    #[test]
    fn unrelated_transactions_are_dropped() {
        let now = Utc::now();
        let mine = tx(1, 1, 2, now);
        let other = tx(2, 3, 4, now + Duration::seconds(5));

        let result = filter_and_limit_transactions(&[mine.clone(), other], AccountId::new(1), 10);
        assert_eq!(result, vec![mine]);
    }

    #[test]
    fn zero_limit_yields_nothing() {
        let now = Utc::now();
        let all = vec![tx(1, 1, 2, now), tx(2, 2, 1, now)];
        assert!(filter_and_limit_transactions(&all, AccountId::new(1), 0).is_empty());
    }

    #[test]
    fn equal_timestamps_keep_input_order() {
        let now = Utc::now();
        let a = tx(1, 1, 2, now);
        let b = tx(2, 2, 1, now);
        let result = filter_and_limit_transactions(&[a.clone(), b.clone()], AccountId::new(1), 5);
        assert_eq!(result, vec![a, b]);
    }

    #[test]
    fn new_transaction_requires_positive_amount() {
        let err = NewTransaction::new(
            AccountId::new(1),
            AccountId::new(2),
            Decimal::from(-100),
            Currency::EUR,
            "refund",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        assert!(NewTransaction::new(
            AccountId::new(1),
            AccountId::new(2),
            Decimal::ZERO,
            Currency::EUR,
            "nothing",
            Utc::now(),
        )
        .is_err());
    }

    #[test]
    fn new_transaction_rejects_self_transfer() {
        let err = NewTransaction::new(
            AccountId::new(3),
            AccountId::new(3),
            Decimal::ONE,
            Currency::EUR,
            "loop",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn new_transaction_rejects_sub_cent_amount() {
        let err = NewTransaction::new(
            AccountId::new(1),
            AccountId::new(2),
            Decimal::new(10_005, 3),
            Currency::EUR,
            "fraction",
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    fn arb_transactions() -> impl Strategy<Value = Vec<Transaction>> {
        let base = Utc::now();
        prop::collection::vec((1i64..5, 1i64..5, 0i64..10_000), 0..40).prop_map(move |rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (from, to, offset))| {
                    tx(i as i64 + 1, from, to, base - Duration::seconds(offset))
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: only matching transactions, descending by time, min(n, |filtered|) long.
        #[test]
        fn filter_sort_limit_contract(
            transactions in arb_transactions(),
            account in 1i64..5,
            limit in 0usize..50,
        ) {
            let account_id = AccountId::new(account);
            let result = filter_and_limit_transactions(&transactions, account_id, limit);

            let filtered = transactions.iter().filter(|t| t.involves(account_id)).count();
            prop_assert_eq!(result.len(), limit.min(filtered));
            prop_assert!(result.iter().all(|t| t.involves(account_id)));
            prop_assert!(result.windows(2).all(|w| w[0].date_time >= w[1].date_time));
        }

        /// Property: the query is a pure function of its inputs.
        #[test]
        fn filter_is_idempotent(
            transactions in arb_transactions(),
            account in 1i64..5,
            limit in 0usize..50,
        ) {
            let account_id = AccountId::new(account);
            let first = filter_and_limit_transactions(&transactions, account_id, limit);
            let second = filter_and_limit_transactions(&transactions, account_id, limit);
            prop_assert_eq!(first, second);
        }
    }
}
