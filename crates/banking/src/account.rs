use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use piggybank_core::{AccountId, DomainError, DomainResult, Entity, UserId};

use crate::currency::fits_money_scale;

/// How a balance change is applied to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    /// Increases the balance.
    Credit,
    /// Decreases the balance.
    Debit,
}

impl Direction {
    /// Apply `amount` to `balance` in this direction.
    ///
    /// `amount` must be non-negative; no floor at zero is enforced.
    pub fn apply(self, balance: Decimal, amount: Decimal) -> DomainResult<Decimal> {
        if amount < Decimal::ZERO {
            return Err(DomainError::validation("balance change amount must not be negative"));
        }

        let next = match self {
            Direction::Credit => balance.checked_add(amount),
            Direction::Debit => balance.checked_sub(amount),
        };

        next.ok_or_else(|| DomainError::invariant("balance arithmetic overflow"))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Credit => "CREDIT",
            Direction::Debit => "DEBIT",
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed balance change against one account (one side of a transfer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChange {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub direction: Direction,
}

impl BalanceChange {
    /// `amount` must be non-negative and carry at most cents precision.
    pub fn new(account_id: AccountId, amount: Decimal, direction: Direction) -> DomainResult<Self> {
        if amount < Decimal::ZERO {
            return Err(DomainError::validation("balance change amount must not be negative"));
        }
        if !fits_money_scale(amount) {
            return Err(DomainError::validation(format!(
                "balance change amount {amount} has more than two decimal places"
            )));
        }
        Ok(Self {
            account_id,
            amount,
            direction,
        })
    }

    pub fn credit(account_id: AccountId, amount: Decimal) -> DomainResult<Self> {
        Self::new(account_id, amount, Direction::Credit)
    }

    pub fn debit(account_id: AccountId, amount: Decimal) -> DomainResult<Self> {
        Self::new(account_id, amount, Direction::Debit)
    }

    /// Amount with the direction folded into the sign (credit positive).
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::Credit => self.amount,
            Direction::Debit => -self.amount,
        }
    }
}

/// A user's account.
///
/// The balance only moves through [`Account::apply`]; the name is a free
/// display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    user_id: UserId,
    name: String,
    balance: Decimal,
}

impl Account {
    pub fn new(id: AccountId, user_id: UserId, name: impl Into<String>, balance: Decimal) -> Self {
        Self {
            id,
            user_id,
            name: name.into(),
            balance,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Apply a directed balance change. On error the balance is unchanged.
    pub fn apply(&mut self, amount: Decimal, direction: Direction) -> DomainResult<()> {
        self.balance = direction.apply(self.balance, amount)?;
        Ok(())
    }

    pub fn rename(&mut self, name: &str) -> DomainResult<()> {
        self.name = validate_account_name(name)?;
        Ok(())
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Trim and validate a display name for an account.
pub fn validate_account_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("account name must not be empty"));
    }
    Ok(trimmed.to_string())
}
