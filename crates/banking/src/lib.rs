//! Banking module (accounts, transfers, currency conversion).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod account;
pub mod currency;
pub mod transaction;

pub use account::{validate_account_name, Account, BalanceChange, Direction};
pub use currency::{ConversionError, Currency, CurrencyConverter, FixedRateConverter};
pub use transaction::{filter_and_limit_transactions, NewTransaction, Transaction};
