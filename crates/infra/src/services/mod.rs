//! Application services (request-level orchestration over the stores).
//!
//! Services receive their collaborators through the constructor as trait
//! objects and contain no IO of their own.

use thiserror::Error;

use piggybank_banking::ConversionError;
use piggybank_core::DomainError;

use crate::store::StoreError;

pub mod accounts;
pub mod transactions;

pub use accounts::AccountService;
pub use transactions::{CreateTransaction, TransactionService};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The referenced record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Request rejected by domain validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant would be broken (e.g. balance overflow).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Concurrent modification detected by the store.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The amount could not be converted to the reference currency.
    #[error("currency conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    /// The store failed to read or write.
    #[error("persistence failed: {0}")]
    Persistence(StoreError),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => ServiceError::NotFound(what),
            StoreError::Domain(e) => e.into(),
            StoreError::Concurrency(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Persistence(other),
        }
    }
}
