//! Infrastructure layer: collaborator contracts, stores, application services.

pub mod services;
pub mod store;

pub use services::{AccountService, CreateTransaction, ServiceError, TransactionService};
pub use store::{
    AccountDirectory, InMemoryBankStore, PostgresBankStore, StoreError, TransactionStore,
    TransferStore,
};
