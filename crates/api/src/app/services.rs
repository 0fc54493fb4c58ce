use std::sync::Arc;

use anyhow::Context;

use piggybank_banking::{CurrencyConverter, FixedRateConverter};
use piggybank_infra::{
    AccountDirectory, AccountService, InMemoryBankStore, PostgresBankStore, TransactionService,
    TransactionStore, TransferStore,
};

use crate::config::AppConfig;

/// Services shared by all handlers.
#[derive(Clone)]
pub struct AppServices {
    pub accounts: AccountService,
    pub transactions: TransactionService,
}

impl AppServices {
    /// Wire both services over one store that backs accounts, ledger and transfers.
    pub fn over_store<S>(store: Arc<S>, converter: Arc<dyn CurrencyConverter>) -> Self
    where
        S: AccountDirectory + TransactionStore + TransferStore + 'static,
    {
        let accounts = AccountService::new(store.clone());
        let transactions = TransactionService::new(store.clone(), store.clone(), store, converter);
        Self {
            accounts,
            transactions,
        }
    }
}

/// Build services from configuration.
///
/// In-memory unless `USE_PERSISTENT_STORES=true`, in which case the Postgres
/// store is connected and its schema applied.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let converter: Arc<dyn CurrencyConverter> = Arc::new(FixedRateConverter::standard());

    if config.use_persistent_stores {
        return build_persistent_services(config, converter).await;
    }

    Ok(build_in_memory_services(config.seed_demo_data, converter))
}

fn build_in_memory_services(seed: bool, converter: Arc<dyn CurrencyConverter>) -> AppServices {
    let store = if seed {
        tracing::info!("using in-memory store with demo data");
        InMemoryBankStore::with_demo_data()
    } else {
        tracing::info!("using empty in-memory store");
        InMemoryBankStore::new()
    };
    AppServices::over_store(Arc::new(store), converter)
}

async fn build_persistent_services(
    config: &AppConfig,
    converter: Arc<dyn CurrencyConverter>,
) -> anyhow::Result<AppServices> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;

    let store = PostgresBankStore::connect(database_url, config.max_connections)
        .await
        .context("failed to connect to Postgres")?;
    store.migrate().await.context("failed to apply schema")?;

    tracing::info!("using Postgres store");
    Ok(AppServices::over_store(Arc::new(store), converter))
}
