use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use fcb_auth::Hs256JwtValidator;
use fcb_infra::config::{AppConfig, StoreConfig};
use fcb_infra::{
    AccountService, ApprovalWorkflow, BackOffice, BankStore, InMemoryBankStore, PostgresBankStore,
    SessionService, TransferEngine, seed,
};

/// Everything the handlers need, built once at startup and shared through an
/// `Extension`.
#[derive(Clone)]
pub struct AppServices {
    pub accounts: AccountService,
    pub engine: TransferEngine,
    pub approvals: ApprovalWorkflow,
    pub back_office: BackOffice,
    pub sessions: SessionService,
}

impl AppServices {
    /// Wire every service onto one store.
    pub fn new(store: Arc<dyn BankStore>, config: &AppConfig) -> Self {
        let tokens = Arc::new(Hs256JwtValidator::new(
            config.jwt_secret.clone().into_bytes(),
            config.session_ttl,
        ));
        Self {
            accounts: AccountService::new(store.clone()),
            engine: TransferEngine::new(store.clone()),
            approvals: ApprovalWorkflow::new(store.clone(), config.routing_number.clone()),
            back_office: BackOffice::new(store.clone(), config.routing_number.clone()),
            sessions: SessionService::new(store, tokens),
        }
    }
}

/// Open the configured store, bootstrap the admin and (optionally) the demo
/// customer.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store: Arc<dyn BankStore> = match &config.store {
        StoreConfig::InMemory => {
            info!("using in-memory store");
            Arc::new(InMemoryBankStore::new())
        }
        StoreConfig::Postgres { database_url } => {
            let store = PostgresBankStore::connect(database_url)
                .await
                .context("failed to connect to postgres")?;
            store.ensure_schema().await.context("failed to apply schema")?;
            info!("using postgres store");
            Arc::new(store)
        }
    };

    let services = AppServices::new(store.clone(), config);
    seed::ensure_admin(store.as_ref(), &config.admin)
        .await
        .context("failed to create bootstrap admin")?;
    if config.seed_demo_data {
        seed::seed_demo_customer(store.as_ref(), &services.back_office)
            .await
            .context("failed to seed demo customer")?;
    }
    Ok(services)
}
