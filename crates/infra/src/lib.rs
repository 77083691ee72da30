//! Infrastructure layer: stores, the bank services built on them, config.

pub mod accounts;
pub mod approvals;
pub mod back_office;
pub mod config;
pub mod error;
pub mod passwords;
pub mod seed;
pub mod sessions;
pub mod store;
pub mod transfer_engine;

mod integration_tests;

pub use accounts::AccountService;
pub use approvals::{ApplicationForm, ApprovalWorkflow, LimitIncreaseForm};
pub use back_office::{BackOffice, CustomerAccount, DashboardStats, ManualPosting, NewCustomer};
pub use config::{AppConfig, BootstrapAdmin, ConfigError, StoreConfig};
pub use error::{BankError, BankResult};
pub use sessions::SessionService;
pub use store::{BankStore, Decision, InMemoryBankStore, Page, PostgresBankStore, StoreError};
pub use transfer_engine::{ExternalTransferRequest, TransferEngine};
