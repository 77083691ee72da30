//! Banking domain: accounts, ledger rows, transfer rules and approval state.
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns. Stores
//! call into these types so every backend applies the same rules.

pub mod account;
pub mod application;
pub mod external;
pub mod limits;
pub mod reference;
pub mod review;
pub mod statement;
pub mod transaction;
pub mod transfer;
pub mod wire;

pub use account::{Account, AccountStatus, AccountSummary, AccountType, FundsCheck};
pub use application::{AccessCode, AccountApplication, PersonalInfo};
pub use external::{ExternalTransferType, PendingExternalTransfer, Recipient};
pub use limits::{LimitIncreaseRequest, LimitKind, LimitRequestStatus};
pub use review::{ApprovalStatus, Outcome, Review};
pub use statement::{Statement, StatementPeriod};
pub use transaction::{Merchant, Posting, Transaction, TransactionStatus, TransactionType};
pub use transfer::{BillPayment, InternalTransfer, Receipt};
pub use wire::{InternationalDetails, WireFees, WireKind, WireRequest, WireStatus, WireTransfer};
