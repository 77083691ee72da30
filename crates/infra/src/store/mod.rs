//! Persistence boundary for the bank.
//!
//! Every balance change goes through a store operation that applies the
//! adjustment and appends its ledger row in one atomic step: [`LedgerStore::post`]
//! for plain postings, or a workflow operation (wire submission, transfer
//! approval, enrollment) that embeds its postings. Nothing outside this module
//! writes a balance or a transaction row.
//!
//! Two backends implement the traits:
//! - [`InMemoryBankStore`]: one lock over the whole state (dev/tests)
//! - [`PostgresBankStore`]: one SQL transaction per operation, touched
//!   accounts locked `FOR UPDATE` in ascending id order

pub mod in_memory;
pub mod postgres;
pub mod query;

pub use in_memory::InMemoryBankStore;
pub use postgres::PostgresBankStore;
pub use query::Page;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use fcb_auth::{AdminUser, User, UserStatus};
use fcb_banking::{
    AccessCode, Account, AccountApplication, ApprovalStatus, LimitIncreaseRequest, LimitKind,
    LimitRequestStatus, PendingExternalTransfer, Posting, Transaction, WireKind, WireStatus,
    WireTransfer,
};
use fcb_core::{AccountId, AdminId, DomainError, Money, RequestId, TransactionId, UserId};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    /// A domain rule refused the change (funds, status, transition).
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage error: {0}")]
    Backend(String),
}

/// One applied posting: the account as it is after the adjustment and the
/// ledger row recording it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posted {
    pub account: Account,
    pub transaction: Transaction,
}

/// Admin resolution of a pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject(String),
}

/// A new account plus the amount of its opening deposit (zero for none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub account: Account,
    pub opening_deposit: Money,
}

pub const OPENING_DEPOSIT: &str = "Opening deposit";

/// Timestamp for ledger rows appended while the touched accounts are locked.
///
/// Read after the lock is taken and never earlier than `latest`, the newest
/// row already on those accounts, so append order and date order agree.
pub(crate) fn ledger_timestamp(requested: DateTime<Utc>, latest: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let stamped = requested.max(Utc::now());
    latest.map_or(stamped, |latest| stamped.max(latest))
}

impl NewAccount {
    pub fn opening_posting(&self) -> Option<Posting> {
        self.opening_deposit
            .is_positive()
            .then(|| Posting::credit(self.account.id, self.opening_deposit, OPENING_DEPOSIT))
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Validated through [`User::set_status`]; fails with `NotFound` for an
    /// unknown user.
    async fn set_user_status(
        &self,
        id: UserId,
        status: UserStatus,
        reason: Option<String>,
    ) -> StoreResult<User>;

    /// Fails with `Conflict` when the username is taken.
    async fn insert_admin(&self, admin: AdminUser) -> StoreResult<AdminUser>;

    async fn find_admin(&self, id: AdminId) -> StoreResult<Option<AdminUser>>;

    async fn find_admin_by_username(&self, username: &str) -> StoreResult<Option<AdminUser>>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_account(&self, id: AccountId) -> StoreResult<Option<Account>>;

    async fn accounts_for_user(&self, user_id: UserId) -> StoreResult<Vec<Account>>;

    async fn list_accounts(&self) -> StoreResult<Vec<Account>>;

    /// Create a user with one or more accounts. Non-zero opening deposits are
    /// posted as credits in the same atomic step.
    async fn create_customer(
        &self,
        user: User,
        accounts: Vec<NewAccount>,
        now: DateTime<Utc>,
    ) -> StoreResult<(User, Vec<Account>)>;

    /// Remove the account row. Its ledger rows are kept.
    async fn delete_account(&self, id: AccountId) -> StoreResult<Account>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Apply every posting and append one ledger row per posting, all or
    /// nothing. Postings are applied in order, so a later posting sees the
    /// balance produced by an earlier one.
    async fn post(&self, postings: Vec<Posting>, now: DateTime<Utc>) -> StoreResult<Vec<Posted>>;

    async fn find_transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>>;

    /// Newest first.
    async fn transactions_for_account(&self, account_id: AccountId, page: Page) -> StoreResult<Vec<Transaction>>;

    /// Full history, oldest first.
    async fn account_history(&self, account_id: AccountId) -> StoreResult<Vec<Transaction>>;

    /// Newest first across every account the user currently owns.
    async fn recent_transactions_for_user(&self, user_id: UserId, limit: u32) -> StoreResult<Vec<Transaction>>;

    /// Newest first across the whole bank.
    async fn list_transactions(&self, page: Page) -> StoreResult<Vec<Transaction>>;

    async fn count_transactions(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn insert_external_transfer(&self, transfer: PendingExternalTransfer) -> StoreResult<PendingExternalTransfer>;

    async fn external_transfers_for_user(&self, user_id: UserId) -> StoreResult<Vec<PendingExternalTransfer>>;

    async fn list_external_transfers(&self, status: Option<ApprovalStatus>) -> StoreResult<Vec<PendingExternalTransfer>>;

    /// Approval debits the source account (amount only) atomically with the
    /// status change; if the debit is refused the request stays pending.
    async fn resolve_external_transfer(
        &self,
        id: RequestId,
        admin: AdminId,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> StoreResult<(PendingExternalTransfer, Option<Posted>)>;

    /// Record the wire and take its total debit in one step.
    async fn submit_wire(&self, wire: WireTransfer, now: DateTime<Utc>) -> StoreResult<(WireTransfer, Posted)>;

    async fn wires_for_user(&self, user_id: UserId) -> StoreResult<Vec<WireTransfer>>;

    async fn list_wires(&self, kind: Option<WireKind>) -> StoreResult<Vec<WireTransfer>>;

    /// Move a wire along its lifecycle; failing it posts the refund credit.
    async fn update_wire_status(
        &self,
        kind: WireKind,
        id: RequestId,
        status: WireStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<(WireTransfer, Option<Posted>)>;

    async fn insert_limit_request(&self, request: LimitIncreaseRequest) -> StoreResult<LimitIncreaseRequest>;

    async fn limit_requests_for_user(&self, user_id: UserId) -> StoreResult<Vec<LimitIncreaseRequest>>;

    async fn list_limit_requests(
        &self,
        kind: LimitKind,
        status: Option<LimitRequestStatus>,
    ) -> StoreResult<Vec<LimitIncreaseRequest>>;

    async fn resolve_limit_request(
        &self,
        kind: LimitKind,
        id: RequestId,
        admin: AdminId,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> StoreResult<LimitIncreaseRequest>;

    async fn insert_application(&self, application: AccountApplication) -> StoreResult<AccountApplication>;

    async fn find_application(&self, id: RequestId) -> StoreResult<Option<AccountApplication>>;

    async fn list_applications(&self, status: Option<ApprovalStatus>) -> StoreResult<Vec<AccountApplication>>;

    /// Approval issues and stores a one-time access code.
    async fn resolve_application(
        &self,
        id: RequestId,
        admin: AdminId,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> StoreResult<(AccountApplication, Option<AccessCode>)>;

    async fn find_access_code(&self, code: &str) -> StoreResult<Option<AccessCode>>;

    /// Consume the access code and create the user and account (with its
    /// opening deposit) atomically. A used code is a `Conflict`.
    async fn enroll(
        &self,
        code: &str,
        user: User,
        account: NewAccount,
        now: DateTime<Utc>,
    ) -> StoreResult<(User, Account)>;
}

/// Everything the services need, as one trait object.
pub trait BankStore: UserStore + AccountStore + LedgerStore + WorkflowStore {}

impl<T> BankStore for T where T: UserStore + AccountStore + LedgerStore + WorkflowStore {}
