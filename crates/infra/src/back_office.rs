//! Admin back office: dashboard stats, customer maintenance, manual postings
//! and wire operations.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use fcb_auth::{NewUserProfile, User, UserStatus};
use fcb_banking::{
    Account, AccountType, ApprovalStatus, FundsCheck, LimitKind, LimitRequestStatus, Posting,
    Transaction, TransactionType, WireKind, WireStatus, WireTransfer,
};
use fcb_core::{AccountId, Money, RequestId, UserId};

use crate::error::{BankError, BankResult};
use crate::passwords;
use crate::store::{BankStore, NewAccount, Page, Posted};

/// Dashboard totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_customers: u64,
    pub total_accounts: u64,
    pub active_accounts: u64,
    pub total_deposits: Money,
    pub total_transactions: u64,
    pub pending_external_transfers: u64,
    pub pending_credit_limit_requests: u64,
    pub pending_debit_limit_requests: u64,
    pub pending_applications: u64,
}

/// An account together with its owner, as listed in the customers table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAccount {
    pub user: User,
    pub account: Account,
}

/// New customer entered by an admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub profile: NewUserProfile,
    pub password: String,
    /// One account per entry, with its opening balance (zero for none).
    pub accounts: Vec<(AccountType, Money)>,
}

/// Manual ledger entry made by an admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualPosting {
    pub account_id: AccountId,
    pub kind: TransactionType,
    pub amount: Money,
    pub description: String,
}

#[derive(Clone)]
pub struct BackOffice {
    store: Arc<dyn BankStore>,
    routing_number: String,
}

impl BackOffice {
    pub fn new(store: Arc<dyn BankStore>, routing_number: impl Into<String>) -> Self {
        Self {
            store,
            routing_number: routing_number.into(),
        }
    }

    pub async fn stats(&self) -> BankResult<DashboardStats> {
        let users = self.store.list_users().await?;
        let accounts = self.store.list_accounts().await?;
        let total_deposits = accounts.iter().map(|a| a.balance).sum();
        let pending_external = self
            .store
            .list_external_transfers(Some(ApprovalStatus::Pending))
            .await?;
        let pending_credit = self
            .store
            .list_limit_requests(LimitKind::Credit, Some(LimitRequestStatus::Pending))
            .await?;
        let pending_debit = self
            .store
            .list_limit_requests(LimitKind::Debit, Some(LimitRequestStatus::Pending))
            .await?;
        let pending_applications = self
            .store
            .list_applications(Some(ApprovalStatus::Pending))
            .await?;

        Ok(DashboardStats {
            total_customers: users.len() as u64,
            total_accounts: accounts.len() as u64,
            active_accounts: accounts.iter().filter(|a| a.is_active()).count() as u64,
            total_deposits,
            total_transactions: self.store.count_transactions().await?,
            pending_external_transfers: pending_external.len() as u64,
            pending_credit_limit_requests: pending_credit.len() as u64,
            pending_debit_limit_requests: pending_debit.len() as u64,
            pending_applications: pending_applications.len() as u64,
        })
    }

    /// Every account with its owner, oldest account first.
    pub async fn customers(&self) -> BankResult<Vec<CustomerAccount>> {
        let users = self.store.list_users().await?;
        let accounts = self.store.list_accounts().await?;
        Ok(accounts
            .into_iter()
            .filter_map(|account| {
                users
                    .iter()
                    .find(|u| u.id == account.user_id)
                    .map(|user| CustomerAccount {
                        user: user.clone(),
                        account,
                    })
            })
            .collect())
    }

    /// `id` is an account id.
    pub async fn customer(&self, id: AccountId) -> BankResult<CustomerAccount> {
        let account = self
            .store
            .find_account(id)
            .await?
            .ok_or(BankError::NotFound("account"))?;
        let user = self
            .store
            .find_user(account.user_id)
            .await?
            .ok_or(BankError::NotFound("user"))?;
        Ok(CustomerAccount { user, account })
    }

    /// Create a login and its accounts. Each non-zero opening balance is
    /// posted as an `Opening deposit` credit.
    #[instrument(skip(self, customer), fields(username = %customer.profile.username))]
    pub async fn create_customer(&self, customer: NewCustomer) -> BankResult<(User, Vec<Account>)> {
        if customer.accounts.is_empty() {
            return Err(BankError::validation("at least one account is required"));
        }
        if customer.accounts.iter().any(|(_, balance)| balance.is_negative()) {
            return Err(BankError::validation("initial balance cannot be negative"));
        }
        let profile = customer.profile.validated(&customer.password)?;

        let now = Utc::now();
        let user = User::new(profile, passwords::hash(&customer.password).await?, now);
        let accounts = customer
            .accounts
            .into_iter()
            .map(|(account_type, opening_deposit)| NewAccount {
                account: Account::open(user.id, account_type, self.routing_number.clone(), now),
                opening_deposit,
            })
            .collect();

        let (user, accounts) = self.store.create_customer(user, accounts, now).await?;
        info!(user_id = %user.id, accounts = accounts.len(), "customer created");
        Ok((user, accounts))
    }

    /// Remove an account. Its ledger rows stay.
    #[instrument(skip(self))]
    pub async fn delete_customer(&self, id: AccountId) -> BankResult<Account> {
        let account = self.store.delete_account(id).await?;
        warn!(account_id = %account.id, balance = %account.balance, "account deleted");
        Ok(account)
    }

    /// Post a credit or debit with funds and status checks disabled.
    #[instrument(skip(self, entry), fields(account_id = %entry.account_id, kind = entry.kind.as_str()))]
    pub async fn post_transaction(&self, entry: ManualPosting) -> BankResult<Posted> {
        let amount = entry.amount.positive("amount")?;
        let description = fcb_banking::transfer::required("description", &entry.description)?;
        let posting = match entry.kind {
            TransactionType::Credit => Posting::credit(entry.account_id, amount, description),
            TransactionType::Debit => Posting::debit(entry.account_id, amount, description),
        }
        .with_funds_check(FundsCheck::Override);

        let posted = self
            .store
            .post(vec![posting], Utc::now())
            .await?
            .pop()
            .ok_or_else(|| BankError::Store("manual posting produced no ledger row".into()))?;
        info!(
            transaction_id = %posted.transaction.id,
            amount = %amount,
            balance_after = %posted.transaction.balance_after,
            "manual transaction posted"
        );
        Ok(posted)
    }

    pub async fn set_user_status(
        &self,
        id: UserId,
        status: UserStatus,
        reason: Option<String>,
    ) -> BankResult<User> {
        let user = self.store.set_user_status(id, status, reason).await?;
        info!(user_id = %user.id, status = user.status.as_str(), "user status changed");
        Ok(user)
    }

    pub async fn transactions(&self, page: Page) -> BankResult<Vec<Transaction>> {
        Ok(self.store.list_transactions(page).await?)
    }

    pub async fn wires(&self, kind: Option<WireKind>) -> BankResult<Vec<WireTransfer>> {
        Ok(self.store.list_wires(kind).await?)
    }

    /// Move a wire along `pending → processing → completed`, or fail it.
    /// Failing posts a refund of the full debit.
    #[instrument(skip(self))]
    pub async fn update_wire_status(
        &self,
        kind: WireKind,
        id: RequestId,
        status: WireStatus,
    ) -> BankResult<(WireTransfer, Option<Posted>)> {
        let (wire, refund) = self
            .store
            .update_wire_status(kind, id, status, Utc::now())
            .await?;
        info!(
            wire_id = %wire.id,
            status = wire.status.as_str(),
            refunded = refund.is_some(),
            "wire status updated"
        );
        Ok((wire, refund))
    }
}
