//! Read side of the customer dashboard.

use std::sync::Arc;

use chrono::Utc;

use fcb_banking::transfer::ensure_owned;
use fcb_banking::{
    Account, AccountType, LimitIncreaseRequest, PendingExternalTransfer, Statement,
    StatementPeriod, Transaction, WireTransfer,
};
use fcb_core::{AccountId, UserId};

use crate::error::{BankError, BankResult};
use crate::store::{BankStore, Page};

pub const DEFAULT_RECENT_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn BankStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn BankStore>) -> Self {
        Self { store }
    }

    pub async fn accounts(&self, user: UserId) -> BankResult<Vec<Account>> {
        Ok(self.store.accounts_for_user(user).await?)
    }

    /// The account shown on the dashboard: the first checking account, or
    /// the oldest account when the customer has no checking.
    pub async fn primary_account(&self, user: UserId) -> BankResult<Account> {
        let accounts = self.store.accounts_for_user(user).await?;
        accounts
            .iter()
            .find(|a| a.account_type == AccountType::Checking)
            .or_else(|| accounts.first())
            .cloned()
            .ok_or(BankError::NotFound("account"))
    }

    async fn owned(&self, user: UserId, id: AccountId) -> BankResult<Account> {
        let account = self
            .store
            .find_account(id)
            .await?
            .ok_or(BankError::NotFound("account"))?;
        ensure_owned(&account, user)?;
        Ok(account)
    }

    /// Newest first.
    pub async fn account_transactions(
        &self,
        user: UserId,
        account_id: AccountId,
        page: Page,
    ) -> BankResult<Vec<Transaction>> {
        self.owned(user, account_id).await?;
        Ok(self.store.transactions_for_account(account_id, page).await?)
    }

    /// Newest first across all of the customer's accounts.
    pub async fn recent_transactions(&self, user: UserId, limit: Option<u32>) -> BankResult<Vec<Transaction>> {
        let limit = limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, Page::MAX_LIMIT);
        Ok(self.store.recent_transactions_for_user(user, limit).await?)
    }

    /// Statement for `month` (`YYYY-MM`), defaulting to the current month.
    pub async fn statement(
        &self,
        user: UserId,
        account_id: AccountId,
        month: Option<&str>,
    ) -> BankResult<Statement> {
        let period = match month {
            Some(m) => m.parse::<StatementPeriod>()?,
            None => StatementPeriod::containing(Utc::now()),
        };
        self.owned(user, account_id).await?;
        let history = self.store.account_history(account_id).await?;
        Ok(Statement::build(account_id, period, &history))
    }

    pub async fn external_transfers(&self, user: UserId) -> BankResult<Vec<PendingExternalTransfer>> {
        Ok(self.store.external_transfers_for_user(user).await?)
    }

    pub async fn wires(&self, user: UserId) -> BankResult<Vec<WireTransfer>> {
        Ok(self.store.wires_for_user(user).await?)
    }

    pub async fn limit_requests(&self, user: UserId) -> BankResult<Vec<LimitIncreaseRequest>> {
        Ok(self.store.limit_requests_for_user(user).await?)
    }
}
