use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fcb_auth::{AdminUser, User, UserStatus};
use fcb_banking::{
    AccessCode, Account, AccountApplication, ApprovalStatus, LimitIncreaseRequest, LimitKind,
    LimitRequestStatus, PendingExternalTransfer, Posting, Transaction, WireKind, WireStatus,
    WireTransfer,
};
use fcb_core::{AccountId, AdminId, RequestId, TransactionId, UserId};

use super::{
    AccountStore, Decision, LedgerStore, NewAccount, Page, Posted, StoreError, StoreResult,
    UserStore, WorkflowStore, ledger_timestamp,
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    admins: HashMap<AdminId, AdminUser>,
    accounts: HashMap<AccountId, Account>,
    /// Append order.
    transactions: Vec<Transaction>,
    external_transfers: Vec<PendingExternalTransfer>,
    wires: Vec<WireTransfer>,
    limit_requests: Vec<LimitIncreaseRequest>,
    applications: Vec<AccountApplication>,
    access_codes: HashMap<String, AccessCode>,
}

impl State {
    fn username_taken(&self, username: &str) -> bool {
        self.users.values().any(|u| u.username.eq_ignore_ascii_case(username))
    }

    /// Apply a batch of postings against scratch copies of the touched
    /// accounts; nothing is written unless every posting succeeds.
    fn apply(&mut self, postings: Vec<Posting>, now: DateTime<Utc>) -> StoreResult<Vec<Posted>> {
        let stamped = ledger_timestamp(now, self.transactions.last().map(|t| t.transaction_date));
        let mut touched: HashMap<AccountId, Account> = HashMap::new();
        let mut staged = Vec::with_capacity(postings.len());

        for posting in postings {
            posting.validate()?;
            let account = match touched.entry(posting.account_id) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(v) => {
                    let current = self
                        .accounts
                        .get(&posting.account_id)
                        .cloned()
                        .ok_or(StoreError::NotFound("account"))?;
                    v.insert(current)
                }
            };
            let balance_after = account.adjust_balance(posting.delta(), posting.funds_check)?;
            staged.push(Posted {
                account: account.clone(),
                transaction: Transaction::record(&posting, balance_after, stamped),
            });
        }

        self.accounts.extend(touched);
        self.transactions
            .extend(staged.iter().map(|p| p.transaction.clone()));
        Ok(staged)
    }

    /// Insert a user with accounts and post the opening deposits; rolled back
    /// if any posting is refused.
    fn open_customer(
        &mut self,
        user: User,
        accounts: Vec<NewAccount>,
        now: DateTime<Utc>,
    ) -> StoreResult<(User, Vec<Account>)> {
        if self.username_taken(&user.username) {
            return Err(StoreError::Conflict(format!("username '{}' is already taken", user.username)));
        }
        for (i, new) in accounts.iter().enumerate() {
            let number = &new.account.account_number;
            let taken = self.accounts.values().any(|a| &a.account_number == number)
                || accounts[..i].iter().any(|a| &a.account.account_number == number);
            if taken {
                return Err(StoreError::Conflict(format!("account number {number} is already in use")));
            }
        }

        let postings: Vec<Posting> = accounts.iter().filter_map(NewAccount::opening_posting).collect();
        let ids: Vec<AccountId> = accounts.iter().map(|a| a.account.id).collect();
        for new in accounts {
            self.accounts.insert(new.account.id, new.account);
        }
        if let Err(e) = self.apply(postings, now) {
            for id in &ids {
                self.accounts.remove(id);
            }
            return Err(e);
        }

        self.users.insert(user.id, user.clone());
        let opened = ids
            .iter()
            .filter_map(|id| self.accounts.get(id).cloned())
            .collect();
        Ok((user, opened))
    }
}

/// In-memory bank store.
///
/// Intended for tests/dev. A single lock guards the whole state, so every
/// mutation is serialized and validated against current balances.
#[derive(Debug, Default)]
pub struct InMemoryBankStore {
    state: RwLock<State>,
}

impl InMemoryBankStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

fn newest_first<T: Clone>(rows: &[T], keep: impl Fn(&T) -> bool) -> Vec<T> {
    rows.iter().rev().filter(|r| keep(r)).cloned().collect()
}

#[async_trait]
impl UserStore for InMemoryBankStore {
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self.read()?.users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn set_user_status(
        &self,
        id: UserId,
        status: UserStatus,
        reason: Option<String>,
    ) -> StoreResult<User> {
        let mut state = self.write()?;
        let user = state.users.get_mut(&id).ok_or(StoreError::NotFound("user"))?;
        user.set_status(status, reason)?;
        Ok(user.clone())
    }

    async fn insert_admin(&self, admin: AdminUser) -> StoreResult<AdminUser> {
        let mut state = self.write()?;
        if state
            .admins
            .values()
            .any(|a| a.username.eq_ignore_ascii_case(&admin.username))
        {
            return Err(StoreError::Conflict(format!("admin '{}' already exists", admin.username)));
        }
        state.admins.insert(admin.id, admin.clone());
        Ok(admin)
    }

    async fn find_admin(&self, id: AdminId) -> StoreResult<Option<AdminUser>> {
        Ok(self.read()?.admins.get(&id).cloned())
    }

    async fn find_admin_by_username(&self, username: &str) -> StoreResult<Option<AdminUser>> {
        Ok(self
            .read()?
            .admins
            .values()
            .find(|a| a.username.eq_ignore_ascii_case(username))
            .cloned())
    }
}

#[async_trait]
impl AccountStore for InMemoryBankStore {
    async fn find_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    async fn accounts_for_user(&self, user_id: UserId) -> StoreResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .read()?
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        accounts.sort_by_key(|a| (a.open_date, a.id));
        Ok(accounts)
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self.read()?.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| (a.open_date, a.id));
        Ok(accounts)
    }

    async fn create_customer(
        &self,
        user: User,
        accounts: Vec<NewAccount>,
        now: DateTime<Utc>,
    ) -> StoreResult<(User, Vec<Account>)> {
        self.write()?.open_customer(user, accounts, now)
    }

    async fn delete_account(&self, id: AccountId) -> StoreResult<Account> {
        self.write()?
            .accounts
            .remove(&id)
            .ok_or(StoreError::NotFound("account"))
    }
}

#[async_trait]
impl LedgerStore for InMemoryBankStore {
    async fn post(&self, postings: Vec<Posting>, now: DateTime<Utc>) -> StoreResult<Vec<Posted>> {
        self.write()?.apply(postings, now)
    }

    async fn find_transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        Ok(self.read()?.transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn transactions_for_account(&self, account_id: AccountId, page: Page) -> StoreResult<Vec<Transaction>> {
        let state = self.read()?;
        Ok(page.slice(
            state
                .transactions
                .iter()
                .rev()
                .filter(|t| t.account_id == account_id)
                .cloned(),
        ))
    }

    async fn account_history(&self, account_id: AccountId) -> StoreResult<Vec<Transaction>> {
        Ok(self
            .read()?
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn recent_transactions_for_user(&self, user_id: UserId, limit: u32) -> StoreResult<Vec<Transaction>> {
        let state = self.read()?;
        let owned = |t: &Transaction| {
            state
                .accounts
                .get(&t.account_id)
                .is_some_and(|a| a.user_id == user_id)
        };
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|t| owned(t))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_transactions(&self, page: Page) -> StoreResult<Vec<Transaction>> {
        let state = self.read()?;
        Ok(page.slice(state.transactions.iter().rev().cloned()))
    }

    async fn count_transactions(&self) -> StoreResult<u64> {
        Ok(self.read()?.transactions.len() as u64)
    }
}

#[async_trait]
impl WorkflowStore for InMemoryBankStore {
    async fn insert_external_transfer(&self, transfer: PendingExternalTransfer) -> StoreResult<PendingExternalTransfer> {
        self.write()?.external_transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn external_transfers_for_user(&self, user_id: UserId) -> StoreResult<Vec<PendingExternalTransfer>> {
        Ok(newest_first(&self.read()?.external_transfers, |t| t.user_id == user_id))
    }

    async fn list_external_transfers(&self, status: Option<ApprovalStatus>) -> StoreResult<Vec<PendingExternalTransfer>> {
        Ok(newest_first(&self.read()?.external_transfers, |t| {
            status.is_none_or(|s| t.review.status == s)
        }))
    }

    async fn resolve_external_transfer(
        &self,
        id: RequestId,
        admin: AdminId,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> StoreResult<(PendingExternalTransfer, Option<Posted>)> {
        let mut state = self.write()?;
        let idx = state
            .external_transfers
            .iter()
            .position(|t| t.id == id)
            .ok_or(StoreError::NotFound("external transfer"))?;

        match decision {
            Decision::Approve => {
                let posting = state.external_transfers[idx].settlement_posting()?;
                let posted = state.apply(vec![posting], now)?.pop();
                let transfer = &mut state.external_transfers[idx];
                transfer.review.approve(admin, now)?;
                Ok((transfer.clone(), posted))
            }
            Decision::Reject(reason) => {
                let transfer = &mut state.external_transfers[idx];
                transfer.review.reject(admin, now, &reason)?;
                Ok((transfer.clone(), None))
            }
        }
    }

    async fn submit_wire(&self, wire: WireTransfer, now: DateTime<Utc>) -> StoreResult<(WireTransfer, Posted)> {
        let mut state = self.write()?;
        let posted = state
            .apply(vec![wire.debit_posting()], now)?
            .pop()
            .ok_or_else(|| StoreError::Backend("wire debit produced no ledger row".to_string()))?;
        state.wires.push(wire.clone());
        Ok((wire, posted))
    }

    async fn wires_for_user(&self, user_id: UserId) -> StoreResult<Vec<WireTransfer>> {
        Ok(newest_first(&self.read()?.wires, |w| w.user_id == user_id))
    }

    async fn list_wires(&self, kind: Option<WireKind>) -> StoreResult<Vec<WireTransfer>> {
        Ok(newest_first(&self.read()?.wires, |w| kind.is_none_or(|k| w.kind == k)))
    }

    async fn update_wire_status(
        &self,
        kind: WireKind,
        id: RequestId,
        status: WireStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<(WireTransfer, Option<Posted>)> {
        let mut state = self.write()?;
        let idx = state
            .wires
            .iter()
            .position(|w| w.id == id && w.kind == kind)
            .ok_or(StoreError::NotFound("wire transfer"))?;

        let mut wire = state.wires[idx].clone();
        let refund = wire.transition(status, now)?;
        let posted = match refund {
            Some(posting) => state.apply(vec![posting], now)?.pop(),
            None => None,
        };
        state.wires[idx] = wire.clone();
        Ok((wire, posted))
    }

    async fn insert_limit_request(&self, request: LimitIncreaseRequest) -> StoreResult<LimitIncreaseRequest> {
        self.write()?.limit_requests.push(request.clone());
        Ok(request)
    }

    async fn limit_requests_for_user(&self, user_id: UserId) -> StoreResult<Vec<LimitIncreaseRequest>> {
        Ok(newest_first(&self.read()?.limit_requests, |r| r.user_id == user_id))
    }

    async fn list_limit_requests(
        &self,
        kind: LimitKind,
        status: Option<LimitRequestStatus>,
    ) -> StoreResult<Vec<LimitIncreaseRequest>> {
        Ok(newest_first(&self.read()?.limit_requests, |r| {
            r.kind == kind && status.is_none_or(|s| r.review.status == s)
        }))
    }

    async fn resolve_limit_request(
        &self,
        kind: LimitKind,
        id: RequestId,
        admin: AdminId,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> StoreResult<LimitIncreaseRequest> {
        let mut state = self.write()?;
        let request = state
            .limit_requests
            .iter_mut()
            .find(|r| r.id == id && r.kind == kind)
            .ok_or(StoreError::NotFound("limit increase request"))?;
        match decision {
            Decision::Approve => request.review.approve(admin, now)?,
            Decision::Reject(reason) => request.review.reject(admin, now, &reason)?,
        }
        Ok(request.clone())
    }

    async fn insert_application(&self, application: AccountApplication) -> StoreResult<AccountApplication> {
        self.write()?.applications.push(application.clone());
        Ok(application)
    }

    async fn find_application(&self, id: RequestId) -> StoreResult<Option<AccountApplication>> {
        Ok(self.read()?.applications.iter().find(|a| a.id == id).cloned())
    }

    async fn list_applications(&self, status: Option<ApprovalStatus>) -> StoreResult<Vec<AccountApplication>> {
        Ok(newest_first(&self.read()?.applications, |a| {
            status.is_none_or(|s| a.review.status == s)
        }))
    }

    async fn resolve_application(
        &self,
        id: RequestId,
        admin: AdminId,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> StoreResult<(AccountApplication, Option<AccessCode>)> {
        let mut state = self.write()?;
        let application = state
            .applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound("account application"))?;

        match decision {
            Decision::Approve => {
                let code = application.approve(admin, now)?;
                let application = application.clone();
                state.access_codes.insert(code.code.clone(), code.clone());
                Ok((application, Some(code)))
            }
            Decision::Reject(reason) => {
                application.review.reject(admin, now, &reason)?;
                Ok((application.clone(), None))
            }
        }
    }

    async fn find_access_code(&self, code: &str) -> StoreResult<Option<AccessCode>> {
        Ok(self.read()?.access_codes.get(code).cloned())
    }

    async fn enroll(
        &self,
        code: &str,
        user: User,
        account: NewAccount,
        now: DateTime<Utc>,
    ) -> StoreResult<(User, Account)> {
        let mut state = self.write()?;
        let mut access = state
            .access_codes
            .get(code)
            .cloned()
            .ok_or(StoreError::NotFound("access code"))?;
        access.consume(now)?;

        let (user, mut accounts) = state.open_customer(user, vec![account], now)?;
        state.access_codes.insert(access.code.clone(), access);
        let account = accounts
            .pop()
            .ok_or_else(|| StoreError::Backend("enrollment opened no account".to_string()))?;
        Ok((user, account))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use fcb_auth::NewUserProfile;
    use fcb_banking::AccountType;
    use fcb_core::Money;

    use super::*;

    fn user(username: &str) -> User {
        User::new(
            NewUserProfile {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: "Test".to_string(),
                last_name: "Customer".to_string(),
                phone: None,
            },
            "hash".to_string(),
            Utc::now(),
        )
    }

    fn checking(owner: &User, number: &str) -> NewAccount {
        let mut account = Account::open(owner.id, AccountType::Checking, "021000089", Utc::now());
        account.account_number = number.to_string();
        NewAccount {
            account,
            opening_deposit: Money::from_cents(10_000),
        }
    }

    #[tokio::test]
    async fn account_numbers_are_unique() {
        let store = InMemoryBankStore::new();
        let first = user("vera");
        store
            .create_customer(first.clone(), vec![checking(&first, "4000000001")], Utc::now())
            .await
            .unwrap();

        let second = user("walt");
        let err = store
            .create_customer(second.clone(), vec![checking(&second, "4000000001")], Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let third = user("xena");
        let err = store
            .create_customer(
                third.clone(),
                vec![checking(&third, "4000000002"), checking(&third, "4000000002")],
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        assert_eq!(store.list_accounts().await.unwrap().len(), 1);
        assert_eq!(store.list_users().await.unwrap().len(), 1);
        assert_eq!(store.count_transactions().await.unwrap(), 1);
    }
}
