//! Admin-gated requests: external transfers, limit increases and account
//! applications, plus enrollment with an approved application's access code.
//!
//! Each resolution is a single store call, so the status change and any money
//! it moves commit together. A request is resolved at most once.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use fcb_auth::{NewUserProfile, User};
use fcb_banking::transfer::ensure_owned;
use fcb_banking::{
    AccessCode, Account, AccountApplication, AccountType, ApprovalStatus, LimitIncreaseRequest,
    LimitKind, LimitRequestStatus, PendingExternalTransfer, PersonalInfo,
};
use fcb_core::{AccountId, AdminId, Money, RequestId, UserId};

use crate::error::{BankError, BankResult};
use crate::passwords;
use crate::store::{BankStore, Decision, NewAccount, Posted};

/// A customer's request to raise a credit or debit limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitIncreaseForm {
    pub kind: LimitKind,
    pub user_id: UserId,
    pub account_id: Option<AccountId>,
    pub current_limit: Money,
    pub requested_limit: Money,
    pub reason: String,
    pub annual_income: Option<Money>,
    pub employment_status: Option<String>,
}

/// A public account-opening application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationForm {
    pub account_type: AccountType,
    pub personal_info: PersonalInfo,
    pub employment: Option<String>,
    pub annual_income: Option<Money>,
    pub initial_deposit: Money,
}

#[derive(Clone)]
pub struct ApprovalWorkflow {
    store: Arc<dyn BankStore>,
    routing_number: String,
}

impl ApprovalWorkflow {
    pub fn new(store: Arc<dyn BankStore>, routing_number: impl Into<String>) -> Self {
        Self {
            store,
            routing_number: routing_number.into(),
        }
    }

    // -- external transfers -------------------------------------------------

    pub async fn external_transfers(&self, status: Option<ApprovalStatus>) -> BankResult<Vec<PendingExternalTransfer>> {
        Ok(self.store.list_external_transfers(status).await?)
    }

    /// Approving debits the source account by the transfer amount. When the
    /// account cannot cover it the request stays pending.
    #[instrument(skip(self, decision))]
    pub async fn resolve_external_transfer(
        &self,
        id: RequestId,
        admin: AdminId,
        decision: Decision,
    ) -> BankResult<(PendingExternalTransfer, Option<Posted>)> {
        let (transfer, posted) = self
            .store
            .resolve_external_transfer(id, admin, decision, Utc::now())
            .await?;
        info!(
            request_id = %transfer.id,
            status = fcb_banking::Outcome::as_str(&transfer.review.status),
            balance_after = ?posted.as_ref().map(|p| p.transaction.balance_after),
            "external transfer resolved"
        );
        Ok((transfer, posted))
    }

    // -- limit increases ----------------------------------------------------

    #[instrument(skip(self, form), fields(user_id = %form.user_id, kind = form.kind.as_str()))]
    pub async fn submit_limit_increase(&self, form: LimitIncreaseForm) -> BankResult<LimitIncreaseRequest> {
        let request = LimitIncreaseRequest::submit(
            form.kind,
            form.user_id,
            form.account_id,
            form.current_limit,
            form.requested_limit,
            &form.reason,
            form.annual_income,
            form.employment_status,
            Utc::now(),
        )?;
        if let Some(account_id) = form.account_id {
            let account = self
                .store
                .find_account(account_id)
                .await?
                .ok_or(BankError::NotFound("account"))?;
            ensure_owned(&account, form.user_id)?;
        }

        let request = self.store.insert_limit_request(request).await?;
        info!(request_id = %request.id, requested = %request.requested_limit, "limit increase submitted");
        Ok(request)
    }

    pub async fn limit_requests(
        &self,
        kind: LimitKind,
        status: Option<LimitRequestStatus>,
    ) -> BankResult<Vec<LimitIncreaseRequest>> {
        Ok(self.store.list_limit_requests(kind, status).await?)
    }

    /// Status change only; no stored limit is modified.
    #[instrument(skip(self, decision))]
    pub async fn resolve_limit_increase(
        &self,
        kind: LimitKind,
        id: RequestId,
        admin: AdminId,
        decision: Decision,
    ) -> BankResult<LimitIncreaseRequest> {
        let request = self
            .store
            .resolve_limit_request(kind, id, admin, decision, Utc::now())
            .await?;
        info!(
            request_id = %request.id,
            status = fcb_banking::Outcome::as_str(&request.review.status),
            "limit increase resolved"
        );
        Ok(request)
    }

    // -- account applications -----------------------------------------------

    #[instrument(skip(self, form), fields(account_type = form.account_type.as_str()))]
    pub async fn submit_application(&self, form: ApplicationForm) -> BankResult<AccountApplication> {
        let application = AccountApplication::submit(
            form.account_type,
            form.personal_info,
            form.employment,
            form.annual_income,
            form.initial_deposit,
            Utc::now(),
        )?;
        let application = self.store.insert_application(application).await?;
        info!(application_id = %application.id, "account application submitted");
        Ok(application)
    }

    pub async fn application(&self, id: RequestId) -> BankResult<AccountApplication> {
        self.store
            .find_application(id)
            .await?
            .ok_or(BankError::NotFound("account application"))
    }

    pub async fn applications(&self, status: Option<ApprovalStatus>) -> BankResult<Vec<AccountApplication>> {
        Ok(self.store.list_applications(status).await?)
    }

    /// Approval returns the one-time access code for enrollment.
    #[instrument(skip(self, decision))]
    pub async fn resolve_application(
        &self,
        id: RequestId,
        admin: AdminId,
        decision: Decision,
    ) -> BankResult<(AccountApplication, Option<AccessCode>)> {
        let (application, code) = self
            .store
            .resolve_application(id, admin, decision, Utc::now())
            .await?;
        info!(
            application_id = %application.id,
            status = fcb_banking::Outcome::as_str(&application.review.status),
            "account application resolved"
        );
        Ok((application, code))
    }

    /// Turn an approved application into a login and an open account. The
    /// application's initial deposit becomes the opening credit.
    #[instrument(skip(self, access_code, password))]
    pub async fn enroll(&self, access_code: &str, username: &str, password: &str) -> BankResult<(User, Account)> {
        let code = access_code.trim().to_ascii_uppercase();
        let access = self
            .store
            .find_access_code(&code)
            .await?
            .ok_or(BankError::NotFound("access code"))?;
        if access.used_at.is_some() {
            return Err(BankError::conflict("access code has already been used"));
        }
        let application = self
            .store
            .find_application(access.application_id)
            .await?
            .ok_or(BankError::NotFound("account application"))?;

        let info = &application.personal_info;
        let profile = NewUserProfile {
            username: username.to_string(),
            email: info.email.clone(),
            first_name: info.first_name.clone(),
            last_name: info.last_name.clone(),
            phone: Some(info.phone.clone()),
        }
        .validated(password)?;

        let now = Utc::now();
        let user = User::new(profile, passwords::hash(password).await?, now);
        let account = NewAccount {
            account: Account::open(user.id, application.account_type, self.routing_number.clone(), now),
            opening_deposit: application.initial_deposit,
        };

        let (user, account) = self.store.enroll(&code, user, account, now).await?;
        info!(
            user_id = %user.id,
            account_id = %account.id,
            application_id = %application.id,
            "customer enrolled"
        );
        Ok((user, account))
    }
}
