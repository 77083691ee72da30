//! Customer-initiated money movement.
//!
//! Every operation validates its input before touching the store, then hands
//! the resulting postings to the store in one atomic call. Nothing here writes
//! a balance directly.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use fcb_banking::reference::transfer_reference;
use fcb_banking::transfer::ensure_owned;
use fcb_banking::{
    Account, BillPayment, ExternalTransferType, InternalTransfer, PendingExternalTransfer, Receipt,
    Recipient, WireRequest, WireTransfer,
};
use fcb_core::{AccountId, Money, UserId};

use crate::error::{BankError, BankResult};
use crate::store::BankStore;

/// Input for an ACH or wire transfer to another bank that waits for approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTransferRequest {
    pub user_id: UserId,
    pub from_account_id: AccountId,
    pub recipient: Recipient,
    pub amount: Money,
    pub transfer_type: ExternalTransferType,
    pub purpose: Option<String>,
}

#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn BankStore>,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn BankStore>) -> Self {
        Self { store }
    }

    /// Load an account and check that `user` owns it.
    async fn owned_account(&self, user: UserId, id: AccountId) -> BankResult<Account> {
        let account = self
            .store
            .find_account(id)
            .await?
            .ok_or(BankError::NotFound("account"))?;
        ensure_owned(&account, user)?;
        Ok(account)
    }

    /// Debit the source and credit the destination in one step.
    #[instrument(skip(self, transfer), fields(user_id = %transfer.user_id, from = %transfer.from_account_id, to = %transfer.to_account_id))]
    pub async fn internal(&self, transfer: InternalTransfer) -> BankResult<Receipt> {
        transfer.validate()?;
        let from = self.owned_account(transfer.user_id, transfer.from_account_id).await?;
        let to = self.owned_account(transfer.user_id, transfer.to_account_id).await?;

        let now = Utc::now();
        let reference = transfer_reference(now);
        let [debit, credit] = transfer.postings(&from, &to, &reference)?;
        let description = debit.description.clone();

        let posted = self.store.post(vec![debit, credit], now).await?;
        let (Some(from_after), Some(to_after)) = (posted.first(), posted.get(1)) else {
            return Err(BankError::Store("internal transfer produced fewer than two ledger rows".into()));
        };

        info!(
            reference = %reference,
            amount = %transfer.amount,
            from_balance = %from_after.account.balance,
            to_balance = %to_after.account.balance,
            "internal transfer posted"
        );

        Ok(Receipt {
            reference,
            amount: transfer.amount,
            fee: Money::zero(),
            total_debit: transfer.amount,
            from_account: from_after.account.summary(),
            to_account: Some(to_after.account.summary()),
            description,
            created_at: now,
        })
    }

    /// Record an external transfer for admin review. No money moves until it
    /// is approved.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, from = %request.from_account_id))]
    pub async fn external(&self, request: ExternalTransferRequest) -> BankResult<PendingExternalTransfer> {
        let now = Utc::now();
        let pending = PendingExternalTransfer::submit(
            request.user_id,
            request.from_account_id,
            request.recipient,
            request.amount,
            request.transfer_type,
            request.purpose,
            transfer_reference(now),
            now,
        )?;
        let from = self.owned_account(request.user_id, request.from_account_id).await?;
        if !from.is_active() {
            return Err(BankError::validation(format!(
                "account {} is {}",
                from.display_name(),
                from.status.as_str()
            )));
        }

        let pending = self.store.insert_external_transfer(pending).await?;
        info!(
            request_id = %pending.id,
            reference = %pending.reference,
            transfer_type = pending.transfer_type.as_str(),
            amount = %pending.amount,
            "external transfer submitted for approval"
        );
        Ok(pending)
    }

    /// Domestic or international wire: the amount plus every fee is debited
    /// immediately. International details on the request select the kind.
    #[instrument(skip(self, request), fields(user_id = %request.user_id, from = %request.from_account_id))]
    pub async fn wire(&self, request: WireRequest) -> BankResult<(WireTransfer, Receipt)> {
        let now = Utc::now();
        let user_id = request.user_id;
        let wire = WireTransfer::submit(request, transfer_reference(now), now)?;
        self.owned_account(user_id, wire.from_account_id).await?;

        let (wire, posted) = self.store.submit_wire(wire, now).await?;
        info!(
            wire_id = %wire.id,
            kind = wire.kind.as_str(),
            reference = %wire.reference,
            total_debit = %wire.total_debit,
            balance_after = %posted.transaction.balance_after,
            "wire submitted"
        );

        let receipt = Receipt {
            reference: wire.reference.clone(),
            amount: wire.amount,
            fee: wire.fee_total(),
            total_debit: wire.total_debit,
            from_account: posted.account.summary(),
            to_account: None,
            description: posted.transaction.description.clone(),
            created_at: now,
        };
        Ok((wire, receipt))
    }

    #[instrument(skip(self, payment), fields(user_id = %payment.user_id, from = %payment.from_account_id))]
    pub async fn bill_pay(&self, payment: BillPayment) -> BankResult<Receipt> {
        payment.validate()?;
        let from = self.owned_account(payment.user_id, payment.from_account_id).await?;

        let now = Utc::now();
        let reference = transfer_reference(now);
        let posting = payment.posting(&from, &reference)?;
        let description = posting.description.clone();

        let posted = self
            .store
            .post(vec![posting], now)
            .await?
            .pop()
            .ok_or_else(|| BankError::Store("bill payment produced no ledger row".into()))?;

        debug!(payee = %payment.payee_name, "bill payment posted");
        info!(reference = %reference, amount = %payment.amount, "bill payment posted");

        Ok(Receipt {
            reference,
            amount: payment.amount,
            fee: Money::zero(),
            total_debit: payment.amount,
            from_account: posted.account.summary(),
            to_account: None,
            description,
            created_at: now,
        })
    }
}
