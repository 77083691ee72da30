//! Transfer requests and the field rules they share.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fcb_core::{AccountId, DomainError, DomainResult, Money, UserId};

use crate::account::{Account, AccountSummary, FundsCheck};
use crate::transaction::{Merchant, Posting};

pub const BILL_PAYMENT_CATEGORY: &str = "Bill Payment";

/// Trimmed, non-empty value of a required text field.
pub fn required(field: &str, value: &str) -> DomainResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(v.to_string())
}

/// Trimmed value of an optional text field; blank becomes `None`.
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// ABA routing numbers are exactly nine digits.
pub fn routing_number(value: &str) -> DomainResult<String> {
    let v = value.trim();
    if v.len() != 9 || !v.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::validation("routing number must be exactly 9 digits"));
    }
    Ok(v.to_string())
}

/// Destination account numbers: digits only, 8 to 17 of them (17 is the
/// longest DFI account number an ACH entry carries).
pub fn account_number(value: &str) -> DomainResult<String> {
    let v = value.trim();
    if !v.chars().all(|c| c.is_ascii_digit()) || !(8..=17).contains(&v.len()) {
        return Err(DomainError::validation("account number must be 8 to 17 digits"));
    }
    Ok(v.to_string())
}

/// SWIFT/BIC: 4-letter bank, 2-letter country, 2 alphanumeric location and an
/// optional 3 alphanumeric branch. Normalized to upper case.
pub fn swift_code(value: &str) -> DomainResult<String> {
    let v = value.trim().to_ascii_uppercase();
    let bytes = v.as_bytes();
    let shape_ok = (v.len() == 8 || v.len() == 11)
        && bytes[..6].iter().all(u8::is_ascii_uppercase)
        && bytes[6..].iter().all(u8::is_ascii_alphanumeric);
    if !shape_ok {
        return Err(DomainError::validation("SWIFT code must be 8 or 11 characters (AAAABBCC[DDD])"));
    }
    Ok(v)
}

/// Both accounts must belong to `user`; an account owned by someone else is
/// reported as missing.
pub fn ensure_owned(account: &Account, user: UserId) -> DomainResult<()> {
    if account.user_id == user {
        Ok(())
    } else {
        Err(DomainError::not_found("account"))
    }
}

/// Move money between two accounts of the same customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalTransfer {
    pub user_id: UserId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Money,
    pub memo: Option<String>,
}

impl InternalTransfer {
    /// Checks that need no account state.
    pub fn validate(&self) -> DomainResult<()> {
        if self.from_account_id == self.to_account_id {
            return Err(DomainError::validation("cannot transfer to the same account"));
        }
        self.amount.positive("amount")?;
        Ok(())
    }

    /// One debit on the source and one credit on the destination, sharing a
    /// reference.
    pub fn postings(&self, from: &Account, to: &Account, reference: &str) -> DomainResult<[Posting; 2]> {
        self.validate()?;
        ensure_owned(from, self.user_id)?;
        ensure_owned(to, self.user_id)?;

        let memo = self.memo.as_deref().map(|m| format!(" ({m})")).unwrap_or_default();
        let debit = Posting::debit(from.id, self.amount, format!("Transfer to {}{memo}", to.display_name()))
            .with_reference(reference)
            .with_funds_check(FundsCheck::Strict);
        let credit = Posting::credit(to.id, self.amount, format!("Transfer from {}{memo}", from.display_name()))
            .with_reference(reference)
            .with_funds_check(FundsCheck::Strict);
        Ok([debit, credit])
    }
}

/// Pay a biller from one of the customer's accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillPayment {
    pub user_id: UserId,
    pub from_account_id: AccountId,
    pub payee_name: String,
    pub payee_account_number: Option<String>,
    pub amount: Money,
    pub memo: Option<String>,
}

impl BillPayment {
    pub fn validate(&self) -> DomainResult<()> {
        required("payeeName", &self.payee_name)?;
        self.amount.positive("amount")?;
        Ok(())
    }

    pub fn posting(&self, from: &Account, reference: &str) -> DomainResult<Posting> {
        self.validate()?;
        ensure_owned(from, self.user_id)?;

        let payee = self.payee_name.trim();
        let description = match self.memo.as_deref() {
            Some(memo) => format!("Bill payment to {payee} ({memo})"),
            None => format!("Bill payment to {payee}"),
        };
        Ok(Posting::debit(from.id, self.amount, description)
            .with_reference(reference)
            .with_merchant(Merchant {
                merchant_name: Some(payee.to_string()),
                merchant_location: None,
                merchant_category: Some(BILL_PAYMENT_CATEGORY.to_string()),
            })
            .with_funds_check(FundsCheck::Strict))
    }
}

/// What the customer gets back after a synchronous money movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub reference: String,
    pub amount: Money,
    pub fee: Money,
    pub total_debit: Money,
    pub from_account: AccountSummary,
    pub to_account: Option<AccountSummary>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}
