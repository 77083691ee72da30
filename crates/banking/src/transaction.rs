use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fcb_core::{AccountId, DomainError, DomainResult, Money, TransactionId};

use crate::account::FundsCheck;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "credit",
            TransactionType::Debit => "debit",
        }
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "credit" => Ok(TransactionType::Credit),
            "debit" => Ok(TransactionType::Debit),
            other => Err(DomainError::validation(format!("type must be credit or debit (got '{other}')"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(DomainError::validation(format!("unknown transaction status '{other}'"))),
        }
    }
}

/// Optional merchant details attached to card-style or bill-pay rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Merchant {
    pub merchant_name: Option<String>,
    pub merchant_location: Option<String>,
    pub merchant_category: Option<String>,
}

/// One immutable ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Money,
    pub description: String,
    #[serde(flatten)]
    pub merchant: Merchant,
    pub reference: Option<String>,
    pub balance_after: Money,
    pub status: TransactionStatus,
    pub transaction_date: DateTime<Utc>,
    pub posted_date: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Record a posting that has just been applied to its account.
    pub fn record(posting: &Posting, balance_after: Money, now: DateTime<Utc>) -> Self {
        Self {
            id: TransactionId::new(),
            account_id: posting.account_id,
            kind: posting.kind,
            amount: posting.amount,
            description: posting.description.clone(),
            merchant: posting.merchant.clone(),
            reference: posting.reference.clone(),
            balance_after,
            status: TransactionStatus::Completed,
            transaction_date: now,
            posted_date: Some(now),
        }
    }

    /// Signed effect of this row on its account's balance.
    pub fn delta(&self) -> Money {
        match self.kind {
            TransactionType::Credit => self.amount,
            TransactionType::Debit => self.amount.negate(),
        }
    }
}

/// A balance adjustment that has not been applied yet.
///
/// Stores apply a batch of postings atomically: each one changes exactly one
/// account balance and produces exactly one [`Transaction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub account_id: AccountId,
    pub kind: TransactionType,
    pub amount: Money,
    pub description: String,
    pub merchant: Merchant,
    pub reference: Option<String>,
    pub funds_check: FundsCheck,
}

impl Posting {
    pub fn credit(account_id: AccountId, amount: Money, description: impl Into<String>) -> Self {
        Self::new(account_id, TransactionType::Credit, amount, description)
    }

    pub fn debit(account_id: AccountId, amount: Money, description: impl Into<String>) -> Self {
        Self::new(account_id, TransactionType::Debit, amount, description)
    }

    fn new(
        account_id: AccountId,
        kind: TransactionType,
        amount: Money,
        description: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            kind,
            amount,
            description: description.into(),
            merchant: Merchant::default(),
            reference: None,
            funds_check: FundsCheck::Strict,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_merchant(mut self, merchant: Merchant) -> Self {
        self.merchant = merchant;
        self
    }

    pub fn with_funds_check(mut self, check: FundsCheck) -> Self {
        self.funds_check = check;
        self
    }

    pub fn delta(&self) -> Money {
        match self.kind {
            TransactionType::Credit => self.amount,
            TransactionType::Debit => self.amount.negate(),
        }
    }

    /// Shape checks that do not need the account.
    pub fn validate(&self) -> DomainResult<()> {
        self.amount.positive("amount")?;
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("description is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_copies_posting_and_stamps_dates() {
        let acct = AccountId::new();
        let posting = Posting::debit(acct, Money::from_cents(4_200), "Electric bill")
            .with_reference("FCB2026-ABCDEFGH")
            .with_merchant(Merchant {
                merchant_name: Some("City Power".into()),
                merchant_location: None,
                merchant_category: Some("Bill Payment".into()),
            });
        let now = Utc::now();
        let tx = Transaction::record(&posting, Money::from_cents(5_800), now);

        assert_eq!(tx.account_id, acct);
        assert_eq!(tx.kind, TransactionType::Debit);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.posted_date, Some(now));
        assert_eq!(tx.delta(), Money::from_cents(-4_200));
    }

    #[test]
    fn serializes_with_flat_merchant_fields() {
        let posting = Posting::credit(AccountId::new(), Money::from_cents(100), "Deposit");
        let tx = Transaction::record(&posting, Money::from_cents(100), Utc::now());
        let v = serde_json::to_value(&tx).unwrap();
        assert_eq!(v["type"], json!("credit"));
        assert_eq!(v["balanceAfter"], json!("1.00"));
        assert!(v.get("merchantName").is_some());
    }

    #[test]
    fn postings_require_positive_amount_and_description() {
        let id = AccountId::new();
        assert!(Posting::credit(id, Money::zero(), "x").validate().is_err());
        assert!(Posting::credit(id, Money::from_cents(-1), "x").validate().is_err());
        assert!(Posting::credit(id, Money::from_cents(1), "  ").validate().is_err());
        assert!(Posting::credit(id, Money::from_cents(1), "ok").validate().is_ok());
    }
}
