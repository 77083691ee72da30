//! ACH / wire transfers to other banks that wait for admin approval.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fcb_core::{AccountId, DomainError, DomainResult, Money, RequestId, UserId};

use crate::account::FundsCheck;
use crate::review::{ApprovalStatus, Review};
use crate::transaction::Posting;
use crate::transfer::{account_number, optional, required, routing_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExternalTransferType {
    #[serde(rename = "ACH")]
    Ach,
    #[serde(rename = "Wire")]
    Wire,
}

impl ExternalTransferType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalTransferType::Ach => "ACH",
            ExternalTransferType::Wire => "Wire",
        }
    }
}

impl FromStr for ExternalTransferType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ach" => Ok(ExternalTransferType::Ach),
            "wire" => Ok(ExternalTransferType::Wire),
            other => Err(DomainError::validation(format!("transferType must be ACH or Wire (got '{other}')"))),
        }
    }
}

/// Beneficiary at another bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub name: String,
    pub account_number: String,
    pub routing_number: String,
    pub bank_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl Recipient {
    pub fn validated(self) -> DomainResult<Self> {
        Ok(Self {
            name: required("recipientName", &self.name)?,
            account_number: account_number(&self.account_number)?,
            routing_number: routing_number(&self.routing_number)?,
            bank_name: required("bankName", &self.bank_name)?,
            phone: optional(self.phone),
            address: optional(self.address),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingExternalTransfer {
    pub id: RequestId,
    pub user_id: UserId,
    pub from_account_id: AccountId,
    pub recipient: Recipient,
    pub amount: Money,
    pub transfer_type: ExternalTransferType,
    pub purpose: Option<String>,
    #[serde(flatten)]
    pub review: Review<ApprovalStatus>,
    pub submitted_at: DateTime<Utc>,
    pub reference: String,
}

impl PendingExternalTransfer {
    /// Validate and create a pending request. No money moves yet.
    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        user_id: UserId,
        from_account_id: AccountId,
        recipient: Recipient,
        amount: Money,
        transfer_type: ExternalTransferType,
        purpose: Option<String>,
        reference: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let amount = amount.positive("amount")?;
        let recipient = recipient.validated()?;
        Ok(Self {
            id: RequestId::new(),
            user_id,
            from_account_id,
            recipient,
            amount,
            transfer_type,
            purpose: optional(purpose),
            review: Review::pending(),
            submitted_at: now,
            reference,
        })
    }

    /// The debit posted when an admin approves: amount only, no fee.
    pub fn settlement_posting(&self) -> DomainResult<Posting> {
        self.review.ensure_pending()?;
        Ok(Posting::debit(
            self.from_account_id,
            self.amount,
            format!(
                "{} transfer to {} at {}",
                self.transfer_type.as_str(),
                self.recipient.name,
                self.recipient.bank_name
            ),
        )
        .with_reference(self.reference.clone())
        .with_funds_check(FundsCheck::Standard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcb_core::AdminId;

    fn recipient(routing: &str) -> Recipient {
        Recipient {
            name: "Jane Roe".into(),
            account_number: "123456789".into(),
            routing_number: routing.into(),
            bank_name: "Other Bank".into(),
            phone: Some("  ".into()),
            address: None,
        }
    }

    fn submit(amount: Money, routing: &str) -> DomainResult<PendingExternalTransfer> {
        PendingExternalTransfer::submit(
            UserId::new(),
            AccountId::new(),
            recipient(routing),
            amount,
            ExternalTransferType::Ach,
            None,
            "FCB2026-TESTTEST".into(),
            Utc::now(),
        )
    }

    #[test]
    fn submission_validates_amount_and_routing() {
        assert!(submit(Money::from_cents(5_000), "021000089").is_ok());
        assert!(submit(Money::zero(), "021000089").is_err());
        assert!(submit(Money::from_cents(-1), "021000089").is_err());
        assert!(submit(Money::from_cents(5_000), "12345678").is_err());
    }

    #[test]
    fn blank_optional_fields_are_dropped() {
        let t = submit(Money::from_cents(5_000), "021000089").unwrap();
        assert_eq!(t.recipient.phone, None);
        assert!(t.review.is_pending());
    }

    #[test]
    fn settlement_posting_only_while_pending() {
        let mut t = submit(Money::from_cents(5_000), "021000089").unwrap();
        let p = t.settlement_posting().unwrap();
        assert_eq!(p.delta(), Money::from_cents(-5_000));

        t.review.approve(AdminId::new(), Utc::now()).unwrap();
        assert!(matches!(t.settlement_posting(), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn transfer_type_serializes_like_the_wire_format() {
        assert_eq!(serde_json::to_value(ExternalTransferType::Ach).unwrap(), "ACH");
        assert_eq!("wire".parse::<ExternalTransferType>().unwrap(), ExternalTransferType::Wire);
    }
}
