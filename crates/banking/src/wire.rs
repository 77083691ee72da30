//! Domestic and international wire transfers.
//!
//! A wire debits the source account (amount plus fees) as soon as it is
//! submitted. The row then moves through `pending -> processing -> completed`;
//! a wire that fails before completing is refunded with a new credit row.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fcb_core::{AccountId, DomainError, DomainResult, Money, RequestId, UserId};

use crate::account::FundsCheck;
use crate::transaction::Posting;
use crate::transfer::{account_number, optional, required, routing_number, swift_code};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireKind {
    Domestic,
    International,
}

impl WireKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireKind::Domestic => "domestic",
            WireKind::International => "international",
        }
    }

    pub fn fees(&self) -> WireFees {
        match self {
            WireKind::Domestic => WireFees {
                sender: Money::from_cents(2_500),
                intermediary: Money::zero(),
                recipient: Money::zero(),
            },
            WireKind::International => WireFees {
                sender: Money::from_cents(4_500),
                intermediary: Money::from_cents(2_500),
                recipient: Money::from_cents(1_500),
            },
        }
    }
}

impl FromStr for WireKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "domestic" => Ok(WireKind::Domestic),
            "international" => Ok(WireKind::International),
            other => Err(DomainError::validation(format!(
                "wire kind must be domestic or international (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFees {
    pub sender: Money,
    pub intermediary: Money,
    pub recipient: Money,
}

impl WireFees {
    pub fn total(&self) -> Money {
        [self.sender, self.intermediary, self.recipient].into_iter().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl WireStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireStatus::Pending => "pending",
            WireStatus::Processing => "processing",
            WireStatus::Completed => "completed",
            WireStatus::Failed => "failed",
        }
    }

    pub fn can_become(&self, next: WireStatus) -> bool {
        use WireStatus::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Processing, Completed) | (Pending, Failed) | (Processing, Failed)
        )
    }
}

impl FromStr for WireStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WireStatus::Pending),
            "processing" => Ok(WireStatus::Processing),
            "completed" => Ok(WireStatus::Completed),
            "failed" => Ok(WireStatus::Failed),
            other => Err(DomainError::validation(format!("unknown wire status '{other}'"))),
        }
    }
}

/// Fields only international wires carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternationalDetails {
    pub swift_code: String,
    pub beneficiary_country: String,
    pub iban: Option<String>,
    pub currency: String,
}

impl InternationalDetails {
    pub fn validated(self) -> DomainResult<Self> {
        let currency = optional(Some(self.currency))
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or_else(|| "USD".to_string());
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::validation("currency must be a 3-letter code"));
        }
        Ok(Self {
            swift_code: swift_code(&self.swift_code)?,
            beneficiary_country: required("beneficiaryCountry", &self.beneficiary_country)?,
            iban: optional(self.iban).map(|i| i.replace(' ', "").to_ascii_uppercase()),
            currency,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTransfer {
    pub id: RequestId,
    pub kind: WireKind,
    pub user_id: UserId,
    pub from_account_id: AccountId,
    pub beneficiary_name: String,
    pub beneficiary_address: Option<String>,
    pub bank_name: String,
    pub routing_number: String,
    pub account_number: String,
    #[serde(flatten)]
    pub international: Option<InternationalDetails>,
    pub amount: Money,
    pub fees: WireFees,
    pub total_debit: Money,
    pub purpose: Option<String>,
    pub reference: String,
    pub status: WireStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer input for a new wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub user_id: UserId,
    pub from_account_id: AccountId,
    pub beneficiary_name: String,
    pub beneficiary_address: Option<String>,
    pub bank_name: String,
    pub routing_number: String,
    pub account_number: String,
    pub international: Option<InternationalDetails>,
    pub amount: Money,
    pub purpose: Option<String>,
}

impl WireTransfer {
    pub fn submit(request: WireRequest, reference: String, now: DateTime<Utc>) -> DomainResult<Self> {
        let amount = request.amount.positive("amount")?;
        let (kind, international) = match request.international {
            Some(details) => (WireKind::International, Some(details.validated()?)),
            None => (WireKind::Domestic, None),
        };
        let fees = kind.fees();
        let total_debit = amount
            .checked_add(fees.total())
            .ok_or_else(|| DomainError::validation("amount too large"))?;

        Ok(Self {
            id: RequestId::new(),
            kind,
            user_id: request.user_id,
            from_account_id: request.from_account_id,
            beneficiary_name: required("beneficiaryName", &request.beneficiary_name)?,
            beneficiary_address: optional(request.beneficiary_address),
            bank_name: required("bankName", &request.bank_name)?,
            routing_number: routing_number(&request.routing_number)?,
            account_number: account_number(&request.account_number)?,
            international,
            amount,
            fees,
            total_debit,
            purpose: optional(request.purpose),
            reference,
            status: WireStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn fee_total(&self) -> Money {
        self.fees.total()
    }

    /// The single debit taken at submission: amount plus every fee.
    pub fn debit_posting(&self) -> Posting {
        let description = match &self.international {
            Some(intl) => format!(
                "International wire to {} ({})",
                self.beneficiary_name, intl.beneficiary_country
            ),
            None => format!("Domestic wire to {}", self.beneficiary_name),
        };
        Posting::debit(self.from_account_id, self.total_debit, description)
            .with_reference(self.reference.clone())
            .with_funds_check(FundsCheck::Strict)
    }

    /// Move to `next`. Returns the refund posting when the wire fails.
    pub fn transition(&mut self, next: WireStatus, now: DateTime<Utc>) -> DomainResult<Option<Posting>> {
        if !self.status.can_become(next) {
            return Err(DomainError::conflict(format!(
                "wire cannot move from {} to {}",
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        self.updated_at = now;

        if next == WireStatus::Failed {
            let refund = Posting::credit(
                self.from_account_id,
                self.total_debit,
                format!("Refund: failed wire to {}", self.beneficiary_name),
            )
            .with_reference(self.reference.clone())
            .with_funds_check(FundsCheck::Override);
            return Ok(Some(refund));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(international: Option<InternationalDetails>) -> WireRequest {
        WireRequest {
            user_id: UserId::new(),
            from_account_id: AccountId::new(),
            beneficiary_name: "ACME Supplies".into(),
            beneficiary_address: None,
            bank_name: "Big Bank".into(),
            routing_number: "026009593".into(),
            account_number: "000123456789".into(),
            international,
            amount: Money::from_cents(100_000),
            purpose: Some("invoice 42".into()),
        }
    }

    fn intl() -> InternationalDetails {
        InternationalDetails {
            swift_code: "deutdeff".into(),
            beneficiary_country: "Germany".into(),
            iban: Some("de89 3704 0044 0532 0130 00".into()),
            currency: "".into(),
        }
    }

    #[test]
    fn domestic_wire_adds_sender_fee() {
        let w = WireTransfer::submit(request(None), "r".into(), Utc::now()).unwrap();
        assert_eq!(w.kind, WireKind::Domestic);
        assert_eq!(w.total_debit, Money::from_cents(102_500));
        assert_eq!(w.debit_posting().amount, w.total_debit);
        assert_eq!(w.status, WireStatus::Pending);
    }

    #[test]
    fn international_wire_adds_all_three_fees() {
        let w = WireTransfer::submit(request(Some(intl())), "r".into(), Utc::now()).unwrap();
        assert_eq!(w.fee_total(), Money::from_cents(8_500));
        assert_eq!(w.total_debit, Money::from_cents(108_500));
        let details = w.international.as_ref().unwrap();
        assert_eq!(details.currency, "USD");
        assert_eq!(details.swift_code, "DEUTDEFF");
        assert_eq!(details.iban.as_deref(), Some("DE89370400440532013000"));
    }

    #[test]
    fn wire_validation() {
        let mut bad_routing = request(None);
        bad_routing.routing_number = "12345".into();
        assert!(WireTransfer::submit(bad_routing, "r".into(), Utc::now()).is_err());

        let mut zero = request(None);
        zero.amount = Money::zero();
        assert!(WireTransfer::submit(zero, "r".into(), Utc::now()).is_err());

        let mut no_swift = intl();
        no_swift.swift_code = "".into();
        assert!(WireTransfer::submit(request(Some(no_swift)), "r".into(), Utc::now()).is_err());
    }

    #[test]
    fn status_moves_forward_only() {
        let mut w = WireTransfer::submit(request(None), "r".into(), Utc::now()).unwrap();
        assert!(w.transition(WireStatus::Completed, Utc::now()).is_err());
        assert_eq!(w.transition(WireStatus::Processing, Utc::now()).unwrap(), None);
        assert_eq!(w.transition(WireStatus::Completed, Utc::now()).unwrap(), None);
        assert!(w.transition(WireStatus::Failed, Utc::now()).is_err());
    }

    #[test]
    fn failing_a_wire_yields_a_refund() {
        let mut w = WireTransfer::submit(request(None), "r".into(), Utc::now()).unwrap();
        let refund = w.transition(WireStatus::Failed, Utc::now()).unwrap().unwrap();
        assert_eq!(refund.delta(), w.total_debit);
        assert_eq!(refund.funds_check, FundsCheck::Override);
    }
}
