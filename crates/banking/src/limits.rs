//! Credit and debit limit increase requests.
//!
//! Approving one only flips its status; no account limit is stored anywhere.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fcb_core::{AccountId, DomainError, DomainResult, Money, RequestId, UserId};

use crate::review::{Outcome, Review};
use crate::transfer::{optional, required};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitKind {
    Credit,
    Debit,
}

impl LimitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitKind::Credit => "credit",
            LimitKind::Debit => "debit",
        }
    }
}

impl FromStr for LimitKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(LimitKind::Credit),
            "debit" => Ok(LimitKind::Debit),
            other => Err(DomainError::validation(format!(
                "limit kind must be credit or debit (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitRequestStatus {
    Pending,
    Approved,
    Denied,
}

impl Outcome for LimitRequestStatus {
    const PENDING: Self = LimitRequestStatus::Pending;
    const APPROVED: Self = LimitRequestStatus::Approved;
    const REJECTED: Self = LimitRequestStatus::Denied;

    fn as_str(&self) -> &'static str {
        match self {
            LimitRequestStatus::Pending => "pending",
            LimitRequestStatus::Approved => "approved",
            LimitRequestStatus::Denied => "denied",
        }
    }
}

impl FromStr for LimitRequestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LimitRequestStatus::Pending),
            "approved" => Ok(LimitRequestStatus::Approved),
            "denied" => Ok(LimitRequestStatus::Denied),
            other => Err(DomainError::validation(format!(
                "status must be pending, approved or denied (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitIncreaseRequest {
    pub id: RequestId,
    pub kind: LimitKind,
    pub user_id: UserId,
    pub account_id: Option<AccountId>,
    pub current_limit: Money,
    pub requested_limit: Money,
    pub reason: String,
    pub annual_income: Option<Money>,
    pub employment_status: Option<String>,
    #[serde(flatten)]
    pub review: Review<LimitRequestStatus>,
    pub submitted_at: DateTime<Utc>,
}

impl LimitIncreaseRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        kind: LimitKind,
        user_id: UserId,
        account_id: Option<AccountId>,
        current_limit: Money,
        requested_limit: Money,
        reason: &str,
        annual_income: Option<Money>,
        employment_status: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if current_limit.is_negative() {
            return Err(DomainError::validation("currentLimit cannot be negative"));
        }
        let requested_limit = requested_limit.positive("requestedLimit")?;
        if requested_limit <= current_limit {
            return Err(DomainError::validation("requestedLimit must exceed currentLimit"));
        }
        Ok(Self {
            id: RequestId::new(),
            kind,
            user_id,
            account_id,
            current_limit,
            requested_limit,
            reason: required("reason", reason)?,
            annual_income,
            employment_status: optional(employment_status),
            review: Review::pending(),
            submitted_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcb_core::AdminId;

    fn submit(current: i64, requested: i64, reason: &str) -> DomainResult<LimitIncreaseRequest> {
        LimitIncreaseRequest::submit(
            LimitKind::Credit,
            UserId::new(),
            None,
            Money::from_cents(current),
            Money::from_cents(requested),
            reason,
            None,
            None,
            Utc::now(),
        )
    }

    #[test]
    fn requested_limit_must_be_higher() {
        assert!(submit(500_000, 1_000_000, "moving house").is_ok());
        assert!(submit(500_000, 500_000, "same").is_err());
        assert!(submit(0, 0, "zero").is_err());
        assert!(submit(100, 200, "").is_err());
    }

    #[test]
    fn denial_uses_denied_status() {
        let mut r = submit(100, 200, "travel").unwrap();
        r.review.reject(AdminId::new(), Utc::now(), "income not verified").unwrap();
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], "denied");
        assert_eq!(v["rejectionReason"], "income not verified");
    }
}
