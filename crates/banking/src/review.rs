//! Admin review state shared by every approval-gated request.
//!
//! A request starts `pending` and is resolved exactly once: either approved
//! or rejected with a reason. `processed_by`/`processed_at` are stamped on
//! that single transition and never change afterwards.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fcb_core::{AdminId, DomainError, DomainResult};

/// Status vocabulary of a reviewable request.
pub trait Outcome: Copy + Eq + core::fmt::Debug {
    const PENDING: Self;
    const APPROVED: Self;
    const REJECTED: Self;

    fn as_str(&self) -> &'static str;
}

/// Status of external transfers and account applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Disapproved,
}

impl Outcome for ApprovalStatus {
    const PENDING: Self = ApprovalStatus::Pending;
    const APPROVED: Self = ApprovalStatus::Approved;
    const REJECTED: Self = ApprovalStatus::Disapproved;

    fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Disapproved => "disapproved",
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "disapproved" => Ok(ApprovalStatus::Disapproved),
            other => Err(DomainError::validation(format!(
                "status must be pending, approved or disapproved (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review<S> {
    pub status: S,
    pub processed_by: Option<AdminId>,
    pub processed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl<S: Outcome> Review<S> {
    pub fn pending() -> Self {
        Self {
            status: S::PENDING,
            processed_by: None,
            processed_at: None,
            rejection_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == S::PENDING
    }

    /// Fails with `Conflict` unless the request is still pending.
    pub fn ensure_pending(&self) -> DomainResult<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "request already {}",
                self.status.as_str()
            )))
        }
    }

    pub fn approve(&mut self, admin: AdminId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_pending()?;
        self.status = S::APPROVED;
        self.processed_by = Some(admin);
        self.processed_at = Some(now);
        Ok(())
    }

    pub fn reject(&mut self, admin: AdminId, now: DateTime<Utc>, reason: &str) -> DomainResult<()> {
        self.ensure_pending()?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("reason is required"));
        }
        self.status = S::REJECTED;
        self.processed_by = Some(admin);
        self.processed_at = Some(now);
        self.rejection_reason = Some(reason.to_string());
        Ok(())
    }
}

impl<S: Outcome> Default for Review<S> {
    fn default() -> Self {
        Self::pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn resolves_exactly_once() {
        let admin = AdminId::new();
        let t0 = Utc::now();
        let mut r: Review<ApprovalStatus> = Review::pending();
        r.approve(admin, t0).unwrap();

        let second = r.approve(AdminId::new(), t0 + Duration::minutes(5));
        assert!(matches!(second, Err(DomainError::Conflict(_))));
        assert!(r.reject(admin, t0, "late").is_err());
        assert_eq!(r.processed_at, Some(t0));
        assert_eq!(r.processed_by, Some(admin));
    }

    #[test]
    fn rejection_requires_reason_and_keeps_pending_on_failure() {
        let mut r: Review<ApprovalStatus> = Review::pending();
        assert!(matches!(r.reject(AdminId::new(), Utc::now(), "  "), Err(DomainError::Validation(_))));
        assert!(r.is_pending());

        r.reject(AdminId::new(), Utc::now(), " suspected fraud ").unwrap();
        assert_eq!(r.status, ApprovalStatus::Disapproved);
        assert_eq!(r.rejection_reason.as_deref(), Some("suspected fraud"));
    }
}
