//! Online account-opening applications and the access codes they produce.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fcb_core::{AdminId, DomainError, DomainResult, Money, RequestId};

use crate::account::AccountType;
use crate::reference;
use crate::review::{ApprovalStatus, Review};
use crate::transfer::{optional, required};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub ssn_last4: String,
}

impl PersonalInfo {
    pub fn validated(self, today: NaiveDate) -> DomainResult<Self> {
        let email = required("email", &self.email)?;
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(DomainError::validation("email is not valid"));
        }
        let ssn = self.ssn_last4.trim();
        if ssn.len() != 4 || !ssn.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::validation("ssnLast4 must be 4 digits"));
        }
        let adult = self
            .date_of_birth
            .checked_add_months(chrono::Months::new(18 * 12))
            .is_some_and(|d| d <= today);
        if !adult {
            return Err(DomainError::validation("applicant must be at least 18 years old"));
        }
        Ok(Self {
            first_name: required("firstName", &self.first_name)?,
            last_name: required("lastName", &self.last_name)?,
            email,
            phone: required("phone", &self.phone)?,
            date_of_birth: self.date_of_birth,
            address: required("address", &self.address)?,
            ssn_last4: ssn.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountApplication {
    pub id: RequestId,
    pub account_type: AccountType,
    pub personal_info: PersonalInfo,
    pub employment: Option<String>,
    pub annual_income: Option<Money>,
    pub initial_deposit: Money,
    #[serde(flatten)]
    pub review: Review<ApprovalStatus>,
    pub access_code: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl AccountApplication {
    pub fn submit(
        account_type: AccountType,
        personal_info: PersonalInfo,
        employment: Option<String>,
        annual_income: Option<Money>,
        initial_deposit: Money,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if initial_deposit.is_negative() {
            return Err(DomainError::validation("initialDeposit cannot be negative"));
        }
        Ok(Self {
            id: RequestId::new(),
            account_type,
            personal_info: personal_info.validated(now.date_naive())?,
            employment: optional(employment),
            annual_income,
            initial_deposit,
            review: Review::pending(),
            access_code: None,
            submitted_at: now,
        })
    }

    /// Approve and issue the one-time enrollment code.
    pub fn approve(&mut self, admin: AdminId, now: DateTime<Utc>) -> DomainResult<AccessCode> {
        self.review.approve(admin, now)?;
        let code = AccessCode {
            code: reference::access_code(),
            application_id: self.id,
            created_at: now,
            used_at: None,
        };
        self.access_code = Some(code.code.clone());
        Ok(code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCode {
    pub code: String,
    pub application_id: RequestId,
    pub created_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl AccessCode {
    pub fn consume(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.used_at.is_some() {
            return Err(DomainError::conflict("access code has already been used"));
        }
        self.used_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(dob: NaiveDate) -> PersonalInfo {
        PersonalInfo {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "555-0100".into(),
            date_of_birth: dob,
            address: "1 Analytical Way".into(),
            ssn_last4: "1234".into(),
        }
    }

    fn dob(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    #[test]
    fn approval_issues_single_use_code() {
        let mut app = AccountApplication::submit(
            AccountType::Checking,
            info(dob(1990)),
            None,
            None,
            Money::from_cents(50_000),
            Utc::now(),
        )
        .unwrap();

        let mut code = app.approve(AdminId::new(), Utc::now()).unwrap();
        assert_eq!(app.access_code.as_deref(), Some(code.code.as_str()));
        assert!(code.code.starts_with("AC-"));
        assert!(app.approve(AdminId::new(), Utc::now()).is_err());

        code.consume(Utc::now()).unwrap();
        assert!(matches!(code.consume(Utc::now()), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn minors_and_bad_ssn_are_rejected() {
        let now = Utc::now();
        let minor = info(now.date_naive());
        assert!(AccountApplication::submit(AccountType::Savings, minor, None, None, Money::zero(), now).is_err());

        let mut bad_ssn = info(dob(1980));
        bad_ssn.ssn_last4 = "12a4".into();
        assert!(AccountApplication::submit(AccountType::Savings, bad_ssn, None, None, Money::zero(), now).is_err());
    }

    #[test]
    fn negative_initial_deposit_is_rejected() {
        let res = AccountApplication::submit(
            AccountType::Business,
            info(dob(1975)),
            None,
            None,
            Money::from_cents(-100),
            Utc::now(),
        );
        assert!(res.is_err());
    }
}
