use core::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use fcb_core::{AccountId, DomainError, DomainResult, Money, UserId};

/// Product type of a deposit account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Checking,
    Savings,
    Business,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::Business => "business",
        }
    }

    /// Business accounts may carry a negative balance; personal ones may not.
    pub fn allows_overdraft(&self) -> bool {
        matches!(self, AccountType::Business)
    }

    /// Human label used in ledger descriptions ("Checking", "Savings", ...).
    pub fn label(&self) -> &'static str {
        match self {
            AccountType::Checking => "Checking",
            AccountType::Savings => "Savings",
            AccountType::Business => "Business",
        }
    }
}

impl core::fmt::Display for AccountType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "checking" => Ok(AccountType::Checking),
            "savings" => Ok(AccountType::Savings),
            "business" => Ok(AccountType::Business),
            other => Err(DomainError::validation(format!(
                "accountType must be one of checking, savings, business (got '{other}')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Suspended,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Closed => "closed",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AccountStatus::Active),
            "suspended" => Ok(AccountStatus::Suspended),
            "closed" => Ok(AccountStatus::Closed),
            other => Err(DomainError::validation(format!("unknown account status '{other}'"))),
        }
    }
}

/// How strictly a balance adjustment is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundsCheck {
    /// Customer-initiated debits: the total must be covered by the balance,
    /// for every account type.
    Strict,
    /// Personal accounts may not go negative; business accounts may.
    Standard,
    /// Back-office override: no funds or status check.
    Override,
}

/// A customer deposit account.
///
/// The balance is only ever changed through [`Account::adjust_balance`], and
/// stores pair every adjustment with exactly one ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub account_number: String,
    pub routing_number: String,
    pub account_type: AccountType,
    pub balance: Money,
    pub status: AccountStatus,
    pub open_date: DateTime<Utc>,
}

impl Account {
    /// Open a new, empty, active account with a freshly generated number.
    pub fn open(
        user_id: UserId,
        account_type: AccountType,
        routing_number: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            user_id,
            account_number: generate_account_number(),
            routing_number: routing_number.into(),
            account_type,
            balance: Money::zero(),
            status: AccountStatus::Active,
            open_date: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn last4(&self) -> &str {
        let n = self.account_number.len();
        &self.account_number[n.saturating_sub(4)..]
    }

    /// `Checking ••1234`, as shown in ledger descriptions.
    pub fn display_name(&self) -> String {
        format!("{} ••{}", self.account_type.label(), self.last4())
    }

    /// Apply a signed delta to the balance and return the new balance.
    ///
    /// Unless the check is [`FundsCheck::Override`], the account must be
    /// active and a debit may not leave the balance below what the check
    /// permits. The balance is untouched on error.
    pub fn adjust_balance(&mut self, delta: Money, check: FundsCheck) -> DomainResult<Money> {
        if check != FundsCheck::Override && !self.is_active() {
            return Err(DomainError::validation(format!(
                "account {} is {}",
                self.display_name(),
                self.status.as_str()
            )));
        }

        let next = self
            .balance
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("balance overflow"))?
            .bounded("balance")?;

        if delta.is_negative() && next.is_negative() {
            let refused = match check {
                FundsCheck::Strict => true,
                FundsCheck::Standard => !self.account_type.allows_overdraft(),
                FundsCheck::Override => false,
            };
            if refused {
                return Err(DomainError::insufficient_funds(
                    self.balance.amount(),
                    delta.negate().amount(),
                ));
            }
        }

        self.balance = next;
        Ok(next)
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            account_type: self.account_type,
            account_number: mask_account_number(&self.account_number),
            balance: self.balance,
        }
    }
}

/// Compact view of an account used in receipts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: AccountId,
    pub account_type: AccountType,
    pub account_number: String,
    pub balance: Money,
}

/// `••••••1234`
pub fn mask_account_number(number: &str) -> String {
    let n = number.chars().count();
    if n <= 4 {
        return number.to_string();
    }
    let visible: String = number.chars().skip(n - 4).collect();
    format!("{}{}", "•".repeat(n - 4), visible)
}

/// Ten random digits, never starting with zero.
pub fn generate_account_number() -> String {
    let mut rng = rand::thread_rng();
    let mut out = String::with_capacity(10);
    out.push(char::from(b'0' + rng.gen_range(1..=9u8)));
    for _ in 0..9 {
        out.push(char::from(b'0' + rng.gen_range(0..=9u8)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(kind: AccountType, cents: i64) -> Account {
        let mut a = Account::open(UserId::new(), kind, "021000089", Utc::now());
        a.balance = Money::from_cents(cents);
        a
    }

    #[test]
    fn generated_numbers_have_ten_digits() {
        for _ in 0..50 {
            let n = generate_account_number();
            assert_eq!(n.len(), 10);
            assert!(n.chars().all(|c| c.is_ascii_digit()));
            assert!(!n.starts_with('0'));
        }
    }

    #[test]
    fn personal_accounts_cannot_be_overdrawn() {
        for kind in [AccountType::Checking, AccountType::Savings] {
            let mut a = account(kind, 10_000);
            let err = a.adjust_balance(Money::from_cents(-10_001), FundsCheck::Standard).unwrap_err();
            assert!(matches!(err, DomainError::InsufficientFunds { .. }));
            assert_eq!(a.balance, Money::from_cents(10_000));
        }
    }

    #[test]
    fn business_accounts_may_go_negative_without_strict_check() {
        let mut a = account(AccountType::Business, 100);
        let after = a.adjust_balance(Money::from_cents(-500), FundsCheck::Standard).unwrap();
        assert_eq!(after, Money::from_cents(-400));

        let mut b = account(AccountType::Business, 100);
        assert!(b.adjust_balance(Money::from_cents(-500), FundsCheck::Strict).is_err());
    }

    #[test]
    fn override_skips_funds_and_status_checks() {
        let mut a = account(AccountType::Savings, 0);
        a.status = AccountStatus::Suspended;
        let after = a.adjust_balance(Money::from_cents(-2_500), FundsCheck::Override).unwrap();
        assert_eq!(after, Money::from_cents(-2_500));
    }

    #[test]
    fn inactive_accounts_refuse_checked_postings() {
        let mut a = account(AccountType::Checking, 10_000);
        a.status = AccountStatus::Closed;
        assert!(matches!(
            a.adjust_balance(Money::from_cents(100), FundsCheck::Standard),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn exact_balance_debit_is_allowed() {
        let mut a = account(AccountType::Checking, 15_000);
        assert_eq!(
            a.adjust_balance(Money::from_cents(-15_000), FundsCheck::Strict).unwrap(),
            Money::zero()
        );
    }

    #[test]
    fn balances_stay_within_the_ledger_range() {
        let mut a = account(AccountType::Checking, Money::MAX_CENTS - 100);
        let err = a.adjust_balance(Money::from_cents(101), FundsCheck::Override).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(a.balance, Money::from_cents(Money::MAX_CENTS - 100));
        assert_eq!(a.adjust_balance(Money::from_cents(100), FundsCheck::Strict).unwrap(), Money::max());
    }

    #[test]
    fn masking_keeps_last_four() {
        assert_eq!(mask_account_number("1234567890"), "••••••7890");
        assert_eq!(mask_account_number("123"), "123");
    }

    #[test]
    fn account_type_parses_case_insensitively() {
        assert_eq!("Savings".parse::<AccountType>().unwrap(), AccountType::Savings);
        assert!("crypto".parse::<AccountType>().is_err());
    }
}
