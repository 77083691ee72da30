//! Monthly account statements derived from ledger rows.
//!
//! Accounts start at zero and every balance change has a ledger row, so the
//! balance at any instant is the `balance_after` of the last row before it.

use core::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use fcb_core::{AccountId, DomainError, Money};

use crate::transaction::{Transaction, TransactionType};

/// A calendar month, parsed from `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementPeriod {
    first_day: NaiveDate,
}

impl StatementPeriod {
    pub fn containing(at: DateTime<Utc>) -> Self {
        let d = at.date_naive();
        Self {
            first_day: d.with_day(1).unwrap_or(d),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.first_day.and_time(chrono::NaiveTime::MIN))
    }

    pub fn end(&self) -> DateTime<Utc> {
        let next = self
            .first_day
            .checked_add_months(chrono::Months::new(1))
            .unwrap_or(NaiveDate::MAX);
        Utc.from_utc_datetime(&next.and_time(chrono::NaiveTime::MIN))
    }

    pub fn label(&self) -> String {
        self.first_day.format("%Y-%m").to_string()
    }
}

impl FromStr for StatementPeriod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d")
            .map(|first_day| Self { first_day })
            .map_err(|_| DomainError::validation("month must be formatted YYYY-MM"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    pub account_id: AccountId,
    pub month: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub opening_balance: Money,
    pub closing_balance: Money,
    pub total_credits: Money,
    pub total_debits: Money,
    /// Oldest first.
    pub transactions: Vec<Transaction>,
}

impl Statement {
    /// Build from the account's history in ledger append order, oldest first.
    ///
    /// Append order is authoritative: the closing balance is the
    /// `balance_after` of the last appended row dated inside the period, even
    /// if an earlier-appended row carries a later date.
    pub fn build(account_id: AccountId, period: StatementPeriod, history: &[Transaction]) -> Self {
        let (start, end) = (period.start(), period.end());

        let rows: Vec<&Transaction> = history.iter().filter(|t| t.account_id == account_id).collect();

        let balance_before = |cutoff: DateTime<Utc>| {
            rows.iter()
                .rev()
                .find(|t| t.transaction_date < cutoff)
                .map(|t| t.balance_after)
                .unwrap_or_default()
        };

        let in_period: Vec<Transaction> = rows
            .iter()
            .filter(|t| t.transaction_date >= start && t.transaction_date < end)
            .map(|t| (*t).clone())
            .collect();

        let total = |kind: TransactionType| -> Money {
            in_period.iter().filter(|t| t.kind == kind).map(|t| t.amount).sum()
        };

        Self {
            account_id,
            month: period.label(),
            period_start: start,
            period_end: end,
            opening_balance: balance_before(start),
            closing_balance: balance_before(end),
            total_credits: total(TransactionType::Credit),
            total_debits: total(TransactionType::Debit),
            transactions: in_period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Posting;

    fn row(posting: Posting, after: i64, at: DateTime<Utc>) -> Transaction {
        Transaction::record(&posting, Money::from_cents(after), at)
    }

    #[test]
    fn opening_and_closing_follow_balance_after() {
        let acct = AccountId::new();
        let d = |m: u32, day: u32| Utc.with_ymd_and_hms(2026, m, day, 12, 0, 0).unwrap();
        let history = vec![
            row(Posting::credit(acct, Money::from_cents(100_000), "Opening deposit"), 100_000, d(1, 5)),
            row(Posting::debit(acct, Money::from_cents(15_000), "Transfer"), 85_000, d(2, 3)),
            row(Posting::credit(acct, Money::from_cents(5_000), "Refund"), 90_000, d(2, 20)),
            row(Posting::debit(acct, Money::from_cents(1_000), "Coffee"), 89_000, d(3, 1)),
        ];

        let period: StatementPeriod = "2026-02".parse().unwrap();
        let s = Statement::build(acct, period, &history);
        assert_eq!(s.opening_balance, Money::from_cents(100_000));
        assert_eq!(s.closing_balance, Money::from_cents(90_000));
        assert_eq!(s.total_credits, Money::from_cents(5_000));
        assert_eq!(s.total_debits, Money::from_cents(15_000));
        assert_eq!(s.transactions.len(), 2);
        assert_eq!(s.month, "2026-02");
    }

    #[test]
    fn empty_month_carries_balance_forward() {
        let acct = AccountId::new();
        let at = Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap();
        let history = vec![row(Posting::credit(acct, Money::from_cents(500), "x"), 500, at)];
        let s = Statement::build(acct, "2026-01".parse().unwrap(), &history);
        assert_eq!(s.opening_balance, Money::from_cents(500));
        assert_eq!(s.closing_balance, Money::from_cents(500));
        assert!(s.transactions.is_empty());
    }

    #[test]
    fn closing_balance_follows_append_order_not_dates() {
        let acct = AccountId::new();
        let t1 = Utc.with_ymd_and_hms(2026, 4, 10, 9, 0, 0).unwrap();
        let t2 = t1 + chrono::Duration::seconds(1);
        let history = vec![
            row(Posting::credit(acct, Money::from_cents(100_000), "Opening deposit"), 100_000, t1),
            row(Posting::debit(acct, Money::from_cents(10_000), "Rent"), 90_000, t2),
            row(Posting::debit(acct, Money::from_cents(5_000), "Groceries"), 85_000, t1),
        ];

        let s = Statement::build(acct, "2026-04".parse().unwrap(), &history);
        assert_eq!(s.opening_balance, Money::zero());
        assert_eq!(s.closing_balance, Money::from_cents(85_000));
        assert_eq!(s.total_debits, Money::from_cents(15_000));
        let descriptions: Vec<&str> = s.transactions.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descriptions, ["Opening deposit", "Rent", "Groceries"]);
    }

    #[test]
    fn bad_month_is_rejected() {
        assert!("2026-13".parse::<StatementPeriod>().is_err());
        assert!("march".parse::<StatementPeriod>().is_err());
    }
}
