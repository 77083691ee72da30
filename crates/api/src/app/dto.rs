//! Request bodies and query strings. Amounts arrive as raw JSON values so
//! numeric strings (`"150.00"`, `"$1,000"`) are accepted alongside numbers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use fcb_auth::{NewUserProfile, User};
use fcb_banking::{
    AccountType, ExternalTransferType, InternationalDetails, LimitKind, PersonalInfo, Recipient,
    TransactionType, WireRequest,
};
use fcb_core::{AccountId, DomainError, DomainResult, Money, UserId};
use fcb_infra::{ApplicationForm, ExternalTransferRequest, LimitIncreaseForm, ManualPosting, NewCustomer};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Customer login reply: the user's fields with the token alongside.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub access_code: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    #[serde(default)]
    pub amount: Value,
    #[serde(default, alias = "description")]
    pub memo: Option<String>,
}

impl TransferRequest {
    pub fn into_transfer(self, user_id: UserId) -> DomainResult<fcb_banking::InternalTransfer> {
        Ok(fcb_banking::InternalTransfer {
            user_id,
            from_account_id: self.from_account_id,
            to_account_id: self.to_account_id,
            amount: Money::parse_amount(&self.amount, "amount")?,
            memo: self.memo,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTransferBody {
    pub from_account_id: AccountId,
    #[serde(default)]
    pub recipient_name: String,
    #[serde(default)]
    pub recipient_account_number: String,
    #[serde(default)]
    pub recipient_routing_number: String,
    #[serde(default)]
    pub recipient_bank_name: String,
    pub recipient_phone: Option<String>,
    pub recipient_address: Option<String>,
    #[serde(default)]
    pub amount: Value,
    pub transfer_type: Option<String>,
    pub purpose: Option<String>,
}

impl ExternalTransferBody {
    pub fn into_request(self, user_id: UserId) -> DomainResult<ExternalTransferRequest> {
        let transfer_type = match self.transfer_type.as_deref() {
            Some(t) => t.parse::<ExternalTransferType>()?,
            None => ExternalTransferType::Ach,
        };
        Ok(ExternalTransferRequest {
            user_id,
            from_account_id: self.from_account_id,
            recipient: Recipient {
                name: self.recipient_name,
                account_number: self.recipient_account_number,
                routing_number: self.recipient_routing_number,
                bank_name: self.recipient_bank_name,
                phone: self.recipient_phone,
                address: self.recipient_address,
            },
            amount: Money::parse_amount(&self.amount, "amount")?,
            transfer_type,
            purpose: self.purpose,
        })
    }
}

/// Shared by the domestic and international wire routes; the SWIFT fields
/// are only read for international wires.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTransferBody {
    pub from_account_id: AccountId,
    #[serde(default)]
    pub beneficiary_name: String,
    pub beneficiary_address: Option<String>,
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub routing_number: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub amount: Value,
    pub purpose: Option<String>,
    #[serde(default)]
    pub swift_code: String,
    #[serde(default)]
    pub beneficiary_country: String,
    pub iban: Option<String>,
    #[serde(default)]
    pub currency: String,
}

impl WireTransferBody {
    pub fn into_request(self, user_id: UserId, international: bool) -> DomainResult<WireRequest> {
        let international = international.then(|| InternationalDetails {
            swift_code: self.swift_code,
            beneficiary_country: self.beneficiary_country,
            iban: self.iban,
            currency: self.currency,
        });
        Ok(WireRequest {
            user_id,
            from_account_id: self.from_account_id,
            beneficiary_name: self.beneficiary_name,
            beneficiary_address: self.beneficiary_address,
            bank_name: self.bank_name,
            routing_number: self.routing_number,
            account_number: self.account_number,
            international,
            amount: Money::parse_amount(&self.amount, "amount")?,
            purpose: self.purpose,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillPayBody {
    pub from_account_id: AccountId,
    #[serde(default)]
    pub payee_name: String,
    pub payee_account_number: Option<String>,
    #[serde(default)]
    pub amount: Value,
    pub memo: Option<String>,
}

impl BillPayBody {
    pub fn into_payment(self, user_id: UserId) -> DomainResult<fcb_banking::BillPayment> {
        Ok(fcb_banking::BillPayment {
            user_id,
            from_account_id: self.from_account_id,
            payee_name: self.payee_name,
            payee_account_number: self.payee_account_number,
            amount: Money::parse_amount(&self.amount, "amount")?,
            memo: self.memo,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitIncreaseBody {
    pub account_id: Option<AccountId>,
    #[serde(default)]
    pub current_limit: Value,
    #[serde(default)]
    pub requested_limit: Value,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub annual_income: Value,
    pub employment_status: Option<String>,
}

impl LimitIncreaseBody {
    pub fn into_form(self, kind: LimitKind, user_id: UserId) -> DomainResult<LimitIncreaseForm> {
        Ok(LimitIncreaseForm {
            kind,
            user_id,
            account_id: self.account_id,
            current_limit: Money::parse_non_negative(&self.current_limit, "currentLimit")?,
            requested_limit: Money::parse_amount(&self.requested_limit, "requestedLimit")?,
            reason: self.reason,
            annual_income: optional_money(&self.annual_income, "annualIncome")?,
            employment_status: self.employment_status,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationBody {
    pub account_type: String,
    pub personal_info: PersonalInfo,
    pub employment: Option<String>,
    #[serde(default)]
    pub annual_income: Value,
    #[serde(default)]
    pub initial_deposit: Value,
}

impl ApplicationBody {
    pub fn into_form(self) -> DomainResult<ApplicationForm> {
        Ok(ApplicationForm {
            account_type: self.account_type.parse::<AccountType>()?,
            personal_info: self.personal_info,
            employment: self.employment,
            annual_income: optional_money(&self.annual_income, "annualIncome")?,
            initial_deposit: Money::parse_non_negative(&self.initial_deposit, "initialDeposit")?,
        })
    }
}

/// Disapproval or denial. The reason is required; a missing one is reported
/// by the workflow.
#[derive(Debug, Default, Deserialize)]
pub struct RejectBody {
    #[serde(default, alias = "rejectionReason")]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningAccount {
    pub account_type: String,
    #[serde(default)]
    pub initial_balance: Value,
}

/// Admin-entered customer. Either a list of `accounts` or a single
/// `accountType` / `initialBalance` pair.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerBody {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub password: String,
    #[serde(default)]
    pub accounts: Vec<OpeningAccount>,
    pub account_type: Option<String>,
    #[serde(default)]
    pub initial_balance: Value,
}

impl CreateCustomerBody {
    pub fn into_customer(self) -> DomainResult<NewCustomer> {
        let mut openings = self.accounts;
        if let Some(account_type) = self.account_type {
            openings.push(OpeningAccount {
                account_type,
                initial_balance: self.initial_balance,
            });
        }
        let accounts = openings
            .into_iter()
            .map(|o| -> DomainResult<(AccountType, Money)> {
                Ok((
                    o.account_type.parse::<AccountType>()?,
                    Money::parse_non_negative(&o.initial_balance, "initialBalance")?,
                ))
            })
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(NewCustomer {
            profile: NewUserProfile {
                username: self.username,
                email: self.email,
                first_name: self.first_name,
                last_name: self.last_name,
                phone: self.phone,
            },
            password: self.password,
            accounts,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualPostingBody {
    pub account_id: AccountId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub description: String,
}

impl ManualPostingBody {
    pub fn into_posting(self) -> DomainResult<ManualPosting> {
        Ok(ManualPosting {
            account_id: self.account_id,
            kind: self.kind.parse::<TransactionType>()?,
            amount: Money::parse_amount(&self.amount, "amount")?,
            description: self.description,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UserStatusBody {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireStatusBody {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireKindQuery {
    pub kind: Option<String>,
}

fn optional_money(value: &Value, field: &str) -> DomainResult<Option<Money>> {
    if value.is_null() {
        return Ok(None);
    }
    Money::parse_non_negative(value, field).map(Some)
}

/// Parse an optional status/kind query parameter.
pub fn parse_filter<T>(value: Option<&str>) -> DomainResult<Option<T>>
where
    T: core::str::FromStr<Err = DomainError>,
{
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::parse)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transfer_amounts_accept_numbers_and_strings() {
        let from = AccountId::new();
        let to = AccountId::new();
        for amount in [json!(150), json!("150.00"), json!("$150")] {
            let body: TransferRequest = serde_json::from_value(json!({
                "fromAccountId": from,
                "toAccountId": to,
                "amount": amount,
            }))
            .unwrap();
            let transfer = body.into_transfer(UserId::new()).unwrap();
            assert_eq!(transfer.amount, Money::from_cents(15_000));
        }
    }

    #[test]
    fn missing_or_non_positive_amounts_are_rejected() {
        for amount in [json!(null), json!(0), json!(-10), json!("abc")] {
            let body: TransferRequest = serde_json::from_value(json!({
                "fromAccountId": AccountId::new(),
                "toAccountId": AccountId::new(),
                "amount": amount,
            }))
            .unwrap();
            assert!(body.into_transfer(UserId::new()).is_err());
        }
    }

    #[test]
    fn create_customer_accepts_the_single_account_shorthand() {
        let body: CreateCustomerBody = serde_json::from_value(json!({
            "username": "mjones",
            "email": "mjones@example.com",
            "firstName": "Mary",
            "lastName": "Jones",
            "password": "secret123",
            "accountType": "savings",
            "initialBalance": "250.50",
        }))
        .unwrap();
        let customer = body.into_customer().unwrap();
        assert_eq!(customer.accounts, vec![(AccountType::Savings, Money::from_cents(25_050))]);
    }

    #[test]
    fn empty_filters_mean_no_filter() {
        let status: Option<fcb_banking::ApprovalStatus> = parse_filter(Some(" ")).unwrap();
        assert_eq!(status, None);
        assert!(parse_filter::<fcb_banking::ApprovalStatus>(Some("sideways")).is_err());
    }
}
