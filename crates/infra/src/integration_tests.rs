//! Service-level tests against the in-memory store.
//!
//! Verifies:
//! - Transfers conserve money and write one ledger row per leg
//! - Invalid requests are refused before anything changes
//! - Approval-gated requests resolve exactly once
//! - Ledger rows are never rewritten or removed

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use fcb_auth::{Hs256JwtValidator, NewUserProfile, User, UserStatus};
    use fcb_banking::{
        Account, AccountType, ApprovalStatus, BillPayment, ExternalTransferType,
        InternalTransfer, InternationalDetails, LimitKind, LimitRequestStatus, PersonalInfo,
        Posting, Recipient, TransactionType, WireKind, WireRequest, WireStatus,
    };
    use fcb_core::{AccountId, AdminId, Money, UserId};

    use crate::approvals::{ApplicationForm, LimitIncreaseForm};
    use crate::back_office::{ManualPosting, NewCustomer};
    use crate::config::DEFAULT_ROUTING_NUMBER;
    use crate::store::{AccountStore, BankStore, Decision, InMemoryBankStore, LedgerStore, Page, WorkflowStore};
    use crate::transfer_engine::ExternalTransferRequest;
    use crate::{AccountService, ApprovalWorkflow, BackOffice, BankError, SessionService, TransferEngine};

    struct Bank {
        store: Arc<InMemoryBankStore>,
        engine: TransferEngine,
        approvals: ApprovalWorkflow,
        back_office: BackOffice,
        accounts: AccountService,
        sessions: SessionService,
    }

    fn bank() -> Bank {
        let store = Arc::new(InMemoryBankStore::new());
        let dyn_store: Arc<dyn BankStore> = store.clone();
        let tokens = Arc::new(Hs256JwtValidator::new(b"test-secret".to_vec(), Duration::minutes(5)));
        Bank {
            engine: TransferEngine::new(dyn_store.clone()),
            approvals: ApprovalWorkflow::new(dyn_store.clone(), DEFAULT_ROUTING_NUMBER),
            back_office: BackOffice::new(dyn_store.clone(), DEFAULT_ROUTING_NUMBER),
            accounts: AccountService::new(dyn_store.clone()),
            sessions: SessionService::new(dyn_store, tokens),
            store,
        }
    }

    fn dollars(d: i64) -> Money {
        Money::from_cents(d * 100)
    }

    /// Customer with checking and savings opened at the given balances.
    async fn customer(bank: &Bank, username: &str, checking: i64, savings: i64) -> (User, Account, Account) {
        let (user, accounts) = bank
            .back_office
            .create_customer(NewCustomer {
                profile: NewUserProfile {
                    username: username.to_string(),
                    email: format!("{username}@example.com"),
                    first_name: "Test".to_string(),
                    last_name: "Customer".to_string(),
                    phone: None,
                },
                password: "password123".to_string(),
                accounts: vec![
                    (AccountType::Checking, dollars(checking)),
                    (AccountType::Savings, dollars(savings)),
                ],
            })
            .await
            .unwrap();
        (user, accounts[0].clone(), accounts[1].clone())
    }

    async fn balance(bank: &Bank, id: AccountId) -> Money {
        bank.store.find_account(id).await.unwrap().unwrap().balance
    }

    fn transfer(user: UserId, from: AccountId, to: AccountId, amount: Money) -> InternalTransfer {
        InternalTransfer {
            user_id: user,
            from_account_id: from,
            to_account_id: to,
            amount,
            memo: None,
        }
    }

    fn recipient(routing: &str) -> Recipient {
        Recipient {
            name: "Acme Supplies".to_string(),
            account_number: "123456789".to_string(),
            routing_number: routing.to_string(),
            bank_name: "Other Bank".to_string(),
            phone: None,
            address: None,
        }
    }

    fn external(user: UserId, from: AccountId, amount: Money, routing: &str) -> ExternalTransferRequest {
        ExternalTransferRequest {
            user_id: user,
            from_account_id: from,
            recipient: recipient(routing),
            amount,
            transfer_type: ExternalTransferType::Ach,
            purpose: Some("invoice 42".to_string()),
        }
    }

    fn wire(user: UserId, from: AccountId, amount: Money, international: Option<InternationalDetails>) -> WireRequest {
        WireRequest {
            user_id: user,
            from_account_id: from,
            beneficiary_name: "Jane Roe".to_string(),
            beneficiary_address: None,
            bank_name: "Far Away Bank".to_string(),
            routing_number: "026009593".to_string(),
            account_number: "987654321".to_string(),
            international,
            amount,
            purpose: None,
        }
    }

    #[tokio::test]
    async fn internal_transfer_conserves_money_and_writes_two_rows() {
        let bank = bank();
        let (user, checking, savings) = customer(&bank, "alice", 1000, 500).await;

        let receipt = bank
            .engine
            .internal(transfer(user.id, checking.id, savings.id, dollars(150)))
            .await
            .unwrap();

        assert_eq!(receipt.from_account.balance, dollars(850));
        assert_eq!(receipt.to_account.as_ref().map(|a| a.balance), Some(dollars(650)));
        assert_eq!(balance(&bank, checking.id).await, dollars(850));
        assert_eq!(balance(&bank, savings.id).await, dollars(650));

        let debit = &bank.store.transactions_for_account(checking.id, Page::default()).await.unwrap()[0];
        let credit = &bank.store.transactions_for_account(savings.id, Page::default()).await.unwrap()[0];
        assert_eq!(debit.kind, TransactionType::Debit);
        assert_eq!(credit.kind, TransactionType::Credit);
        assert_eq!(debit.amount, dollars(150));
        assert_eq!(credit.amount, dollars(150));
        assert_eq!(debit.balance_after, dollars(850));
        assert_eq!(credit.balance_after, dollars(650));
        assert_eq!(debit.reference.as_deref(), Some(receipt.reference.as_str()));
        assert_eq!(credit.reference, debit.reference);
        assert!(debit.description.starts_with("Transfer to Savings ••"));
    }

    #[tokio::test]
    async fn non_positive_amounts_change_nothing() {
        let bank = bank();
        let (user, checking, savings) = customer(&bank, "brad", 1000, 500).await;
        let rows_before = bank.store.count_transactions().await.unwrap();

        for amount in [Money::zero(), Money::from_cents(-500)] {
            let err = bank
                .engine
                .internal(transfer(user.id, checking.id, savings.id, amount))
                .await
                .unwrap_err();
            assert!(matches!(err, BankError::Validation(_)), "{err:?}");

            let err = bank
                .engine
                .bill_pay(BillPayment {
                    user_id: user.id,
                    from_account_id: checking.id,
                    payee_name: "Power Co".to_string(),
                    payee_account_number: None,
                    amount,
                    memo: None,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, BankError::Validation(_)));

            let err = bank.engine.wire(wire(user.id, checking.id, amount, None)).await.unwrap_err();
            assert!(matches!(err, BankError::Validation(_)));

            let err = bank
                .engine
                .external(external(user.id, checking.id, amount, "021000021"))
                .await
                .unwrap_err();
            assert!(matches!(err, BankError::Validation(_)));
        }

        assert_eq!(balance(&bank, checking.id).await, dollars(1000));
        assert_eq!(bank.store.count_transactions().await.unwrap(), rows_before);
        assert!(bank.store.list_external_transfers(None).await.unwrap().is_empty());
        assert!(bank.store.list_wires(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transfer_beyond_balance_is_refused_atomically() {
        let bank = bank();
        let (user, checking, savings) = customer(&bank, "carol", 100, 0).await;
        let rows_before = bank.store.count_transactions().await.unwrap();

        let err = bank
            .engine
            .internal(transfer(user.id, checking.id, savings.id, dollars(101)))
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::InsufficientFunds { .. }));
        assert_eq!(balance(&bank, checking.id).await, dollars(100));
        assert_eq!(balance(&bank, savings.id).await, Money::zero());
        assert_eq!(bank.store.count_transactions().await.unwrap(), rows_before);
    }

    #[tokio::test]
    async fn transfers_between_customers_or_to_self_are_refused() {
        let bank = bank();
        let (alice, a_checking, _) = customer(&bank, "alice", 100, 0).await;
        let (_, b_checking, _) = customer(&bank, "bobby", 100, 0).await;

        let err = bank
            .engine
            .internal(transfer(alice.id, a_checking.id, b_checking.id, dollars(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::NotFound("account")));

        let err = bank
            .engine
            .internal(transfer(alice.id, a_checking.id, a_checking.id, dollars(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::Validation(_)));
    }

    #[tokio::test]
    async fn concurrent_transfers_never_overdraw() {
        let bank = Arc::new(bank());
        let (user, checking, savings) = customer(&bank, "dave", 1000, 0).await;

        let mut handles = Vec::new();
        for _ in 0..15 {
            let bank = bank.clone();
            handles.push(tokio::spawn(async move {
                bank.engine
                    .internal(transfer(user.id, checking.id, savings.id, dollars(100)))
                    .await
                    .is_ok()
            }));
        }
        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(balance(&bank, checking.id).await, Money::zero());
        assert_eq!(balance(&bank, savings.id).await, dollars(1000));
    }

    #[tokio::test]
    async fn external_transfer_routing_number_must_have_nine_digits() {
        let bank = bank();
        let (user, checking, _) = customer(&bank, "erin", 1000, 0).await;

        for routing in ["12345678", "1234567890"] {
            let err = bank
                .engine
                .external(external(user.id, checking.id, dollars(10), routing))
                .await
                .unwrap_err();
            assert!(matches!(err, BankError::Validation(_)));
        }
        let mut bad_wire = wire(user.id, checking.id, dollars(10), None);
        bad_wire.routing_number = "12345".to_string();
        assert!(matches!(bank.engine.wire(bad_wire).await, Err(BankError::Validation(_))));
        assert_eq!(balance(&bank, checking.id).await, dollars(1000));
    }

    #[tokio::test]
    async fn external_transfer_moves_money_only_on_approval_and_resolves_once() {
        let bank = bank();
        let (user, checking, _) = customer(&bank, "frank", 1000, 0).await;
        let admin = AdminId::new();

        let pending = bank
            .engine
            .external(external(user.id, checking.id, dollars(200), "021000021"))
            .await
            .unwrap();
        assert_eq!(pending.review.status, ApprovalStatus::Pending);
        assert_eq!(balance(&bank, checking.id).await, dollars(1000));

        let (approved, posted) = bank
            .approvals
            .resolve_external_transfer(pending.id, admin, Decision::Approve)
            .await
            .unwrap();
        assert_eq!(approved.review.status, ApprovalStatus::Approved);
        assert_eq!(approved.review.processed_by, Some(admin));
        let processed_at = approved.review.processed_at;
        assert!(processed_at.is_some());
        assert_eq!(posted.unwrap().transaction.balance_after, dollars(800));
        assert_eq!(balance(&bank, checking.id).await, dollars(800));

        let err = bank
            .approvals
            .resolve_external_transfer(pending.id, AdminId::new(), Decision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::Conflict(_)));
        let err = bank
            .approvals
            .resolve_external_transfer(pending.id, admin, Decision::Reject("changed my mind".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::Conflict(_)));

        let stored = bank.store.list_external_transfers(None).await.unwrap();
        assert_eq!(stored[0].review.processed_at, processed_at);
        assert_eq!(stored[0].review.processed_by, Some(admin));
        assert_eq!(balance(&bank, checking.id).await, dollars(800));
    }

    #[tokio::test]
    async fn external_transfer_without_funds_stays_pending() {
        let bank = bank();
        let (user, checking, _) = customer(&bank, "gina", 50, 0).await;
        let pending = bank
            .engine
            .external(external(user.id, checking.id, dollars(75), "021000021"))
            .await
            .unwrap();

        let err = bank
            .approvals
            .resolve_external_transfer(pending.id, AdminId::new(), Decision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::InsufficientFunds { .. }));

        let pending_now = bank.approvals.external_transfers(Some(ApprovalStatus::Pending)).await.unwrap();
        assert_eq!(pending_now.len(), 1);
        assert!(pending_now[0].review.processed_at.is_none());

        let (rejected, posted) = bank
            .approvals
            .resolve_external_transfer(pending.id, AdminId::new(), Decision::Reject("insufficient funds".into()))
            .await
            .unwrap();
        assert_eq!(rejected.review.status, ApprovalStatus::Disapproved);
        assert_eq!(rejected.review.rejection_reason.as_deref(), Some("insufficient funds"));
        assert!(posted.is_none());
        assert_eq!(balance(&bank, checking.id).await, dollars(50));
    }

    #[tokio::test]
    async fn disapproval_requires_a_reason() {
        let bank = bank();
        let (user, checking, _) = customer(&bank, "hank", 100, 0).await;
        let pending = bank
            .engine
            .external(external(user.id, checking.id, dollars(10), "021000021"))
            .await
            .unwrap();

        let err = bank
            .approvals
            .resolve_external_transfer(pending.id, AdminId::new(), Decision::Reject("  ".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::Validation(_)));
        assert_eq!(
            bank.approvals.external_transfers(Some(ApprovalStatus::Pending)).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn wires_debit_amount_plus_fees_and_refund_on_failure() {
        let bank = bank();
        let (user, checking, _) = customer(&bank, "irene", 1000, 0).await;

        let (domestic, receipt) = bank.engine.wire(wire(user.id, checking.id, dollars(100), None)).await.unwrap();
        assert_eq!(domestic.kind, WireKind::Domestic);
        assert_eq!(receipt.fee, dollars(25));
        assert_eq!(receipt.total_debit, dollars(125));
        assert_eq!(balance(&bank, checking.id).await, dollars(875));

        let details = InternationalDetails {
            swift_code: "deutdeff".to_string(),
            beneficiary_country: "Germany".to_string(),
            iban: None,
            currency: "EUR".to_string(),
        };
        let (intl, receipt) = bank
            .engine
            .wire(wire(user.id, checking.id, dollars(100), Some(details)))
            .await
            .unwrap();
        assert_eq!(intl.kind, WireKind::International);
        assert_eq!(receipt.fee, dollars(85));
        assert_eq!(balance(&bank, checking.id).await, dollars(690));

        let (failed, refund) = bank
            .back_office
            .update_wire_status(WireKind::International, intl.id, WireStatus::Failed)
            .await
            .unwrap();
        assert_eq!(failed.status, WireStatus::Failed);
        let refund = refund.unwrap();
        assert_eq!(refund.transaction.kind, TransactionType::Credit);
        assert_eq!(refund.transaction.amount, dollars(185));
        assert_eq!(balance(&bank, checking.id).await, dollars(875));

        bank.back_office
            .update_wire_status(WireKind::Domestic, domestic.id, WireStatus::Processing)
            .await
            .unwrap();
        let (done, refund) = bank
            .back_office
            .update_wire_status(WireKind::Domestic, domestic.id, WireStatus::Completed)
            .await
            .unwrap();
        assert_eq!(done.status, WireStatus::Completed);
        assert!(refund.is_none());
        let err = bank
            .back_office
            .update_wire_status(WireKind::Domestic, domestic.id, WireStatus::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::Conflict(_)));
    }

    #[tokio::test]
    async fn wire_total_must_be_covered() {
        let bank = bank();
        let (user, checking, _) = customer(&bank, "jack", 100, 0).await;
        let err = bank.engine.wire(wire(user.id, checking.id, dollars(90), None)).await.unwrap_err();
        assert!(matches!(err, BankError::InsufficientFunds { .. }));
        assert!(bank.store.list_wires(None).await.unwrap().is_empty());
        assert_eq!(balance(&bank, checking.id).await, dollars(100));
    }

    #[tokio::test]
    async fn bill_pay_records_the_payee_as_merchant() {
        let bank = bank();
        let (user, checking, _) = customer(&bank, "kate", 300, 0).await;
        let receipt = bank
            .engine
            .bill_pay(BillPayment {
                user_id: user.id,
                from_account_id: checking.id,
                payee_name: "City Water".to_string(),
                payee_account_number: Some("55501".to_string()),
                amount: dollars(45),
                memo: None,
            })
            .await
            .unwrap();
        assert_eq!(receipt.from_account.balance, dollars(255));

        let row = &bank.store.transactions_for_account(checking.id, Page::default()).await.unwrap()[0];
        assert_eq!(row.merchant.merchant_name.as_deref(), Some("City Water"));
        assert_eq!(row.merchant.merchant_category.as_deref(), Some("Bill Payment"));
    }

    #[tokio::test]
    async fn ledger_rows_survive_account_deletion_and_reads_are_stable() {
        let bank = bank();
        let (user, checking, savings) = customer(&bank, "liam", 1000, 500).await;
        bank.engine
            .internal(transfer(user.id, checking.id, savings.id, dollars(150)))
            .await
            .unwrap();

        let first = bank.accounts.account_transactions(user.id, checking.id, Page::default()).await.unwrap();
        let second = bank.accounts.account_transactions(user.id, checking.id, Page::default()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);

        let total = bank.store.count_transactions().await.unwrap();
        bank.back_office.delete_customer(checking.id).await.unwrap();
        assert!(bank.store.find_account(checking.id).await.unwrap().is_none());
        assert_eq!(bank.store.count_transactions().await.unwrap(), total);
        for row in &first {
            assert_eq!(bank.store.find_transaction(row.id).await.unwrap().as_ref(), Some(row));
        }
    }

    #[tokio::test]
    async fn admin_postings_skip_the_funds_check() {
        let bank = bank();
        let (_, checking, _) = customer(&bank, "mona", 20, 0).await;

        let posted = bank
            .back_office
            .post_transaction(ManualPosting {
                account_id: checking.id,
                kind: TransactionType::Debit,
                amount: dollars(50),
                description: "Fee correction".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(posted.transaction.balance_after, Money::from_cents(-3_000));

        let err = bank
            .back_office
            .post_transaction(ManualPosting {
                account_id: checking.id,
                kind: TransactionType::Credit,
                amount: Money::zero(),
                description: "nothing".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::Validation(_)));
    }

    #[tokio::test]
    async fn limit_increase_approval_only_changes_status() {
        let bank = bank();
        let (user, checking, _) = customer(&bank, "nora", 100, 0).await;
        let request = bank
            .approvals
            .submit_limit_increase(LimitIncreaseForm {
                kind: LimitKind::Debit,
                user_id: user.id,
                account_id: Some(checking.id),
                current_limit: dollars(500),
                requested_limit: dollars(2000),
                reason: "travel".to_string(),
                annual_income: None,
                employment_status: None,
            })
            .await
            .unwrap();

        let denied = bank
            .approvals
            .resolve_limit_increase(LimitKind::Debit, request.id, AdminId::new(), Decision::Reject("too soon".into()))
            .await
            .unwrap();
        assert_eq!(denied.review.status, LimitRequestStatus::Denied);
        assert!(bank.approvals.limit_requests(LimitKind::Credit, None).await.unwrap().is_empty());
        assert_eq!(balance(&bank, checking.id).await, dollars(100));

        let err = bank
            .approvals
            .resolve_limit_increase(LimitKind::Debit, request.id, AdminId::new(), Decision::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::Conflict(_)));
    }

    #[tokio::test]
    async fn approved_application_enrolls_once() {
        let bank = bank();
        let application = bank
            .approvals
            .submit_application(ApplicationForm {
                account_type: AccountType::Savings,
                personal_info: PersonalInfo {
                    first_name: "Olivia".to_string(),
                    last_name: "Park".to_string(),
                    email: "olivia@example.com".to_string(),
                    phone: "555-0199".to_string(),
                    date_of_birth: chrono::NaiveDate::from_ymd_opt(1990, 4, 2).unwrap(),
                    address: "1 Main St".to_string(),
                    ssn_last4: "1234".to_string(),
                },
                employment: None,
                annual_income: None,
                initial_deposit: dollars(250),
            })
            .await
            .unwrap();

        let (_, code) = bank
            .approvals
            .resolve_application(application.id, AdminId::new(), Decision::Approve)
            .await
            .unwrap();
        let code = code.unwrap();
        assert!(code.code.starts_with("AC-"));

        let (user, account) = bank.approvals.enroll(&code.code, "olivia", "s3cure-pass").await.unwrap();
        assert_eq!(account.account_type, AccountType::Savings);
        assert_eq!(account.balance, dollars(250));
        assert_eq!(account.user_id, user.id);
        assert_eq!(account.routing_number, DEFAULT_ROUTING_NUMBER);

        let err = bank.approvals.enroll(&code.code, "olivia2", "s3cure-pass").await.unwrap_err();
        assert!(matches!(err, BankError::Conflict(_)));

        let (logged_in, token) = bank.sessions.login_customer("OLIVIA", "s3cure-pass").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        let principal = bank.sessions.authenticate(&token).unwrap();
        assert_eq!(bank.sessions.active_customer(&principal).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn blocked_customers_lose_access_immediately() {
        let bank = bank();
        let (user, _, _) = customer(&bank, "pete", 10, 0).await;
        let (_, token) = bank.sessions.login_customer("pete", "password123").await.unwrap();
        let principal = bank.sessions.authenticate(&token).unwrap();

        let err = bank
            .back_office
            .set_user_status(user.id, UserStatus::Blocked, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::Validation(_)));
        bank.back_office
            .set_user_status(user.id, UserStatus::Blocked, Some("fraud review".into()))
            .await
            .unwrap();

        assert!(matches!(
            bank.sessions.active_customer(&principal).await,
            Err(BankError::Forbidden(_))
        ));
        assert!(matches!(
            bank.sessions.login_customer("pete", "password123").await,
            Err(BankError::Forbidden(_))
        ));
        assert!(matches!(
            bank.sessions.login_customer("pete", "wrong-password").await,
            Err(BankError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn stats_count_customers_deposits_and_pending_work() {
        let bank = bank();
        let (user, checking, _) = customer(&bank, "quinn", 1000, 500).await;
        customer(&bank, "rosa", 200, 0).await;
        bank.engine
            .external(external(user.id, checking.id, dollars(10), "021000021"))
            .await
            .unwrap();

        let stats = bank.back_office.stats().await.unwrap();
        assert_eq!(stats.total_customers, 2);
        assert_eq!(stats.total_accounts, 4);
        assert_eq!(stats.active_accounts, 4);
        assert_eq!(stats.total_deposits, dollars(1700));
        assert_eq!(stats.total_transactions, 3);
        assert_eq!(stats.pending_external_transfers, 1);
        assert_eq!(stats.pending_applications, 0);
    }

    #[tokio::test]
    async fn duplicate_usernames_are_conflicts() {
        let bank = bank();
        customer(&bank, "sam_1", 0, 0).await;
        let err = bank
            .back_office
            .create_customer(NewCustomer {
                profile: NewUserProfile {
                    username: "SAM_1".to_string(),
                    email: "other@example.com".to_string(),
                    first_name: "Sam".to_string(),
                    last_name: "Other".to_string(),
                    phone: None,
                },
                password: "password123".to_string(),
                accounts: vec![(AccountType::Checking, dollars(5))],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::Conflict(_)));
        assert_eq!(bank.store.list_accounts().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn statements_bracket_the_month() {
        let bank = bank();
        let (user, checking, savings) = customer(&bank, "tina", 1000, 0).await;
        bank.engine
            .internal(transfer(user.id, checking.id, savings.id, dollars(150)))
            .await
            .unwrap();

        let statement = bank.accounts.statement(user.id, checking.id, None).await.unwrap();
        assert_eq!(statement.opening_balance, Money::zero());
        assert_eq!(statement.closing_balance, dollars(850));
        assert_eq!(statement.total_credits, dollars(1000));
        assert_eq!(statement.total_debits, dollars(150));

        let err = bank
            .accounts
            .statement(user.id, checking.id, Some("2024-13"))
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::Validation(_)));
    }

    #[tokio::test]
    async fn ledger_dates_follow_append_order_when_callers_clocks_disagree() {
        let bank = bank();
        let (user, checking, _) = customer(&bank, "uma", 1000, 0).await;
        let later = Utc::now() + Duration::seconds(30);
        let earlier = later - Duration::seconds(60);

        bank.store
            .post(vec![Posting::debit(checking.id, dollars(100), "Rent")], later)
            .await
            .unwrap();
        bank.store
            .post(vec![Posting::debit(checking.id, dollars(50), "Groceries")], earlier)
            .await
            .unwrap();

        let history = bank.store.account_history(checking.id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.windows(2).all(|w| w[0].transaction_date <= w[1].transaction_date));
        let last = history.last().unwrap();
        assert_eq!(last.balance_after, dollars(850));

        let month = last.transaction_date.format("%Y-%m").to_string();
        let statement = bank
            .accounts
            .statement(user.id, checking.id, Some(month.as_str()))
            .await
            .unwrap();
        assert_eq!(statement.closing_balance, dollars(850));
        assert_eq!(statement.closing_balance, balance(&bank, checking.id).await);
    }
}
