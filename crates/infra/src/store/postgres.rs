//! Postgres-backed bank store.
//!
//! Each mutating operation runs in one SQL transaction. Accounts touched by a
//! batch of postings are locked with `SELECT ... FOR UPDATE` in ascending id
//! order, the domain funds check runs against the locked rows, and balance
//! updates plus ledger inserts commit together. A transaction dropped on an
//! error path rolls back.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any other | `Backend` |
//! | PoolClosed / IO / other | N/A | `Backend` |

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction as SqlTransaction};
use tracing::instrument;
use uuid::Uuid;

use fcb_auth::{AdminUser, User, UserStatus};
use fcb_banking::{
    AccessCode, Account, AccountApplication, ApprovalStatus, InternationalDetails,
    LimitIncreaseRequest, LimitKind, LimitRequestStatus, Merchant, PendingExternalTransfer,
    PersonalInfo, Posting, Recipient, Review, Transaction, WireFees, WireKind, WireStatus,
    WireTransfer,
};
use fcb_core::{AccountId, AdminId, DomainError, Money, RequestId, TransactionId, UserId};

use super::{
    AccountStore, Decision, LedgerStore, NewAccount, Page, Posted, StoreError, StoreResult,
    UserStore, WorkflowStore, ledger_timestamp,
};

const SCHEMA: &str = include_str!("../../migrations/0001_bank_schema.sql");

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, phone, status, status_reason, created_at";
const ADMIN_COLUMNS: &str = "id, username, password_hash, display_name, created_at";
const ACCOUNT_COLUMNS: &str = "id, user_id, account_number, routing_number, account_type, balance, status, open_date";
const TRANSACTION_COLUMNS: &str = "id, account_id, type, amount, description, merchant_name, merchant_location, merchant_category, reference, balance_after, status, transaction_date, posted_date";
const EXTERNAL_COLUMNS: &str = "id, user_id, from_account_id, recipient_name, recipient_account, recipient_routing, recipient_bank, recipient_phone, recipient_address, amount, transfer_type, purpose, status, processed_by, processed_at, rejection_reason, submitted_at, reference";
const LIMIT_COLUMNS: &str = "id, user_id, account_id, current_limit, requested_limit, reason, annual_income, employment_status, status, processed_by, processed_at, rejection_reason, submitted_at";
const APPLICATION_COLUMNS: &str = "id, account_type, first_name, last_name, email, phone, date_of_birth, address, ssn_last4, employment, annual_income, initial_deposit, status, processed_by, processed_at, rejection_reason, access_code, submitted_at";

/// Postgres-backed bank store.
///
/// Uses the SQLx connection pool, so it is `Send + Sync` and cheap to share.
#[derive(Debug, Clone)]
pub struct PostgresBankStore {
    pool: PgPool,
}

impl PostgresBankStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create missing tables and indexes. Safe to run on every startup.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<SqlTransaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

async fn commit(tx: SqlTransaction<'_, Postgres>) -> StoreResult<()> {
    tx.commit().await.map_err(|e| map_sqlx_error("commit_transaction", e))
}

// ---------------------------------------------------------------------------
// Money path
// ---------------------------------------------------------------------------

/// Apply postings inside `tx`: lock the touched accounts, run the domain
/// funds check, write new balances and append one ledger row per posting.
/// Rows are dated after the lock is held.
async fn apply_postings(
    tx: &mut SqlTransaction<'_, Postgres>,
    postings: Vec<Posting>,
    now: DateTime<Utc>,
) -> StoreResult<Vec<Posted>> {
    if postings.is_empty() {
        return Ok(vec![]);
    }
    for posting in &postings {
        posting.validate()?;
    }

    let mut ids: Vec<Uuid> = postings.iter().map(|p| *p.account_id.as_uuid()).collect();
    ids.sort();
    ids.dedup();

    let rows = sqlx::query(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM bank_accounts WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    ))
    .bind(&ids)
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_accounts", e))?;

    let mut accounts = HashMap::with_capacity(rows.len());
    for row in &rows {
        let account = decode_account(row)?;
        accounts.insert(account.id, account);
    }

    let latest: Option<DateTime<Utc>> =
        sqlx::query_scalar("SELECT max(transaction_date) FROM transactions WHERE account_id = ANY($1)")
            .bind(&ids)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("latest_transaction_date", e))?;
    let stamped = ledger_timestamp(now, latest);

    let mut posted = Vec::with_capacity(postings.len());
    for posting in postings {
        let account = accounts
            .get_mut(&posting.account_id)
            .ok_or(StoreError::NotFound("account"))?;
        let balance_after = account.adjust_balance(posting.delta(), posting.funds_check)?;
        let transaction = Transaction::record(&posting, balance_after, stamped);
        insert_transaction(tx, &transaction).await?;
        posted.push(Posted {
            account: account.clone(),
            transaction,
        });
    }

    for account in accounts.values() {
        sqlx::query("UPDATE bank_accounts SET balance = $2 WHERE id = $1")
            .bind(account.id.as_uuid())
            .bind(account.balance.amount())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("update_balance", e))?;
    }

    Ok(posted)
}

async fn insert_transaction(tx: &mut SqlTransaction<'_, Postgres>, t: &Transaction) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, account_id, type, amount, description,
            merchant_name, merchant_location, merchant_category,
            reference, balance_after, status, transaction_date, posted_date
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(t.id.as_uuid())
    .bind(t.account_id.as_uuid())
    .bind(t.kind.as_str())
    .bind(t.amount.amount())
    .bind(&t.description)
    .bind(&t.merchant.merchant_name)
    .bind(&t.merchant.merchant_location)
    .bind(&t.merchant.merchant_category)
    .bind(&t.reference)
    .bind(t.balance_after.amount())
    .bind(t.status.as_str())
    .bind(t.transaction_date)
    .bind(t.posted_date)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_transaction", e))?;
    Ok(())
}

async fn insert_user(tx: &mut SqlTransaction<'_, Postgres>, user: &User) -> StoreResult<()> {
    sqlx::query(&format!("INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"))
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.status.as_str())
        .bind(&user.status_reason)
        .bind(user.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| match map_sqlx_error("insert_user", e) {
            StoreError::Conflict(_) => StoreError::Conflict(format!("username '{}' is already taken", user.username)),
            other => other,
        })?;
    Ok(())
}

async fn insert_account(tx: &mut SqlTransaction<'_, Postgres>, account: &Account) -> StoreResult<()> {
    sqlx::query(&format!("INSERT INTO bank_accounts ({ACCOUNT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"))
        .bind(account.id.as_uuid())
        .bind(account.user_id.as_uuid())
        .bind(&account.account_number)
        .bind(&account.routing_number)
        .bind(account.account_type.as_str())
        .bind(account.balance.amount())
        .bind(account.status.as_str())
        .bind(account.open_date)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("insert_account", e))?;
    Ok(())
}

/// Insert user + accounts, then post opening deposits.
async fn open_customer(
    tx: &mut SqlTransaction<'_, Postgres>,
    user: &User,
    accounts: Vec<NewAccount>,
    now: DateTime<Utc>,
) -> StoreResult<Vec<Account>> {
    insert_user(tx, user).await?;
    for new in &accounts {
        insert_account(tx, &new.account).await?;
    }
    let postings: Vec<Posting> = accounts.iter().filter_map(NewAccount::opening_posting).collect();
    let posted = apply_postings(tx, postings, now).await?;

    Ok(accounts
        .into_iter()
        .map(|new| {
            posted
                .iter()
                .rev()
                .find(|p| p.account.id == new.account.id)
                .map(|p| p.account.clone())
                .unwrap_or(new.account)
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Row decoding
// ---------------------------------------------------------------------------

fn parse<T: FromStr<Err = DomainError>>(column: &str, value: String) -> StoreResult<T> {
    value
        .parse()
        .map_err(|e: DomainError| StoreError::Backend(format!("invalid {column} value in row: {e}")))
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Backend(format!("failed to read {column}: {e}")))
}

fn money(row: &PgRow, column: &str) -> StoreResult<Money> {
    Ok(Money::from(get::<Decimal>(row, column)?))
}

fn optional_money(row: &PgRow, column: &str) -> StoreResult<Option<Money>> {
    Ok(get::<Option<Decimal>>(row, column)?.map(Money::from))
}

fn review<S>(row: &PgRow) -> StoreResult<Review<S>>
where
    S: FromStr<Err = DomainError>,
{
    Ok(Review {
        status: parse("status", get(row, "status")?)?,
        processed_by: get::<Option<Uuid>>(row, "processed_by")?.map(AdminId::from_uuid),
        processed_at: get(row, "processed_at")?,
        rejection_reason: get(row, "rejection_reason")?,
    })
}

fn decode_user(row: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: UserId::from_uuid(get(row, "id")?),
        username: get(row, "username")?,
        email: get(row, "email")?,
        password_hash: get(row, "password_hash")?,
        first_name: get(row, "first_name")?,
        last_name: get(row, "last_name")?,
        phone: get(row, "phone")?,
        status: parse("status", get(row, "status")?)?,
        status_reason: get(row, "status_reason")?,
        created_at: get(row, "created_at")?,
    })
}

fn decode_admin(row: &PgRow) -> StoreResult<AdminUser> {
    Ok(AdminUser {
        id: AdminId::from_uuid(get(row, "id")?),
        username: get(row, "username")?,
        password_hash: get(row, "password_hash")?,
        display_name: get(row, "display_name")?,
        created_at: get(row, "created_at")?,
    })
}

fn decode_account(row: &PgRow) -> StoreResult<Account> {
    Ok(Account {
        id: AccountId::from_uuid(get(row, "id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        account_number: get(row, "account_number")?,
        routing_number: get(row, "routing_number")?,
        account_type: parse("account_type", get(row, "account_type")?)?,
        balance: money(row, "balance")?,
        status: parse("status", get(row, "status")?)?,
        open_date: get(row, "open_date")?,
    })
}

fn decode_transaction(row: &PgRow) -> StoreResult<Transaction> {
    Ok(Transaction {
        id: TransactionId::from_uuid(get(row, "id")?),
        account_id: AccountId::from_uuid(get(row, "account_id")?),
        kind: parse("type", get(row, "type")?)?,
        amount: money(row, "amount")?,
        description: get(row, "description")?,
        merchant: Merchant {
            merchant_name: get(row, "merchant_name")?,
            merchant_location: get(row, "merchant_location")?,
            merchant_category: get(row, "merchant_category")?,
        },
        reference: get(row, "reference")?,
        balance_after: money(row, "balance_after")?,
        status: parse("status", get(row, "status")?)?,
        transaction_date: get(row, "transaction_date")?,
        posted_date: get(row, "posted_date")?,
    })
}

fn decode_external(row: &PgRow) -> StoreResult<PendingExternalTransfer> {
    Ok(PendingExternalTransfer {
        id: RequestId::from_uuid(get(row, "id")?),
        user_id: UserId::from_uuid(get(row, "user_id")?),
        from_account_id: AccountId::from_uuid(get(row, "from_account_id")?),
        recipient: Recipient {
            name: get(row, "recipient_name")?,
            account_number: get(row, "recipient_account")?,
            routing_number: get(row, "recipient_routing")?,
            bank_name: get(row, "recipient_bank")?,
            phone: get(row, "recipient_phone")?,
            address: get(row, "recipient_address")?,
        },
        amount: money(row, "amount")?,
        transfer_type: parse("transfer_type", get(row, "transfer_type")?)?,
        purpose: get(row, "purpose")?,
        review: review(row)?,
        submitted_at: get(row, "submitted_at")?,
        reference: get(row, "reference")?,
    })
}

fn decode_wire(row: &PgRow, kind: WireKind) -> StoreResult<WireTransfer> {
    let (fees, international) = match kind {
        WireKind::Domestic => (
            WireFees {
                sender: money(row, "sender_fee")?,
                intermediary: Money::zero(),
                recipient: Money::zero(),
            },
            None,
        ),
        WireKind::International => (
            WireFees {
                sender: money(row, "sender_fee")?,
                intermediary: money(row, "intermediary_fee")?,
                recipient: money(row, "recipient_fee")?,
            },
            Some(InternationalDetails {
                swift_code: get(row, "swift_code")?,
                beneficiary_country: get(row, "beneficiary_country")?,
                iban: get(row, "iban")?,
                currency: get(row, "currency")?,
            }),
        ),
    };
    Ok(WireTransfer {
        id: RequestId::from_uuid(get(row, "id")?),
        kind,
        user_id: UserId::from_uuid(get(row, "user_id")?),
        from_account_id: AccountId::from_uuid(get(row, "from_account_id")?),
        beneficiary_name: get(row, "beneficiary_name")?,
        beneficiary_address: get(row, "beneficiary_address")?,
        bank_name: get(row, "bank_name")?,
        routing_number: get(row, "routing_number")?,
        account_number: get(row, "account_number")?,
        international,
        amount: money(row, "amount")?,
        fees,
        total_debit: money(row, "total_debit")?,
        purpose: get(row, "purpose")?,
        reference: get(row, "reference")?,
        status: parse("status", get(row, "status")?)?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn decode_limit(row: &PgRow, kind: LimitKind) -> StoreResult<LimitIncreaseRequest> {
    Ok(LimitIncreaseRequest {
        id: RequestId::from_uuid(get(row, "id")?),
        kind,
        user_id: UserId::from_uuid(get(row, "user_id")?),
        account_id: get::<Option<Uuid>>(row, "account_id")?.map(AccountId::from_uuid),
        current_limit: money(row, "current_limit")?,
        requested_limit: money(row, "requested_limit")?,
        reason: get(row, "reason")?,
        annual_income: optional_money(row, "annual_income")?,
        employment_status: get(row, "employment_status")?,
        review: review(row)?,
        submitted_at: get(row, "submitted_at")?,
    })
}

fn decode_application(row: &PgRow) -> StoreResult<AccountApplication> {
    Ok(AccountApplication {
        id: RequestId::from_uuid(get(row, "id")?),
        account_type: parse("account_type", get(row, "account_type")?)?,
        personal_info: PersonalInfo {
            first_name: get(row, "first_name")?,
            last_name: get(row, "last_name")?,
            email: get(row, "email")?,
            phone: get(row, "phone")?,
            date_of_birth: get(row, "date_of_birth")?,
            address: get(row, "address")?,
            ssn_last4: get(row, "ssn_last4")?,
        },
        employment: get(row, "employment")?,
        annual_income: optional_money(row, "annual_income")?,
        initial_deposit: money(row, "initial_deposit")?,
        review: review(row)?,
        access_code: get(row, "access_code")?,
        submitted_at: get(row, "submitted_at")?,
    })
}

fn decode_access_code(row: &PgRow) -> StoreResult<AccessCode> {
    Ok(AccessCode {
        code: get(row, "code")?,
        application_id: RequestId::from_uuid(get(row, "application_id")?),
        created_at: get(row, "created_at")?,
        used_at: get(row, "used_at")?,
    })
}

fn decode_all<T>(rows: &[PgRow], decode: impl Fn(&PgRow) -> StoreResult<T>) -> StoreResult<Vec<T>> {
    rows.iter().map(decode).collect()
}

fn wire_table(kind: WireKind) -> &'static str {
    match kind {
        WireKind::Domestic => "domestic_wire_transfers",
        WireKind::International => "international_wire_transfers",
    }
}

fn limit_table(kind: LimitKind) -> &'static str {
    match kind {
        LimitKind::Credit => "credit_limit_increase_requests",
        LimitKind::Debit => "debit_limit_increase_requests",
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl UserStore for PostgresBankStore {
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;
        row.as_ref().map(decode_user).transpose()
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = LOWER($1)"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_username", e))?;
        row.as_ref().map(decode_user).transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        decode_all(&rows, decode_user)
    }

    #[instrument(skip(self, reason), fields(user_id = %id), err)]
    async fn set_user_status(
        &self,
        id: UserId,
        status: UserStatus,
        reason: Option<String>,
    ) -> StoreResult<User> {
        let mut tx = self.begin().await?;
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_user", e))?
            .ok_or(StoreError::NotFound("user"))?;
        let mut user = decode_user(&row)?;
        user.set_status(status, reason)?;

        sqlx::query("UPDATE users SET status = $2, status_reason = $3 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(user.status.as_str())
            .bind(&user.status_reason)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_user_status", e))?;
        commit(tx).await?;
        Ok(user)
    }

    async fn insert_admin(&self, admin: AdminUser) -> StoreResult<AdminUser> {
        sqlx::query(&format!("INSERT INTO admin_users ({ADMIN_COLUMNS}) VALUES ($1, $2, $3, $4, $5)"))
            .bind(admin.id.as_uuid())
            .bind(&admin.username)
            .bind(&admin.password_hash)
            .bind(&admin.display_name)
            .bind(admin.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_admin", e))?;
        Ok(admin)
    }

    async fn find_admin(&self, id: AdminId) -> StoreResult<Option<AdminUser>> {
        let row = sqlx::query(&format!("SELECT {ADMIN_COLUMNS} FROM admin_users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_admin", e))?;
        row.as_ref().map(decode_admin).transpose()
    }

    async fn find_admin_by_username(&self, username: &str) -> StoreResult<Option<AdminUser>> {
        let row = sqlx::query(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admin_users WHERE LOWER(username) = LOWER($1)"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_admin_by_username", e))?;
        row.as_ref().map(decode_admin).transpose()
    }
}

#[async_trait]
impl AccountStore for PostgresBankStore {
    async fn find_account(&self, id: AccountId) -> StoreResult<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM bank_accounts WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_account", e))?;
        row.as_ref().map(decode_account).transpose()
    }

    async fn accounts_for_user(&self, user_id: UserId) -> StoreResult<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM bank_accounts WHERE user_id = $1 ORDER BY open_date, id"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("accounts_for_user", e))?;
        decode_all(&rows, decode_account)
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let rows = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM bank_accounts ORDER BY open_date, id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_accounts", e))?;
        decode_all(&rows, decode_account)
    }

    #[instrument(skip(self, user, accounts), fields(user_id = %user.id, accounts = accounts.len()), err)]
    async fn create_customer(
        &self,
        user: User,
        accounts: Vec<NewAccount>,
        now: DateTime<Utc>,
    ) -> StoreResult<(User, Vec<Account>)> {
        let mut tx = self.begin().await?;
        let opened = open_customer(&mut tx, &user, accounts, now).await?;
        commit(tx).await?;
        Ok((user, opened))
    }

    async fn delete_account(&self, id: AccountId) -> StoreResult<Account> {
        let row = sqlx::query(&format!("DELETE FROM bank_accounts WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_account", e))?
            .ok_or(StoreError::NotFound("account"))?;
        decode_account(&row)
    }
}

#[async_trait]
impl LedgerStore for PostgresBankStore {
    #[instrument(skip(self, postings), fields(postings = postings.len()), err)]
    async fn post(&self, postings: Vec<Posting>, now: DateTime<Utc>) -> StoreResult<Vec<Posted>> {
        let mut tx = self.begin().await?;
        let posted = apply_postings(&mut tx, postings, now).await?;
        commit(tx).await?;
        Ok(posted)
    }

    async fn find_transaction(&self, id: TransactionId) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query(&format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_transaction", e))?;
        row.as_ref().map(decode_transaction).transpose()
    }

    async fn transactions_for_account(&self, account_id: AccountId, page: Page) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE account_id = $1 \
             ORDER BY seq DESC LIMIT $2 OFFSET $3"
        ))
        .bind(account_id.as_uuid())
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("transactions_for_account", e))?;
        decode_all(&rows, decode_transaction)
    }

    async fn account_history(&self, account_id: AccountId) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE account_id = $1 ORDER BY seq"
        ))
        .bind(account_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("account_history", e))?;
        decode_all(&rows, decode_transaction)
    }

    async fn recent_transactions_for_user(&self, user_id: UserId, limit: u32) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE account_id IN (SELECT id FROM bank_accounts WHERE user_id = $1) \
             ORDER BY seq DESC LIMIT $2"
        ))
        .bind(user_id.as_uuid())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("recent_transactions_for_user", e))?;
        decode_all(&rows, decode_transaction)
    }

    async fn list_transactions(&self, page: Page) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY seq DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_transactions", e))?;
        decode_all(&rows, decode_transaction)
    }

    async fn count_transactions(&self) -> StoreResult<u64> {
        let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM transactions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_transactions", e))
            .and_then(|row| get(&row, "total"))?;
        Ok(total.max(0) as u64)
    }
}

async fn write_review<S: fcb_banking::Outcome>(
    tx: &mut SqlTransaction<'_, Postgres>,
    table: &str,
    id: RequestId,
    review: &Review<S>,
) -> StoreResult<()> {
    sqlx::query(&format!(
        "UPDATE {table} SET status = $2, processed_by = $3, processed_at = $4, rejection_reason = $5 WHERE id = $1"
    ))
    .bind(id.as_uuid())
    .bind(review.status.as_str())
    .bind(review.processed_by.map(|a| *a.as_uuid()))
    .bind(review.processed_at)
    .bind(&review.rejection_reason)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("write_review", e))?;
    Ok(())
}

#[async_trait]
impl WorkflowStore for PostgresBankStore {
    async fn insert_external_transfer(&self, t: PendingExternalTransfer) -> StoreResult<PendingExternalTransfer> {
        sqlx::query(&format!(
            "INSERT INTO pending_external_transfers ({EXTERNAL_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
        ))
        .bind(t.id.as_uuid())
        .bind(t.user_id.as_uuid())
        .bind(t.from_account_id.as_uuid())
        .bind(&t.recipient.name)
        .bind(&t.recipient.account_number)
        .bind(&t.recipient.routing_number)
        .bind(&t.recipient.bank_name)
        .bind(&t.recipient.phone)
        .bind(&t.recipient.address)
        .bind(t.amount.amount())
        .bind(t.transfer_type.as_str())
        .bind(&t.purpose)
        .bind(fcb_banking::Outcome::as_str(&t.review.status))
        .bind(t.review.processed_by.map(|a| *a.as_uuid()))
        .bind(t.review.processed_at)
        .bind(&t.review.rejection_reason)
        .bind(t.submitted_at)
        .bind(&t.reference)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_external_transfer", e))?;
        Ok(t)
    }

    async fn external_transfers_for_user(&self, user_id: UserId) -> StoreResult<Vec<PendingExternalTransfer>> {
        let rows = sqlx::query(&format!(
            "SELECT {EXTERNAL_COLUMNS} FROM pending_external_transfers WHERE user_id = $1 ORDER BY submitted_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("external_transfers_for_user", e))?;
        decode_all(&rows, decode_external)
    }

    async fn list_external_transfers(&self, status: Option<ApprovalStatus>) -> StoreResult<Vec<PendingExternalTransfer>> {
        let rows = sqlx::query(&format!(
            "SELECT {EXTERNAL_COLUMNS} FROM pending_external_transfers \
             WHERE ($1::text IS NULL OR status = $1) ORDER BY submitted_at DESC"
        ))
        .bind(status.map(|s| fcb_banking::Outcome::as_str(&s)))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_external_transfers", e))?;
        decode_all(&rows, decode_external)
    }

    #[instrument(skip(self, decision), fields(request_id = %id), err)]
    async fn resolve_external_transfer(
        &self,
        id: RequestId,
        admin: AdminId,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> StoreResult<(PendingExternalTransfer, Option<Posted>)> {
        let mut tx = self.begin().await?;
        let row = sqlx::query(&format!(
            "SELECT {EXTERNAL_COLUMNS} FROM pending_external_transfers WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_external_transfer", e))?
        .ok_or(StoreError::NotFound("external transfer"))?;
        let mut transfer = decode_external(&row)?;

        let posted = match decision {
            Decision::Approve => {
                let posting = transfer.settlement_posting()?;
                let posted = apply_postings(&mut tx, vec![posting], now).await?.pop();
                transfer.review.approve(admin, now)?;
                posted
            }
            Decision::Reject(reason) => {
                transfer.review.reject(admin, now, &reason)?;
                None
            }
        };

        write_review(&mut tx, "pending_external_transfers", id, &transfer.review).await?;
        commit(tx).await?;
        Ok((transfer, posted))
    }

    #[instrument(skip(self, wire), fields(wire_id = %wire.id, kind = wire.kind.as_str()), err)]
    async fn submit_wire(&self, wire: WireTransfer, now: DateTime<Utc>) -> StoreResult<(WireTransfer, Posted)> {
        let mut tx = self.begin().await?;
        let posted = apply_postings(&mut tx, vec![wire.debit_posting()], now)
            .await?
            .pop()
            .ok_or_else(|| StoreError::Backend("wire debit produced no ledger row".to_string()))?;

        match &wire.international {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO domestic_wire_transfers (
                        id, user_id, from_account_id, beneficiary_name, beneficiary_address,
                        bank_name, routing_number, account_number, amount, sender_fee,
                        total_debit, purpose, reference, status, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                    "#,
                )
                .bind(wire.id.as_uuid())
                .bind(wire.user_id.as_uuid())
                .bind(wire.from_account_id.as_uuid())
                .bind(&wire.beneficiary_name)
                .bind(&wire.beneficiary_address)
                .bind(&wire.bank_name)
                .bind(&wire.routing_number)
                .bind(&wire.account_number)
                .bind(wire.amount.amount())
                .bind(wire.fees.sender.amount())
                .bind(wire.total_debit.amount())
                .bind(&wire.purpose)
                .bind(&wire.reference)
                .bind(wire.status.as_str())
                .bind(wire.created_at)
                .bind(wire.updated_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_domestic_wire", e))?;
            }
            Some(intl) => {
                sqlx::query(
                    r#"
                    INSERT INTO international_wire_transfers (
                        id, user_id, from_account_id, beneficiary_name, beneficiary_address,
                        beneficiary_country, bank_name, routing_number, account_number,
                        swift_code, iban, currency, amount, sender_fee, intermediary_fee,
                        recipient_fee, total_debit, purpose, reference, status, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
                    "#,
                )
                .bind(wire.id.as_uuid())
                .bind(wire.user_id.as_uuid())
                .bind(wire.from_account_id.as_uuid())
                .bind(&wire.beneficiary_name)
                .bind(&wire.beneficiary_address)
                .bind(&intl.beneficiary_country)
                .bind(&wire.bank_name)
                .bind(&wire.routing_number)
                .bind(&wire.account_number)
                .bind(&intl.swift_code)
                .bind(&intl.iban)
                .bind(&intl.currency)
                .bind(wire.amount.amount())
                .bind(wire.fees.sender.amount())
                .bind(wire.fees.intermediary.amount())
                .bind(wire.fees.recipient.amount())
                .bind(wire.total_debit.amount())
                .bind(&wire.purpose)
                .bind(&wire.reference)
                .bind(wire.status.as_str())
                .bind(wire.created_at)
                .bind(wire.updated_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_international_wire", e))?;
            }
        }

        commit(tx).await?;
        Ok((wire, posted))
    }

    async fn wires_for_user(&self, user_id: UserId) -> StoreResult<Vec<WireTransfer>> {
        let mut wires = Vec::new();
        for kind in [WireKind::Domestic, WireKind::International] {
            let rows = sqlx::query(&format!("SELECT * FROM {} WHERE user_id = $1", wire_table(kind)))
                .bind(user_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("wires_for_user", e))?;
            wires.extend(decode_all(&rows, |r| decode_wire(r, kind))?);
        }
        wires.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(wires)
    }

    async fn list_wires(&self, kind: Option<WireKind>) -> StoreResult<Vec<WireTransfer>> {
        let kinds = match kind {
            Some(k) => vec![k],
            None => vec![WireKind::Domestic, WireKind::International],
        };
        let mut wires = Vec::new();
        for kind in kinds {
            let rows = sqlx::query(&format!("SELECT * FROM {}", wire_table(kind)))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("list_wires", e))?;
            wires.extend(decode_all(&rows, |r| decode_wire(r, kind))?);
        }
        wires.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(wires)
    }

    #[instrument(skip(self), fields(wire_id = %id), err)]
    async fn update_wire_status(
        &self,
        kind: WireKind,
        id: RequestId,
        status: WireStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<(WireTransfer, Option<Posted>)> {
        let table = wire_table(kind);
        let mut tx = self.begin().await?;
        let row = sqlx::query(&format!("SELECT * FROM {table} WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_wire", e))?
            .ok_or(StoreError::NotFound("wire transfer"))?;
        let mut wire = decode_wire(&row, kind)?;

        let posted = match wire.transition(status, now)? {
            Some(refund) => apply_postings(&mut tx, vec![refund], now).await?.pop(),
            None => None,
        };

        sqlx::query(&format!("UPDATE {table} SET status = $2, updated_at = $3 WHERE id = $1"))
            .bind(id.as_uuid())
            .bind(wire.status.as_str())
            .bind(wire.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_wire_status", e))?;
        commit(tx).await?;
        Ok((wire, posted))
    }

    async fn insert_limit_request(&self, r: LimitIncreaseRequest) -> StoreResult<LimitIncreaseRequest> {
        sqlx::query(&format!(
            "INSERT INTO {} ({LIMIT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            limit_table(r.kind)
        ))
        .bind(r.id.as_uuid())
        .bind(r.user_id.as_uuid())
        .bind(r.account_id.map(|a| *a.as_uuid()))
        .bind(r.current_limit.amount())
        .bind(r.requested_limit.amount())
        .bind(&r.reason)
        .bind(r.annual_income.map(|m| m.amount()))
        .bind(&r.employment_status)
        .bind(fcb_banking::Outcome::as_str(&r.review.status))
        .bind(r.review.processed_by.map(|a| *a.as_uuid()))
        .bind(r.review.processed_at)
        .bind(&r.review.rejection_reason)
        .bind(r.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_limit_request", e))?;
        Ok(r)
    }

    async fn limit_requests_for_user(&self, user_id: UserId) -> StoreResult<Vec<LimitIncreaseRequest>> {
        let mut requests = Vec::new();
        for kind in [LimitKind::Credit, LimitKind::Debit] {
            let rows = sqlx::query(&format!(
                "SELECT {LIMIT_COLUMNS} FROM {} WHERE user_id = $1",
                limit_table(kind)
            ))
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("limit_requests_for_user", e))?;
            requests.extend(decode_all(&rows, |r| decode_limit(r, kind))?);
        }
        requests.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(requests)
    }

    async fn list_limit_requests(
        &self,
        kind: LimitKind,
        status: Option<LimitRequestStatus>,
    ) -> StoreResult<Vec<LimitIncreaseRequest>> {
        let rows = sqlx::query(&format!(
            "SELECT {LIMIT_COLUMNS} FROM {} WHERE ($1::text IS NULL OR status = $1) ORDER BY submitted_at DESC",
            limit_table(kind)
        ))
        .bind(status.map(|s| fcb_banking::Outcome::as_str(&s)))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_limit_requests", e))?;
        decode_all(&rows, |r| decode_limit(r, kind))
    }

    #[instrument(skip(self, decision), fields(request_id = %id), err)]
    async fn resolve_limit_request(
        &self,
        kind: LimitKind,
        id: RequestId,
        admin: AdminId,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> StoreResult<LimitIncreaseRequest> {
        let table = limit_table(kind);
        let mut tx = self.begin().await?;
        let row = sqlx::query(&format!("SELECT {LIMIT_COLUMNS} FROM {table} WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_limit_request", e))?
            .ok_or(StoreError::NotFound("limit increase request"))?;
        let mut request = decode_limit(&row, kind)?;
        match decision {
            Decision::Approve => request.review.approve(admin, now)?,
            Decision::Reject(reason) => request.review.reject(admin, now, &reason)?,
        }
        write_review(&mut tx, table, id, &request.review).await?;
        commit(tx).await?;
        Ok(request)
    }

    async fn insert_application(&self, a: AccountApplication) -> StoreResult<AccountApplication> {
        sqlx::query(&format!(
            "INSERT INTO account_applications ({APPLICATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
        ))
        .bind(a.id.as_uuid())
        .bind(a.account_type.as_str())
        .bind(&a.personal_info.first_name)
        .bind(&a.personal_info.last_name)
        .bind(&a.personal_info.email)
        .bind(&a.personal_info.phone)
        .bind(a.personal_info.date_of_birth)
        .bind(&a.personal_info.address)
        .bind(&a.personal_info.ssn_last4)
        .bind(&a.employment)
        .bind(a.annual_income.map(|m| m.amount()))
        .bind(a.initial_deposit.amount())
        .bind(fcb_banking::Outcome::as_str(&a.review.status))
        .bind(a.review.processed_by.map(|x| *x.as_uuid()))
        .bind(a.review.processed_at)
        .bind(&a.review.rejection_reason)
        .bind(&a.access_code)
        .bind(a.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_application", e))?;
        Ok(a)
    }

    async fn find_application(&self, id: RequestId) -> StoreResult<Option<AccountApplication>> {
        let row = sqlx::query(&format!("SELECT {APPLICATION_COLUMNS} FROM account_applications WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_application", e))?;
        row.as_ref().map(decode_application).transpose()
    }

    async fn list_applications(&self, status: Option<ApprovalStatus>) -> StoreResult<Vec<AccountApplication>> {
        let rows = sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM account_applications \
             WHERE ($1::text IS NULL OR status = $1) ORDER BY submitted_at DESC"
        ))
        .bind(status.map(|s| fcb_banking::Outcome::as_str(&s)))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_applications", e))?;
        decode_all(&rows, decode_application)
    }

    #[instrument(skip(self, decision), fields(application_id = %id), err)]
    async fn resolve_application(
        &self,
        id: RequestId,
        admin: AdminId,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> StoreResult<(AccountApplication, Option<AccessCode>)> {
        let mut tx = self.begin().await?;
        let row = sqlx::query(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM account_applications WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_application", e))?
        .ok_or(StoreError::NotFound("account application"))?;
        let mut application = decode_application(&row)?;

        let code = match decision {
            Decision::Approve => Some(application.approve(admin, now)?),
            Decision::Reject(reason) => {
                application.review.reject(admin, now, &reason)?;
                None
            }
        };

        write_review(&mut tx, "account_applications", id, &application.review).await?;
        if let Some(code) = &code {
            sqlx::query("UPDATE account_applications SET access_code = $2 WHERE id = $1")
                .bind(id.as_uuid())
                .bind(&code.code)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("store_access_code", e))?;
            sqlx::query("INSERT INTO access_codes (code, application_id, created_at, used_at) VALUES ($1, $2, $3, NULL)")
                .bind(&code.code)
                .bind(code.application_id.as_uuid())
                .bind(code.created_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_access_code", e))?;
        }
        commit(tx).await?;
        Ok((application, code))
    }

    async fn find_access_code(&self, code: &str) -> StoreResult<Option<AccessCode>> {
        let row = sqlx::query("SELECT code, application_id, created_at, used_at FROM access_codes WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_access_code", e))?;
        row.as_ref().map(decode_access_code).transpose()
    }

    #[instrument(skip(self, code, user, account), fields(user_id = %user.id), err)]
    async fn enroll(
        &self,
        code: &str,
        user: User,
        account: NewAccount,
        now: DateTime<Utc>,
    ) -> StoreResult<(User, Account)> {
        let mut tx = self.begin().await?;
        let row = sqlx::query(
            "SELECT code, application_id, created_at, used_at FROM access_codes WHERE code = $1 FOR UPDATE",
        )
        .bind(code)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_access_code", e))?
        .ok_or(StoreError::NotFound("access code"))?;
        let mut access = decode_access_code(&row)?;
        access.consume(now)?;

        let mut opened = open_customer(&mut tx, &user, vec![account], now).await?;
        sqlx::query("UPDATE access_codes SET used_at = $2 WHERE code = $1")
            .bind(&access.code)
            .bind(access.used_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("consume_access_code", e))?;
        commit(tx).await?;

        let account = opened
            .pop()
            .ok_or_else(|| StoreError::Backend("enrollment opened no account".to_string()))?;
        Ok((user, account))
    }
}
