//! Startup data: the bootstrap administrator and an optional demo customer.
//!
//! Both steps are skipped when their username already exists, so running
//! them on every start is harmless.

use chrono::Utc;
use tracing::info;

use fcb_auth::{AdminUser, NewUserProfile};
use fcb_banking::AccountType;
use fcb_core::Money;

use crate::back_office::{BackOffice, NewCustomer};
use crate::config::BootstrapAdmin;
use crate::error::BankResult;
use crate::passwords;
use crate::store::BankStore;

pub const DEMO_USERNAME: &str = "jdoe";
pub const DEMO_PASSWORD: &str = "password123";

pub async fn ensure_admin(store: &dyn BankStore, admin: &BootstrapAdmin) -> BankResult<AdminUser> {
    if let Some(existing) = store.find_admin_by_username(&admin.username).await? {
        return Ok(existing);
    }
    let created = store
        .insert_admin(AdminUser::new(
            admin.username.clone(),
            passwords::hash(&admin.password).await?,
            "Bank Administrator",
            Utc::now(),
        ))
        .await?;
    info!(admin_id = %created.id, username = %created.username, "bootstrap admin created");
    Ok(created)
}

/// A customer with checking (1000.00) and savings (500.00).
pub async fn seed_demo_customer(store: &dyn BankStore, back_office: &BackOffice) -> BankResult<()> {
    if store.find_user_by_username(DEMO_USERNAME).await?.is_some() {
        return Ok(());
    }
    let (user, accounts) = back_office
        .create_customer(NewCustomer {
            profile: NewUserProfile {
                username: DEMO_USERNAME.to_string(),
                email: "jdoe@example.com".to_string(),
                first_name: "John".to_string(),
                last_name: "Doe".to_string(),
                phone: Some("555-0100".to_string()),
            },
            password: DEMO_PASSWORD.to_string(),
            accounts: vec![
                (AccountType::Checking, Money::from_cents(100_000)),
                (AccountType::Savings, Money::from_cents(50_000)),
            ],
        })
        .await?;
    info!(user_id = %user.id, accounts = accounts.len(), "demo customer seeded");
    Ok(())
}
