//! Argon2 hashing and verification, run on tokio's blocking pool.

use tokio::task;

use crate::error::{BankError, BankResult};

pub async fn hash(password: &str) -> BankResult<String> {
    let password = password.to_owned();
    task::spawn_blocking(move || fcb_auth::hash_password(&password))
        .await
        .map_err(|e| BankError::Store(format!("password hashing task failed: {e}")))?
        .map_err(BankError::from)
}

/// `false` for a wrong password or an unreadable stored hash.
pub async fn verify(password: &str, stored_hash: &str) -> BankResult<bool> {
    let (password, stored_hash) = (password.to_owned(), stored_hash.to_owned());
    task::spawn_blocking(move || fcb_auth::verify_password(&password, &stored_hash))
        .await
        .map_err(|e| BankError::Store(format!("password verification task failed: {e}")))
}
