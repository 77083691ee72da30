//! Login and session checks for customers and administrators.
//!
//! Sessions are stateless bearer tokens. A customer's status is re-read on
//! every request, so blocking a user takes effect before the token expires.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use fcb_auth::{
    AdminUser, Hs256JwtValidator, JwtValidator, Principal, Role, User, require_active, require_role,
};

use crate::error::{BankError, BankResult};
use crate::passwords;
use crate::store::BankStore;

const BAD_CREDENTIALS: &str = "invalid username or password";

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn BankStore>,
    tokens: Arc<Hs256JwtValidator>,
}

impl SessionService {
    pub fn new(store: Arc<dyn BankStore>, tokens: Arc<Hs256JwtValidator>) -> Self {
        Self { store, tokens }
    }

    fn issue(&self, principal: &Principal) -> BankResult<String> {
        self.tokens
            .issue(principal, Utc::now())
            .map_err(|e| BankError::Store(format!("failed to issue session token: {e}")))
    }

    /// Returns the user and a bearer token. Blocked or suspended users are
    /// refused even with the right password.
    pub async fn login_customer(&self, username: &str, password: &str) -> BankResult<(User, String)> {
        let found = self.store.find_user_by_username(username.trim()).await?;
        let verified = match &found {
            Some(u) => passwords::verify(password, &u.password_hash).await?,
            None => false,
        };
        let Some(user) = found.filter(|_| verified) else {
            warn!(username = %username.trim(), "customer login failed");
            return Err(BankError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };
        require_active(&user).map_err(|e| BankError::Forbidden(e.to_string()))?;

        let token = self.issue(&Principal::customer(user.id))?;
        info!(user_id = %user.id, "customer logged in");
        Ok((user, token))
    }

    pub async fn login_admin(&self, username: &str, password: &str) -> BankResult<(AdminUser, String)> {
        let found = self.store.find_admin_by_username(username.trim()).await?;
        let verified = match &found {
            Some(a) => passwords::verify(password, &a.password_hash).await?,
            None => false,
        };
        let Some(admin) = found.filter(|_| verified) else {
            warn!(username = %username.trim(), "admin login failed");
            return Err(BankError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };

        let token = self.issue(&Principal::admin(admin.id))?;
        info!(admin_id = %admin.id, "admin logged in");
        Ok((admin, token))
    }

    /// Verify a bearer token.
    pub fn authenticate(&self, token: &str) -> BankResult<Principal> {
        self.tokens
            .validate(token, Utc::now())
            .map(|claims| claims.principal())
            .map_err(|e| BankError::Unauthorized(e.to_string()))
    }

    /// Resolve a customer principal to its user, refusing inactive users.
    pub async fn active_customer(&self, principal: &Principal) -> BankResult<User> {
        require_role(principal, &Role::CUSTOMER).map_err(|e| BankError::Forbidden(e.to_string()))?;
        let user = self
            .store
            .find_user(principal.user_id())
            .await?
            .ok_or_else(|| BankError::Unauthorized("session user no longer exists".to_string()))?;
        require_active(&user).map_err(|e| BankError::Forbidden(e.to_string()))?;
        Ok(user)
    }

    pub async fn admin(&self, principal: &Principal) -> BankResult<AdminUser> {
        require_role(principal, &Role::ADMIN).map_err(|e| BankError::Forbidden(e.to_string()))?;
        self.store
            .find_admin(principal.admin_id())
            .await?
            .ok_or_else(|| BankError::Unauthorized("session admin no longer exists".to_string()))
    }
}
