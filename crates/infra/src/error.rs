//! Error returned by the bank services (transfer engine, approvals, back office).

use rust_decimal::Decimal;
use thiserror::Error;

use fcb_core::DomainError;

use crate::store::StoreError;

pub type BankResult<T> = Result<T, BankError>;

#[derive(Debug, Error)]
pub enum BankError {
    /// Malformed or out-of-range input. Nothing was changed.
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: Decimal, requested: Decimal },

    /// The target is not in a state that allows the change.
    #[error("{0}")]
    Conflict(String),

    /// Login failed or the session no longer names a usable identity.
    #[error("{0}")]
    Unauthorized(String),

    /// The identity exists but may not act (blocked user, wrong role).
    #[error("{0}")]
    Forbidden(String),

    #[error("storage failure: {0}")]
    Store(String),
}

impl BankError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            BankError::Validation(_) => "validation_error",
            BankError::NotFound(_) => "not_found",
            BankError::InsufficientFunds { .. } => "insufficient_funds",
            BankError::Conflict(_) => "conflict",
            BankError::Unauthorized(_) => "unauthorized",
            BankError::Forbidden(_) => "forbidden",
            BankError::Store(_) => "internal_error",
        }
    }
}

impl From<DomainError> for BankError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => BankError::Validation(msg),
            DomainError::InvalidId(msg) => BankError::Validation(format!("invalid identifier: {msg}")),
            DomainError::NotFound(what) => BankError::NotFound(what),
            DomainError::Conflict(msg) => BankError::Conflict(msg),
            DomainError::InsufficientFunds { available, requested } => {
                BankError::InsufficientFunds { available, requested }
            }
        }
    }
}

impl From<StoreError> for BankError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(what) => BankError::NotFound(what),
            StoreError::Conflict(msg) => BankError::Conflict(msg),
            StoreError::Domain(err) => err.into(),
            StoreError::Backend(msg) => BankError::Store(msg),
        }
    }
}

impl From<fcb_auth::PasswordError> for BankError {
    fn from(value: fcb_auth::PasswordError) -> Self {
        BankError::Store(value.to_string())
    }
}
