//! Authorization checks applied at the request boundary.

use thiserror::Error;

use crate::{Principal, Role, User, UserStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: requires role '{0}'")]
    WrongRole(String),

    #[error("account is {status}: {reason}")]
    Inactive { status: UserStatus, reason: String },
}

pub fn require_role(principal: &Principal, required: &Role) -> Result<(), AuthzError> {
    if &principal.role == required {
        Ok(())
    } else {
        Err(AuthzError::WrongRole(required.as_str().to_string()))
    }
}

/// Blocked and suspended customers lose dashboard access immediately, even
/// with an unexpired token.
pub fn require_active(user: &User) -> Result<(), AuthzError> {
    if user.is_active() {
        return Ok(());
    }
    Err(AuthzError::Inactive {
        status: user.status,
        reason: user
            .status_reason
            .clone()
            .unwrap_or_else(|| "contact customer support".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcb_core::{AdminId, UserId};

    #[test]
    fn roles_must_match_exactly() {
        let customer = Principal::customer(UserId::new());
        let admin = Principal::admin(AdminId::new());
        assert!(require_role(&customer, &Role::CUSTOMER).is_ok());
        assert_eq!(
            require_role(&customer, &Role::ADMIN),
            Err(AuthzError::WrongRole("admin".into()))
        );
        assert!(require_role(&admin, &Role::ADMIN).is_ok());
    }
}
