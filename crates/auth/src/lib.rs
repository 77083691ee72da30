//! `fcb-auth`: identities, credentials and session tokens.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, require_active, require_role};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator, TokenError};
pub use password::{PasswordError, hash_password, verify_password};
pub use principal::{Principal, PrincipalId};
pub use roles::Role;
pub use user::{AdminUser, NewUserProfile, User, UserStatus};
