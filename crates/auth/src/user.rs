//! Online-banking customers and back-office administrators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fcb_core::{AdminId, DomainError, DomainResult, UserId};

/// Customer status.
///
/// Anything other than `Active` is denied at login and at every session check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Blocked,
    Suspended,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Blocked => "blocked",
            UserStatus::Suspended => "suspended",
        }
    }
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for UserStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "blocked" => Ok(UserStatus::Blocked),
            "suspended" => Ok(UserStatus::Suspended),
            _ => Err(DomainError::validation("status must be one of: active, blocked, suspended")),
        }
    }
}

/// Online-banking customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub status: UserStatus,
    pub status_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(profile: NewUserProfile, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            username: profile.username,
            email: profile.email,
            password_hash,
            first_name: profile.first_name,
            last_name: profile.last_name,
            phone: profile.phone,
            status: UserStatus::Active,
            status_reason: None,
            created_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Change status. A reason is required for anything but `Active`, and is
    /// cleared on reactivation.
    pub fn set_status(&mut self, status: UserStatus, reason: Option<String>) -> DomainResult<()> {
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        match status {
            UserStatus::Active => {
                self.status = status;
                self.status_reason = None;
            }
            _ => {
                let Some(reason) = reason else {
                    return Err(DomainError::validation(format!("a reason is required to mark a user {status}")));
                };
                self.status = status;
                self.status_reason = Some(reason);
            }
        }
        Ok(())
    }
}

/// Profile fields needed to create a customer login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserProfile {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

impl NewUserProfile {
    /// Trim fields and check the shape of username/email/password.
    pub fn validated(mut self, password: &str) -> DomainResult<Self> {
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_string();
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.phone = self.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());

        if self.username.len() < 4 || self.username.len() > 32 {
            return Err(DomainError::validation("username must be 4 to 32 characters"));
        }
        if !self
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(DomainError::validation(
                "username may only contain letters, digits, '_' and '.'",
            ));
        }
        if !looks_like_email(&self.email) {
            return Err(DomainError::validation("email is invalid"));
        }
        if self.first_name.is_empty() || self.last_name.is_empty() {
            return Err(DomainError::validation("first and last name are required"));
        }
        if password.len() < 8 {
            return Err(DomainError::validation("password must be at least 8 characters"));
        }
        Ok(self)
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

/// Back-office administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: AdminId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl AdminUser {
    pub fn new(username: impl Into<String>, password_hash: String, display_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: AdminId::new(),
            username: username.into(),
            password_hash,
            display_name: display_name.into(),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> NewUserProfile {
        NewUserProfile {
            username: " jdoe ".to_string(),
            email: "jdoe@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            phone: Some(" ".to_string()),
        }
    }

    #[test]
    fn profile_is_trimmed_and_checked() {
        let p = profile().validated("password123").unwrap();
        assert_eq!(p.username, "jdoe");
        assert_eq!(p.phone, None);

        assert!(profile().validated("short").is_err());

        let mut bad = profile();
        bad.email = "nope".to_string();
        assert!(bad.validated("password123").is_err());
    }

    #[test]
    fn blocking_requires_reason_and_reactivation_clears_it() {
        let mut user = User::new(profile().validated("password123").unwrap(), "hash".into(), Utc::now());
        assert!(user.set_status(UserStatus::Blocked, None).is_err());
        assert!(user.is_active());

        user.set_status(UserStatus::Blocked, Some("fraud review".into())).unwrap();
        assert!(!user.is_active());
        assert_eq!(user.status_reason.as_deref(), Some("fraud review"));

        user.set_status(UserStatus::Active, None).unwrap();
        assert!(user.is_active());
        assert_eq!(user.status_reason, None);
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User::new(profile().validated("password123").unwrap(), "secret-hash".into(), Utc::now());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["status"], "active");
    }
}
