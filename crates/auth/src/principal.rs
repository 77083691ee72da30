use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fcb_core::{AdminId, UserId};

use crate::Role;

/// Identity of an authenticated principal (customer or administrator).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<UserId> for PrincipalId {
    fn from(value: UserId) -> Self {
        Self(value.into())
    }
}

impl From<AdminId> for PrincipalId {
    fn from(value: AdminId) -> Self {
        Self(value.into())
    }
}

impl FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// A verified session: who is calling and in which role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Role,
}

impl Principal {
    pub fn customer(user_id: UserId) -> Self {
        Self {
            id: user_id.into(),
            role: Role::CUSTOMER,
        }
    }

    pub fn admin(admin_id: AdminId) -> Self {
        Self {
            id: admin_id.into(),
            role: Role::ADMIN,
        }
    }

    pub fn user_id(&self) -> UserId {
        UserId::from_uuid(self.id.0)
    }

    pub fn admin_id(&self) -> AdminId {
        AdminId::from_uuid(self.id.0)
    }
}
