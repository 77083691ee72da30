use fcb_auth::{AdminUser, Principal, User};

/// Verified bearer-token identity for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

/// The signed-in customer, loaded fresh for every request so a block takes
/// effect on the next call.
#[derive(Debug, Clone)]
pub struct CustomerContext {
    user: User,
}

impl CustomerContext {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_id(&self) -> fcb_core::UserId {
        self.user.id
    }
}

#[derive(Debug, Clone)]
pub struct AdminContext {
    admin: AdminUser,
}

impl AdminContext {
    pub fn new(admin: AdminUser) -> Self {
        Self { admin }
    }

    pub fn admin(&self) -> &AdminUser {
        &self.admin
    }

    pub fn admin_id(&self) -> fcb_core::AdminId {
        self.admin.id
    }
}
