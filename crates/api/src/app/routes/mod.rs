//! Route tables. Each group is layered with its own guard in `build_app`.

use axum::{
    Router,
    routing::{get, patch, post},
};

pub mod admin;
pub mod applications;
pub mod auth;
pub mod customer;
pub mod system;
pub mod transfers;

/// No token required.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/api/account-applications", post(applications::submit))
        .route("/api/account-applications/:id", get(applications::get))
        .route("/api/user/login", post(auth::customer_login))
        .route("/api/user/enroll", post(auth::enroll))
        .route("/api/admin/login", post(auth::admin_login))
}

/// Signed-in, active customers.
pub fn customer_router() -> Router {
    Router::new()
        .route("/api/user/session", get(auth::session))
        .route("/api/user/logout", post(auth::logout))
        .route("/api/user/account", get(customer::primary_account))
        .route("/api/user/accounts", get(customer::accounts))
        .route("/api/user/transactions", get(customer::recent_transactions))
        .route(
            "/api/user/account-transactions/:account_id",
            get(customer::account_transactions),
        )
        .route("/api/user/statements/:account_id", get(customer::statement))
        .route("/api/user/transfer", post(transfers::internal))
        .route(
            "/api/user/external-transfer",
            post(transfers::external),
        )
        .route(
            "/api/user/domestic-wire-transfer",
            post(transfers::domestic_wire),
        )
        .route(
            "/api/user/international-wire-transfer",
            post(transfers::international_wire),
        )
        .route("/api/user/billpay", post(transfers::bill_pay))
        .route("/api/user/external-transfers", get(customer::external_transfers))
        .route("/api/user/wire-transfers", get(customer::wires))
        .route(
            "/api/user/credit-limit-increase",
            post(customer::credit_limit_increase),
        )
        .route(
            "/api/user/debit-limit-increase",
            post(customer::debit_limit_increase),
        )
        .route(
            "/api/user/limit-increase-requests",
            get(customer::limit_requests),
        )
}

/// Back-office administrators.
pub fn admin_router() -> Router {
    Router::new()
        .route("/api/admin/dashboard/stats", get(admin::stats))
        .route(
            "/api/admin/customers",
            get(admin::list_customers).post(admin::create_customer),
        )
        .route(
            "/api/admin/customers/:id",
            get(admin::get_customer).delete(admin::delete_customer),
        )
        .route("/api/admin/users/:id/status", patch(admin::set_user_status))
        .route(
            "/api/admin/transactions",
            get(admin::list_transactions).post(admin::post_transaction),
        )
        .route(
            "/api/admin/external-transfers",
            get(admin::list_external_transfers),
        )
        .route(
            "/api/admin/external-transfers/:id/approve",
            post(admin::approve_external_transfer),
        )
        .route(
            "/api/admin/external-transfers/:id/disapprove",
            post(admin::disapprove_external_transfer),
        )
        .route("/api/admin/limit-increases/:kind", get(admin::list_limit_increases))
        .route(
            "/api/admin/limit-increases/:kind/:id/approve",
            post(admin::approve_limit_increase),
        )
        .route(
            "/api/admin/limit-increases/:kind/:id/deny",
            post(admin::deny_limit_increase),
        )
        .route(
            "/api/admin/account-applications",
            get(admin::list_applications),
        )
        .route(
            "/api/admin/account-applications/:id/approve",
            post(admin::approve_application),
        )
        .route(
            "/api/admin/account-applications/:id/disapprove",
            post(admin::disapprove_application),
        )
        .route("/api/admin/wire-transfers", get(admin::list_wires))
        .route(
            "/api/admin/wire-transfers/:kind/:id",
            patch(admin::update_wire_status),
        )
}
