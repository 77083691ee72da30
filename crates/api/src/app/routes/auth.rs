use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::app::dto;
use crate::app::errors::{ApiResult, JsonBody};
use crate::app::services::AppServices;
use crate::context::CustomerContext;

pub async fn customer_login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, token) = services
        .sessions
        .login_customer(&body.username, &body.password)
        .await?;
    Ok(Json(dto::LoginResponse { user, token }))
}

pub async fn admin_login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (admin, token) = services
        .sessions
        .login_admin(&body.username, &body.password)
        .await?;
    Ok(Json(json!({ "admin": admin, "token": token })))
}

/// Redeem an access code from an approved application.
pub async fn enroll(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::EnrollRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, account) = services
        .approvals
        .enroll(&body.access_code, &body.username, &body.password)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "user": user, "account": account }))))
}

pub async fn session(Extension(customer): Extension<CustomerContext>) -> impl IntoResponse {
    Json(customer.user().clone())
}

/// Tokens are stateless; the client drops its copy.
pub async fn logout(Extension(customer): Extension<CustomerContext>) -> impl IntoResponse {
    tracing::info!(user_id = %customer.user_id(), "customer logged out");
    Json(json!({ "message": "logged out" }))
}
