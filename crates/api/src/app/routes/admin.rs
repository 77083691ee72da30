use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use fcb_auth::UserStatus;
use fcb_banking::{ApprovalStatus, LimitKind, LimitRequestStatus, WireKind, WireStatus};
use fcb_core::{AccountId, RequestId, UserId};
use fcb_infra::{Decision, Page};

use crate::app::dto::{self, parse_filter};
use crate::app::errors::{ApiResult, JsonBody, QueryParams, parse};
use crate::app::services::AppServices;
use crate::context::AdminContext;

pub async fn stats(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(services.back_office.stats().await?))
}

// -- customers ---------------------------------------------------------------

pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
) -> ApiResult<impl IntoResponse> {
    let items = services.back_office.customers().await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn create_customer(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::CreateCustomerBody>,
) -> ApiResult<impl IntoResponse> {
    let (user, accounts) = services.back_office.create_customer(body.into_customer()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "user": user, "accounts": accounts })),
    ))
}

/// `:id` is an account id.
pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let customer = services.back_office.customer(parse::<AccountId>(&id)?).await?;
    Ok(Json(customer))
}

pub async fn delete_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let account = services.back_office.delete_customer(parse::<AccountId>(&id)?).await?;
    Ok(Json(json!({ "deleted": account })))
}

pub async fn set_user_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::UserStatusBody>,
) -> ApiResult<impl IntoResponse> {
    let status = parse::<UserStatus>(&body.status)?;
    let user = services
        .back_office
        .set_user_status(parse::<UserId>(&id)?, status, body.reason)
        .await?;
    Ok(Json(json!({ "user": user })))
}

// -- ledger ------------------------------------------------------------------

pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    QueryParams(query): QueryParams<dto::PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = Page::new(query.limit, query.offset);
    let items = services.back_office.transactions(page).await?;
    Ok(Json(json!({ "items": items, "limit": page.limit, "offset": page.offset })))
}

/// Manual credit or debit; balance checks do not apply.
pub async fn post_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    JsonBody(body): JsonBody<dto::ManualPostingBody>,
) -> ApiResult<impl IntoResponse> {
    let posted = services.back_office.post_transaction(body.into_posting()?).await?;
    tracing::info!(admin_id = %admin.admin_id(), transaction_id = %posted.transaction.id, "admin posting");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "account": posted.account, "transaction": posted.transaction })),
    ))
}

// -- external transfers ------------------------------------------------------

pub async fn list_external_transfers(
    Extension(services): Extension<Arc<AppServices>>,
    QueryParams(query): QueryParams<dto::StatusQuery>,
) -> ApiResult<impl IntoResponse> {
    let status = parse_filter::<ApprovalStatus>(query.status.as_deref())?;
    let items = services.approvals.external_transfers(status).await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn approve_external_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    resolve_external_transfer(services, admin, id, Decision::Approve).await
}

pub async fn disapprove_external_transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::RejectBody>,
) -> ApiResult<impl IntoResponse> {
    resolve_external_transfer(services, admin, id, Decision::Reject(body.reason)).await
}

async fn resolve_external_transfer(
    services: Arc<AppServices>,
    admin: AdminContext,
    id: String,
    decision: Decision,
) -> ApiResult<Json<serde_json::Value>> {
    let (transfer, posted) = services
        .approvals
        .resolve_external_transfer(parse::<RequestId>(&id)?, admin.admin_id(), decision)
        .await?;
    Ok(Json(json!({
        "transfer": transfer,
        "transaction": posted.map(|p| p.transaction),
    })))
}

// -- limit increases ---------------------------------------------------------

pub async fn list_limit_increases(
    Extension(services): Extension<Arc<AppServices>>,
    Path(kind): Path<String>,
    QueryParams(query): QueryParams<dto::StatusQuery>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse::<LimitKind>(&kind)?;
    let status = parse_filter::<LimitRequestStatus>(query.status.as_deref())?;
    let items = services.approvals.limit_requests(kind, status).await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn approve_limit_increase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path((kind, id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    resolve_limit_increase(services, admin, kind, id, Decision::Approve).await
}

pub async fn deny_limit_increase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path((kind, id)): Path<(String, String)>,
    JsonBody(body): JsonBody<dto::RejectBody>,
) -> ApiResult<impl IntoResponse> {
    resolve_limit_increase(services, admin, kind, id, Decision::Reject(body.reason)).await
}

async fn resolve_limit_increase(
    services: Arc<AppServices>,
    admin: AdminContext,
    kind: String,
    id: String,
    decision: Decision,
) -> ApiResult<Json<fcb_banking::LimitIncreaseRequest>> {
    let request = services
        .approvals
        .resolve_limit_increase(
            parse::<LimitKind>(&kind)?,
            parse::<RequestId>(&id)?,
            admin.admin_id(),
            decision,
        )
        .await?;
    Ok(Json(request))
}

// -- account applications ----------------------------------------------------

pub async fn list_applications(
    Extension(services): Extension<Arc<AppServices>>,
    QueryParams(query): QueryParams<dto::StatusQuery>,
) -> ApiResult<impl IntoResponse> {
    let status = parse_filter::<ApprovalStatus>(query.status.as_deref())?;
    let items = services.approvals.applications(status).await?;
    Ok(Json(json!({ "items": items })))
}

/// The access code in the response is what the applicant enrolls with.
pub async fn approve_application(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    resolve_application(services, admin, id, Decision::Approve).await
}

pub async fn disapprove_application(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(admin): Extension<AdminContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::RejectBody>,
) -> ApiResult<impl IntoResponse> {
    resolve_application(services, admin, id, Decision::Reject(body.reason)).await
}

async fn resolve_application(
    services: Arc<AppServices>,
    admin: AdminContext,
    id: String,
    decision: Decision,
) -> ApiResult<Json<serde_json::Value>> {
    let (application, code) = services
        .approvals
        .resolve_application(parse::<RequestId>(&id)?, admin.admin_id(), decision)
        .await?;
    Ok(Json(json!({
        "application": application,
        "accessCode": code.map(|c| c.code),
    })))
}

// -- wires -------------------------------------------------------------------

pub async fn list_wires(
    Extension(services): Extension<Arc<AppServices>>,
    QueryParams(query): QueryParams<dto::WireKindQuery>,
) -> ApiResult<impl IntoResponse> {
    let kind = parse_filter::<WireKind>(query.kind.as_deref())?;
    let items = services.back_office.wires(kind).await?;
    Ok(Json(json!({ "items": items })))
}

/// Failing a wire refunds its full debit.
pub async fn update_wire_status(
    Extension(services): Extension<Arc<AppServices>>,
    Path((kind, id)): Path<(String, String)>,
    JsonBody(body): JsonBody<dto::WireStatusBody>,
) -> ApiResult<impl IntoResponse> {
    let (wire, refund) = services
        .back_office
        .update_wire_status(
            parse::<WireKind>(&kind)?,
            parse::<RequestId>(&id)?,
            parse::<WireStatus>(&body.status)?,
        )
        .await?;
    Ok(Json(json!({
        "wire": wire,
        "refund": refund.map(|p| p.transaction),
    })))
}
