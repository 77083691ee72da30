use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use fcb_banking::LimitKind;
use fcb_core::AccountId;
use fcb_infra::Page;

use crate::app::dto;
use crate::app::errors::{ApiResult, JsonBody, QueryParams, parse};
use crate::app::services::AppServices;
use crate::context::CustomerContext;

/// The customer's main account (first checking account).
pub async fn primary_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
) -> ApiResult<impl IntoResponse> {
    let account = services.accounts.primary_account(customer.user_id()).await?;
    Ok(Json(account))
}

pub async fn accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
) -> ApiResult<impl IntoResponse> {
    let items = services.accounts.accounts(customer.user_id()).await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn recent_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    QueryParams(query): QueryParams<dto::PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let items = services
        .accounts
        .recent_transactions(customer.user_id(), query.limit)
        .await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn account_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    Path(account_id): Path<String>,
    QueryParams(query): QueryParams<dto::PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let page = Page::new(query.limit, query.offset);
    let items = services
        .accounts
        .account_transactions(customer.user_id(), parse::<AccountId>(&account_id)?, page)
        .await?;
    Ok(Json(json!({ "items": items, "limit": page.limit, "offset": page.offset })))
}

pub async fn statement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    Path(account_id): Path<String>,
    QueryParams(query): QueryParams<dto::MonthQuery>,
) -> ApiResult<impl IntoResponse> {
    let statement = services
        .accounts
        .statement(
            customer.user_id(),
            parse::<AccountId>(&account_id)?,
            query.month.as_deref(),
        )
        .await?;
    Ok(Json(statement))
}

pub async fn external_transfers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
) -> ApiResult<impl IntoResponse> {
    let items = services.accounts.external_transfers(customer.user_id()).await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn wires(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
) -> ApiResult<impl IntoResponse> {
    let items = services.accounts.wires(customer.user_id()).await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn credit_limit_increase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    JsonBody(body): JsonBody<dto::LimitIncreaseBody>,
) -> ApiResult<impl IntoResponse> {
    submit_limit_increase(services, customer, LimitKind::Credit, body).await
}

pub async fn debit_limit_increase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    JsonBody(body): JsonBody<dto::LimitIncreaseBody>,
) -> ApiResult<impl IntoResponse> {
    submit_limit_increase(services, customer, LimitKind::Debit, body).await
}

async fn submit_limit_increase(
    services: Arc<AppServices>,
    customer: CustomerContext,
    kind: LimitKind,
    body: dto::LimitIncreaseBody,
) -> ApiResult<(StatusCode, Json<fcb_banking::LimitIncreaseRequest>)> {
    let form = body.into_form(kind, customer.user_id())?;
    let request = services.approvals.submit_limit_increase(form).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn limit_requests(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
) -> ApiResult<impl IntoResponse> {
    let items = services.accounts.limit_requests(customer.user_id()).await?;
    Ok(Json(json!({ "items": items })))
}
