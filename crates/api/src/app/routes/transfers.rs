//! Customer-initiated money movement. Internal transfers, wires and bill
//! payments settle before the response; external transfers wait for an
//! admin.

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

/// Move money between two of the customer's own accounts.
pub async fn internal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    JsonBody(body): JsonBody<dto::TransferRequest>,
) -> ApiResult<impl IntoResponse> {
    let receipt = services
        .engine
        .internal(body.into_transfer(customer.user_id())?)
        .await?;
    Ok(Json(receipt))
}

pub async fn external(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    JsonBody(body): JsonBody<dto::ExternalTransferBody>,
) -> ApiResult<impl IntoResponse> {
    let pending = services
        .engine
        .external(body.into_request(customer.user_id())?)
        .await?;
    Ok((StatusCode::CREATED, Json(pending)))
}

pub async fn domestic_wire(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    JsonBody(body): JsonBody<dto::WireTransferBody>,
) -> ApiResult<impl IntoResponse> {
    wire(services, customer, body, false).await
}

pub async fn international_wire(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    JsonBody(body): JsonBody<dto::WireTransferBody>,
) -> ApiResult<impl IntoResponse> {
    wire(services, customer, body, true).await
}

async fn wire(
    services: Arc<AppServices>,
    customer: CustomerContext,
    body: dto::WireTransferBody,
    international: bool,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let request = body.into_request(customer.user_id(), international)?;
    let (wire, receipt) = services.engine.wire(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "wire": wire, "receipt": receipt })),
    ))
}

pub async fn bill_pay(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    JsonBody(body): JsonBody<dto::BillPayBody>,
) -> ApiResult<impl IntoResponse> {
    let receipt = services
        .engine
        .bill_pay(body.into_payment(customer.user_id())?)
        .await?;
    Ok(Json(receipt))
}
