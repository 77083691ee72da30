use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use fcb_core::RequestId;

use crate::app::dto;
use crate::app::errors::{ApiResult, JsonBody, parse};
use crate::app::services::AppServices;

/// Anyone may apply; the response carries the id to check status with.
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::ApplicationBody>,
) -> ApiResult<impl IntoResponse> {
    let application = services.approvals.submit_application(body.into_form()?).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn get(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let application = services.approvals.application(parse::<RequestId>(&id)?).await?;
    Ok(Json(application))
}
