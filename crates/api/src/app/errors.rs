use axum::async_trait;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, error};

use fcb_core::DomainError;
use fcb_infra::BankError;

/// Handler error: any bank failure, rendered by [`bank_error_to_response`].
#[derive(Debug)]
pub struct ApiError(pub BankError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<BankError> for ApiError {
    fn from(err: BankError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        bank_error_to_response(self.0)
    }
}

pub fn bank_error_to_response(err: BankError) -> Response {
    let code = err.code();
    let status = match &err {
        BankError::Validation(_) => StatusCode::BAD_REQUEST,
        BankError::NotFound(_) => StatusCode::NOT_FOUND,
        BankError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        BankError::Conflict(_) => StatusCode::CONFLICT,
        BankError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        BankError::Forbidden(_) => StatusCode::FORBIDDEN,
        BankError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!(error = %err, "request failed");
        // Store details stay in the logs.
        return json_error(status, code, "internal server error");
    }
    debug!(error = %err, status = status.as_u16(), "request rejected");
    json_error(status, code, err.to_string())
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// `axum::Json` whose rejections (bad syntax, wrong shape, missing content
/// type) come back as `400 validation_error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}

/// `axum::extract::Query` with the same `400 validation_error` body as
/// [`JsonBody`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

fn query_rejection(rejection: QueryRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}

/// Parse a path or query segment, mapping failures to `400`.
pub fn parse<T>(value: &str) -> ApiResult<T>
where
    T: core::str::FromStr<Err = DomainError>,
{
    Ok(value.parse::<T>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_map_to_statuses() {
        let cases = [
            (BankError::validation("bad"), StatusCode::BAD_REQUEST),
            (BankError::NotFound("account"), StatusCode::NOT_FOUND),
            (BankError::conflict("already resolved"), StatusCode::CONFLICT),
            (BankError::Unauthorized("no token".into()), StatusCode::UNAUTHORIZED),
            (BankError::Forbidden("blocked".into()), StatusCode::FORBIDDEN),
            (BankError::Store("disk on fire".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(bank_error_to_response(err).status(), status);
        }
    }

    #[derive(Debug, serde::Deserialize)]
    struct Paging {
        #[allow(dead_code)]
        limit: Option<u32>,
    }

    #[tokio::test]
    async fn malformed_query_strings_are_json_validation_errors() {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/api/user/transactions?limit=abc")
            .body(axum::body::Body::empty())
            .unwrap()
            .into_parts();

        let response = QueryParams::<Paging>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[axum::http::header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[test]
    fn domain_errors_become_bad_requests() {
        let err: ApiError = DomainError::validation("amount must be greater than zero").into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
