use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::info;

use fcb_auth::Principal;
use fcb_infra::BankError;

use crate::app::errors::bank_error_to_response;
use crate::app::services::AppServices;
use crate::context::{AdminContext, CustomerContext, PrincipalContext};

/// Customer routes: valid token, `customer` role, user still active.
pub async fn require_customer(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let principal = authenticate(&services, req.headers())?;
    let user = services
        .sessions
        .active_customer(&principal)
        .await
        .map_err(bank_error_to_response)?;

    req.extensions_mut().insert(PrincipalContext::new(principal));
    req.extensions_mut().insert(CustomerContext::new(user));
    Ok(next.run(req).await)
}

/// Admin routes: valid token with the `admin` role.
pub async fn require_admin(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let principal = authenticate(&services, req.headers())?;
    let admin = services
        .sessions
        .admin(&principal)
        .await
        .map_err(bank_error_to_response)?;

    req.extensions_mut().insert(PrincipalContext::new(principal));
    req.extensions_mut().insert(AdminContext::new(admin));
    Ok(next.run(req).await)
}

/// One log line per request.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

fn authenticate(services: &AppServices, headers: &HeaderMap) -> Result<Principal, Response> {
    let token = extract_bearer(headers).map_err(bank_error_to_response)?;
    services.sessions.authenticate(token).map_err(bank_error_to_response)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, BankError> {
    let missing = || BankError::Unauthorized("missing bearer token".to_string());

    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(missing)?;
    let header = header.to_str().map_err(|_| missing())?;
    let token = header.strip_prefix("Bearer ").ok_or_else(missing)?.trim();
    if token.is_empty() {
        return Err(missing());
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn other_schemes_and_blank_tokens_are_refused() {
        assert!(extract_bearer(&HeaderMap::new()).is_err());
        assert!(extract_bearer(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(extract_bearer(&headers("Bearer   ")).is_err());
    }
}
