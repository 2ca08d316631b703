use std::time::Instant;

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use stagecraft_auth::{IdentityHeaders, resolve_actor};

use crate::app::errors::ApiError;
use crate::context::RequestId;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const BROKERAGE_ID_HEADER: &str = "x-brokerage-id";
pub const OFFICE_ID_HEADER: &str = "x-office-id";
pub const TEAM_ID_HEADER: &str = "x-team-id";
pub const BOOTSTRAP_SECRET_HEADER: &str = "x-bootstrap-secret";

pub fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Assigns the request id, echoes it back and logs one line per request.
pub async fn request_context(mut req: Request, next: Next) -> Response {
    let request_id = RequestId::from_header(header(req.headers(), REQUEST_ID_HEADER));
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(request_id.clone());

    let started = Instant::now();
    let mut res = next.run(req).await;

    tracing::info!(
        %method,
        path = %path,
        status = res.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        request_id = request_id.as_str(),
        "request completed"
    );
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        res.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    res
}

/// Resolves the caller's `ActorContext` from identity headers.
pub async fn identity(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .cloned()
        .unwrap_or_else(|| RequestId::from_header(None));

    let headers = req.headers();
    let actor = resolve_actor(&IdentityHeaders {
        user_id: header(headers, USER_ID_HEADER),
        role: header(headers, USER_ROLE_HEADER),
        brokerage_id: header(headers, BROKERAGE_ID_HEADER),
        office_id: header(headers, OFFICE_ID_HEADER),
        team_id: header(headers, TEAM_ID_HEADER),
        request_id: Some(request_id.as_str()),
    })
    .map_err(|e| ApiError::new(e, &request_id))?;

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}
