use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};

use stagecraft_core::{DomainError, ErrorCode};

use crate::context::RequestId;

pub type ApiResult = Result<Response, ApiError>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuccessEnvelope<'a, T> {
    ok: bool,
    data: T,
    request_id: &'a str,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: ErrorCode,
    message: &'a str,
    details: &'a Map<String, Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope<'a> {
    ok: bool,
    error: ErrorBody<'a>,
    request_id: &'a str,
}

/// A domain error bound to the request it failed.
#[derive(Debug)]
pub struct ApiError {
    error: DomainError,
    request_id: String,
}

impl ApiError {
    pub fn new(error: DomainError, request_id: &RequestId) -> Self {
        Self {
            error,
            request_id: request_id.as_str().to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.error.code;
        match code {
            ErrorCode::Forbidden | ErrorCode::TenantScopeViolation => tracing::warn!(
                code = code.as_str(),
                request_id = %self.request_id,
                message = %self.error.message,
                "request denied"
            ),
            ErrorCode::InternalError => tracing::error!(
                request_id = %self.request_id,
                message = %self.error.message,
                "request failed"
            ),
            _ => tracing::debug!(
                code = code.as_str(),
                request_id = %self.request_id,
                "request rejected"
            ),
        }

        let status =
            StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorEnvelope {
            ok: false,
            error: ErrorBody {
                code,
                message: &self.error.message,
                details: &self.error.details,
            },
            request_id: &self.request_id,
        };
        (status, Json(body)).into_response()
    }
}

/// Attach the request id to a handler result.
pub trait WithRequest<T> {
    fn in_request(self, request_id: &RequestId) -> Result<T, ApiError>;
}

impl<T> WithRequest<T> for Result<T, DomainError> {
    fn in_request(self, request_id: &RequestId) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::new(e, request_id))
    }
}

pub fn ok<T: Serialize>(data: T, request_id: &RequestId) -> Response {
    respond(StatusCode::OK, data, request_id)
}

pub fn created<T: Serialize>(data: T, request_id: &RequestId) -> Response {
    respond(StatusCode::CREATED, data, request_id)
}

fn respond<T: Serialize>(status: StatusCode, data: T, request_id: &RequestId) -> Response {
    let body = SuccessEnvelope {
        ok: true,
        data,
        request_id: request_id.as_str(),
    };
    (status, Json(body)).into_response()
}
