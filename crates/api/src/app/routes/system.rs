use std::sync::Arc;

use axum::extract::Extension;
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::json;

use stagecraft_infra::WorkflowHandlers;
use stagecraft_infra::handlers::BootstrapInput;

use crate::app::dto::ApiJson;
use crate::app::errors::{self, ApiResult, WithRequest};
use crate::context::RequestId;
use crate::middleware::{BOOTSTRAP_SECRET_HEADER, header};

pub async fn health(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(request_id): Extension<RequestId>,
) -> Response {
    errors::ok(
        json!({ "status": "ok", "store": handlers.store().kv().backend() }),
        &request_id,
    )
}

pub async fn bootstrap(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<BootstrapInput>,
) -> ApiResult {
    let result = handlers
        .bootstrap(body, header(&headers, BOOTSTRAP_SECRET_HEADER), request_id.as_str().to_string())
        .await
        .in_request(&request_id)?;
    Ok(errors::created(result, &request_id))
}
