use std::sync::Arc;

use axum::Router;
use axum::extract::{Extension, Path};
use axum::routing::{get, patch};

use stagecraft_auth::ActorContext;
use stagecraft_core::PresetId;
use stagecraft_infra::WorkflowHandlers;
use stagecraft_workflow::{PresetDraft, PresetPatch};

use crate::app::dto::{self, ApiJson};
use crate::app::errors::{self, ApiResult, WithRequest};
use crate::context::RequestId;

pub fn router() -> Router {
    Router::new()
        .route("/presets", get(list_presets).post(create_preset))
        .route("/presets/:id", patch(update_preset))
}

pub async fn create_preset(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    ApiJson(body): ApiJson<PresetDraft>,
) -> ApiResult {
    let preset = handlers.create_preset(&actor, body).await.in_request(&rid)?;
    Ok(errors::created(preset, &rid))
}

pub async fn list_presets(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
) -> ApiResult {
    let presets = handlers.list_presets(&actor).await.in_request(&rid)?;
    Ok(errors::ok(presets, &rid))
}

pub async fn update_preset(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PresetPatch>,
) -> ApiResult {
    let preset_id: PresetId = dto::required("id", Some(id.as_str())).in_request(&rid)?;
    let preset = handlers.update_preset(&actor, preset_id, body).await.in_request(&rid)?;
    Ok(errors::ok(preset, &rid))
}
