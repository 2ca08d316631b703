use std::sync::Arc;

use axum::Router;
use axum::extract::{Extension, Path, Query};
use axum::routing::{get, post};

use stagecraft_auth::ActorContext;
use stagecraft_core::{JobId, OfficeId};
use stagecraft_infra::WorkflowHandlers;
use stagecraft_infra::handlers::{
    ApprovalInput, CreateJobInput, DeliveryInput, RevisionInput, TransitionInput,
};
use stagecraft_workflow::JobStatus;

use crate::app::dto::{self, ApiJson, JobsQuery};
use crate::app::errors::{self, ApiResult, WithRequest};
use crate::context::RequestId;

pub fn router() -> Router {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/:id", get(get_job))
        .route("/jobs/:id/transition", post(transition_job))
        .route("/jobs/:id/approvals", post(record_approval))
        .route("/jobs/:id/deliveries", post(deliver_job))
        .route("/jobs/:id/revisions", post(request_revision))
        .route("/review-queue", get(review_queue))
}

fn job_id(raw: &str, rid: &RequestId) -> Result<JobId, errors::ApiError> {
    dto::required("id", Some(raw)).in_request(rid)
}

pub async fn create_job(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    ApiJson(body): ApiJson<CreateJobInput>,
) -> ApiResult {
    let created = handlers.create_job(&actor, body).await.in_request(&rid)?;
    Ok(errors::created(created, &rid))
}

pub async fn list_jobs(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    Query(query): Query<JobsQuery>,
) -> ApiResult {
    let status = dto::parse_opt::<JobStatus>(query.status.as_deref()).in_request(&rid)?;
    let office_id = dto::parse_opt::<OfficeId>(query.office_id.as_deref()).in_request(&rid)?;
    let jobs = handlers.list_jobs(&actor, status, office_id).await.in_request(&rid)?;
    Ok(errors::ok(jobs, &rid))
}

pub async fn get_job(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    Path(id): Path<String>,
) -> ApiResult {
    let detail = handlers.get_job(&actor, job_id(&id, &rid)?).await.in_request(&rid)?;
    Ok(errors::ok(detail, &rid))
}

pub async fn transition_job(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<TransitionInput>,
) -> ApiResult {
    let job = handlers
        .transition_job(&actor, job_id(&id, &rid)?, body)
        .await
        .in_request(&rid)?;
    Ok(errors::ok(job, &rid))
}

pub async fn record_approval(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ApprovalInput>,
) -> ApiResult {
    let out = handlers
        .record_approval(&actor, job_id(&id, &rid)?, body)
        .await
        .in_request(&rid)?;
    Ok(errors::created(out, &rid))
}

pub async fn deliver_job(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<DeliveryInput>,
) -> ApiResult {
    let out = handlers
        .deliver_job(&actor, job_id(&id, &rid)?, body)
        .await
        .in_request(&rid)?;
    Ok(errors::created(out, &rid))
}

pub async fn request_revision(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<RevisionInput>,
) -> ApiResult {
    let out = handlers
        .request_revision(&actor, job_id(&id, &rid)?, body)
        .await
        .in_request(&rid)?;
    Ok(errors::created(out, &rid))
}

pub async fn review_queue(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
) -> ApiResult {
    let jobs = handlers.review_queue(&actor).await.in_request(&rid)?;
    Ok(errors::ok(jobs, &rid))
}
