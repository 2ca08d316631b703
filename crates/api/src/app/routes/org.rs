use std::sync::Arc;

use axum::Router;
use axum::extract::{Extension, Path, Query};
use axum::routing::{get, patch};

use stagecraft_auth::ActorContext;
use stagecraft_core::{OfficeId, UserId};
use stagecraft_infra::WorkflowHandlers;
use stagecraft_infra::handlers::{
    BrokeragePatch, MembershipInput, OfficeInput, OfficePatch, TeamInput, UserInput, UserPatch,
};

use crate::app::dto::{self, ApiJson, MembershipsQuery, TeamsQuery};
use crate::app::errors::{self, ApiResult, WithRequest};
use crate::context::RequestId;

pub fn router() -> Router {
    Router::new()
        .route("/brokerages", get(get_brokerage).patch(update_brokerage))
        .route("/offices", get(list_offices).post(create_office))
        .route("/offices/:id", patch(update_office))
        .route("/teams", get(list_teams).post(create_team))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", patch(update_user))
        .route("/memberships", get(list_memberships).post(create_membership))
}

pub async fn get_brokerage(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
) -> ApiResult {
    let brokerage = handlers.get_brokerage(&actor).await.in_request(&rid)?;
    Ok(errors::ok(brokerage, &rid))
}

pub async fn update_brokerage(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    ApiJson(body): ApiJson<BrokeragePatch>,
) -> ApiResult {
    let brokerage = handlers.update_brokerage(&actor, body).await.in_request(&rid)?;
    Ok(errors::ok(brokerage, &rid))
}

pub async fn create_office(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    ApiJson(body): ApiJson<OfficeInput>,
) -> ApiResult {
    let office = handlers.create_office(&actor, body).await.in_request(&rid)?;
    Ok(errors::created(office, &rid))
}

pub async fn list_offices(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
) -> ApiResult {
    let offices = handlers.list_offices(&actor).await.in_request(&rid)?;
    Ok(errors::ok(offices, &rid))
}

pub async fn update_office(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<OfficePatch>,
) -> ApiResult {
    let office_id: OfficeId = dto::required("id", Some(id.as_str())).in_request(&rid)?;
    let office = handlers.update_office(&actor, office_id, body).await.in_request(&rid)?;
    Ok(errors::ok(office, &rid))
}

pub async fn create_team(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    ApiJson(body): ApiJson<TeamInput>,
) -> ApiResult {
    let team = handlers.create_team(&actor, body).await.in_request(&rid)?;
    Ok(errors::created(team, &rid))
}

pub async fn list_teams(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    Query(query): Query<TeamsQuery>,
) -> ApiResult {
    let office_id = dto::parse_opt::<OfficeId>(query.office_id.as_deref()).in_request(&rid)?;
    let teams = handlers.list_teams(&actor, office_id).await.in_request(&rid)?;
    Ok(errors::ok(teams, &rid))
}

pub async fn create_user(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    ApiJson(body): ApiJson<UserInput>,
) -> ApiResult {
    let user = handlers.create_user(&actor, body).await.in_request(&rid)?;
    Ok(errors::created(user, &rid))
}

pub async fn list_users(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
) -> ApiResult {
    let users = handlers.list_users(&actor).await.in_request(&rid)?;
    Ok(errors::ok(users, &rid))
}

pub async fn update_user(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UserPatch>,
) -> ApiResult {
    let user_id: UserId = dto::required("id", Some(id.as_str())).in_request(&rid)?;
    let user = handlers.update_user(&actor, user_id, body).await.in_request(&rid)?;
    Ok(errors::ok(user, &rid))
}

pub async fn create_membership(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    ApiJson(body): ApiJson<MembershipInput>,
) -> ApiResult {
    let membership = handlers.create_membership(&actor, body).await.in_request(&rid)?;
    Ok(errors::created(membership, &rid))
}

pub async fn list_memberships(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    Query(query): Query<MembershipsQuery>,
) -> ApiResult {
    let user_id: UserId = dto::required("userId", query.user_id.as_deref()).in_request(&rid)?;
    let memberships = handlers.list_memberships(&actor, user_id).await.in_request(&rid)?;
    Ok(errors::ok(memberships, &rid))
}
