use std::sync::Arc;

use axum::Router;
use axum::extract::{Extension, Query};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;

use stagecraft_auth::ActorContext;
use stagecraft_infra::WorkflowHandlers;
use stagecraft_infra::handlers::AuditQuery;
use stagecraft_workflow::{AuditEventType, ReportType};

use crate::app::dto::{self, AuditEventsQuery, ReportQuery};
use crate::app::errors::{self, ApiResult, WithRequest};
use crate::context::RequestId;

pub fn router() -> Router {
    Router::new()
        .route("/reports", get(report))
        .route("/reports/export", get(export_report))
        .route("/audit-events", get(audit_events))
}

pub async fn report(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    Query(query): Query<ReportQuery>,
) -> ApiResult {
    let report_type = dto::parse_opt::<ReportType>(query.report_type.as_deref())
        .in_request(&rid)?
        .unwrap_or(ReportType::Summary);
    let out = handlers.report(&actor, report_type).await.in_request(&rid)?;
    Ok(errors::ok(out, &rid))
}

/// The only non-envelope response: a `text/csv` attachment.
pub async fn export_report(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    Query(query): Query<ReportQuery>,
) -> ApiResult {
    let report_type: ReportType =
        dto::required("type", query.report_type.as_deref()).in_request(&rid)?;
    let csv = handlers.export_report(&actor, report_type).await.in_request(&rid)?;

    let disposition = format!("attachment; filename=\"{}\"", csv.filename);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv.body,
    )
        .into_response())
}

pub async fn audit_events(
    Extension(handlers): Extension<Arc<WorkflowHandlers>>,
    Extension(actor): Extension<ActorContext>,
    Extension(rid): Extension<RequestId>,
    Query(query): Query<AuditEventsQuery>,
) -> ApiResult {
    let audit_query = AuditQuery {
        entity_id: query.entity_id.filter(|id| !id.trim().is_empty()),
        event_type: dto::parse_opt::<AuditEventType>(query.event_type.as_deref()).in_request(&rid)?,
        limit: dto::parse_limit(query.limit.as_deref()).in_request(&rid)?,
    };
    let events = handlers.audit_events(&actor, audit_query).await.in_request(&rid)?;
    Ok(errors::ok(events, &rid))
}
