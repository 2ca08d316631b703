use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use stagecraft_auth::{ActorContext, Permission, ScopeTarget, assert_permission};
use stagecraft_core::{DomainError, DomainResult, JobId};
use stagecraft_workflow::report::{self, JobRow, OfficeUsageRow, RevisionRow};
use stagecraft_workflow::{
    AuditEntityType, AuditEvent, AuditEventType, Job, JobRevision, Office, ReportSummary,
    ReportType,
};

use super::{WorkflowHandlers, in_scope, now};
use crate::store::keys;

const DEFAULT_AUDIT_LIMIT: usize = 100;
const MAX_AUDIT_LIMIT: usize = 500;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub event_type: Option<AuditEventType>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReportData {
    Summary(ReportSummary),
    Jobs(Vec<JobRow>),
    OfficeUsage(Vec<OfficeUsageRow>),
    Revisions(Vec<RevisionRow>),
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportOutput {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub data: ReportData,
}

/// A rendered CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub filename: String,
    pub body: String,
}

impl WorkflowHandlers {
    /// Offices, jobs and revisions in the actor's scope.
    async fn report_inputs(
        &self,
        actor: &ActorContext,
    ) -> DomainResult<(Vec<Office>, Vec<Job>, Vec<JobRevision>)> {
        let offices: Vec<Office> = self
            .store
            .load_index(&keys::brokerage_offices(actor.brokerage_id))
            .await?;
        let offices = offices
            .into_iter()
            .filter(|o| in_scope(actor, &o.scope()))
            .collect();

        let jobs = self.visible_jobs(actor, None).await?;
        let job_ids: HashSet<JobId> = jobs.iter().map(|j| j.id).collect();
        let revisions: Vec<JobRevision> = self
            .store
            .load_index(&keys::brokerage_revisions(actor.brokerage_id))
            .await?;
        let revisions = revisions
            .into_iter()
            .filter(|r| job_ids.contains(&r.job_id))
            .collect();

        Ok((offices, jobs, revisions))
    }

    async fn build_report(
        &self,
        actor: &ActorContext,
        report_type: ReportType,
    ) -> DomainResult<ReportData> {
        let (offices, mut jobs, revisions) = self.report_inputs(actor).await?;
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Ok(match report_type {
            ReportType::Summary => ReportData::Summary(report::summary(&jobs)),
            ReportType::Jobs => ReportData::Jobs(report::job_rows(&jobs)),
            ReportType::OfficeUsage => {
                ReportData::OfficeUsage(report::office_usage(&offices, &jobs))
            }
            ReportType::Revisions => ReportData::Revisions(report::revision_rows(&revisions)),
        })
    }

    pub async fn report(
        &self,
        actor: &ActorContext,
        report_type: ReportType,
    ) -> DomainResult<ReportOutput> {
        assert_permission(actor.role, Permission::ExportReport)?;
        let data = self.build_report(actor, report_type).await?;
        Ok(ReportOutput { report_type, data })
    }

    /// CSV form of a tabular report. Emits `REPORT_EXPORTED`.
    pub async fn export_report(
        &self,
        actor: &ActorContext,
        report_type: ReportType,
    ) -> DomainResult<CsvExport> {
        assert_permission(actor.role, Permission::ExportReport)?;
        if !report_type.is_exportable() {
            let message = format!("{} report has no CSV form", report_type.as_str());
            return Err(DomainError::validation(message).with_detail("type", report_type.as_str()));
        }

        let body = match self.build_report(actor, report_type).await? {
            ReportData::Jobs(rows) => report::to_csv(&rows),
            ReportData::OfficeUsage(rows) => report::to_csv(&rows),
            ReportData::Revisions(rows) => report::to_csv(&rows),
            ReportData::Summary(_) => {
                return Err(DomainError::internal("summary report has no CSV form"));
            }
        };

        let at = now();
        self.audit(
            AuditEvent::new(
                actor,
                AuditEventType::ReportExported,
                AuditEntityType::Report,
                report_type.as_str(),
                at,
            )
            .scoped(ScopeTarget {
                brokerage_id: actor.brokerage_id,
                office_id: actor.office_id,
                team_id: actor.team_id,
            }),
        )
        .await?;
        tracing::info!(
            report = report_type.as_str(),
            bytes = body.len(),
            request_id = %actor.request_id,
            "report exported"
        );

        Ok(CsvExport {
            filename: format!("{}-{}.csv", report_type.as_str(), at.format("%Y%m%d")),
            body,
        })
    }

    /// Most recent first, limited to events the actor's scope covers.
    pub async fn audit_events(
        &self,
        actor: &ActorContext,
        query: AuditQuery,
    ) -> DomainResult<Vec<AuditEvent>> {
        assert_permission(actor.role, Permission::ViewAudit)?;
        let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, MAX_AUDIT_LIMIT);

        let actor = actor.clone();
        self.store
            .audit_events(
                actor.brokerage_id,
                move |e| {
                    let target = ScopeTarget {
                        brokerage_id: e.brokerage_id,
                        office_id: e.office_id,
                        team_id: e.team_id,
                    };
                    in_scope(&actor, &target)
                        && query.entity_id.as_deref().is_none_or(|id| e.entity_id == id)
                        && query.event_type.is_none_or(|t| e.event_type == t)
                },
                limit,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{Fixture, actor_in};
    use super::super::{CreateJobInput, DeliveryInput, RevisionInput, TransitionInput};
    use super::*;
    use stagecraft_auth::Role;
    use stagecraft_core::ErrorCode;
    use stagecraft_workflow::{AssetInput, JobStatus, Preset, Priority};

    fn input(preset: &Preset, office: &Office) -> CreateJobInput {
        CreateJobInput {
            office_id: Some(office.id),
            team_id: None,
            agent_user_id: None,
            property_address: "4 Elm Rd, Unit \"B\"".into(),
            mls_id: None,
            preset_id: preset.id,
            requested_edit_categories: vec!["sky_replacement".into()],
            priority: Priority::Normal,
            disclosure_relevant: false,
            original_assets: vec![],
            submit: true,
        }
    }

    /// One delivered job with one revision in office A, one job in review in office B.
    async fn seeded() -> Fixture {
        let fx = Fixture::new().await;
        let delivered = fx
            .handlers
            .create_job(&fx.admin, input(&fx.direct_preset, &fx.office_a))
            .await
            .unwrap();
        let partner = actor_in(&fx, Role::MediaPartner, Some(fx.office_a.id), None);
        fx.handlers
            .transition_job(
                &partner,
                delivered.job.id,
                TransitionInput {
                    to_status: JobStatus::Processing,
                    reason: None,
                    note: None,
                    output_asset_ids: vec![],
                    revision_reason_category: None,
                },
            )
            .await
            .unwrap();
        fx.handlers
            .deliver_job(
                &partner,
                delivered.job.id,
                DeliveryInput {
                    outputs: vec![AssetInput {
                        url: Some("https://example/out.jpg".into()),
                        edit_label: None,
                    }],
                    notes: None,
                },
            )
            .await
            .unwrap();
        fx.handlers
            .request_revision(
                &fx.admin,
                delivered.job.id,
                RevisionInput {
                    reason_category: Some("color".into()),
                    notes: Some("warmer, please".into()),
                },
            )
            .await
            .unwrap();

        fx.handlers
            .create_job(&fx.admin, input(&fx.review_preset, &fx.office_b))
            .await
            .unwrap();
        fx
    }

    #[tokio::test]
    async fn summary_counts_statuses_and_revisions() {
        let fx = seeded().await;
        let out = fx.handlers.report(&fx.admin, ReportType::Summary).await.unwrap();
        let ReportData::Summary(summary) = out.data else {
            panic!("expected summary");
        };
        assert_eq!(summary.total_jobs, 2);
        assert_eq!(summary.jobs_by_status["Revision Requested"], 1);
        assert_eq!(summary.jobs_by_status["In Review"], 1);
        assert_eq!(summary.total_revisions, 1);
        assert_eq!(summary.delivered_jobs, 1);
        assert!(summary.average_turnaround_hours.is_some());
    }

    #[tokio::test]
    async fn office_admin_report_is_limited_to_own_office() {
        let fx = seeded().await;
        let office_admin = actor_in(&fx, Role::OfficeAdmin, Some(fx.office_b.id), None);
        let out = fx.handlers.report(&office_admin, ReportType::OfficeUsage).await.unwrap();
        let ReportData::OfficeUsage(rows) = out.data else {
            panic!("expected office usage");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].office_id, fx.office_b.id.to_string());
        assert_eq!(rows[0].total_jobs, 1);

        let out = fx.handlers.report(&office_admin, ReportType::Revisions).await.unwrap();
        assert!(matches!(out.data, ReportData::Revisions(ref rows) if rows.is_empty()));
    }

    #[tokio::test]
    async fn export_writes_csv_and_audits() {
        let fx = seeded().await;
        let csv = fx.handlers.export_report(&fx.admin, ReportType::Jobs).await.unwrap();
        assert!(csv.filename.starts_with("jobs-"));
        assert!(csv.filename.ends_with(".csv"));

        let mut lines = csv.body.lines();
        assert!(lines.next().unwrap().starts_with("jobId,"));
        assert_eq!(lines.count(), 2);
        assert!(csv.body.contains("\"4 Elm Rd, Unit \"\"B\"\"\""));

        let events = fx
            .handlers
            .audit_events(
                &fx.admin,
                AuditQuery {
                    event_type: Some(AuditEventType::ReportExported),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].entity_id, "jobs");
    }

    #[tokio::test]
    async fn summary_has_no_csv_form() {
        let fx = Fixture::new().await;
        let err = fx.handlers.export_report(&fx.admin, ReportType::Summary).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn reports_need_export_permission() {
        let fx = Fixture::new().await;
        let agent = actor_in(&fx, Role::Agent, Some(fx.office_a.id), None);
        let err = fx.handlers.report(&agent, ReportType::Jobs).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn audit_listing_filters_and_scopes() {
        let fx = seeded().await;

        let all = fx.handlers.audit_events(&fx.admin, AuditQuery::default()).await.unwrap();
        assert!(all.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        let limited = fx
            .handlers
            .audit_events(&fx.admin, AuditQuery { limit: Some(2), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);

        let office_admin = actor_in(&fx, Role::OfficeAdmin, Some(fx.office_b.id), None);
        let scoped = fx.handlers.audit_events(&office_admin, AuditQuery::default()).await.unwrap();
        assert!(!scoped.is_empty());
        assert!(scoped.iter().all(|e| e.office_id == Some(fx.office_b.id)));

        let revisions = fx
            .handlers
            .audit_events(
                &fx.admin,
                AuditQuery {
                    event_type: Some(AuditEventType::JobRevisionRequested),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(revisions.len(), 1);
        let by_entity = fx
            .handlers
            .audit_events(
                &fx.admin,
                AuditQuery {
                    entity_id: Some(revisions[0].entity_id.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_entity.len(), 1);

        let media = actor_in(&fx, Role::MediaPartner, Some(fx.office_a.id), None);
        let err = fx.handlers.audit_events(&media, AuditQuery::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }
}
