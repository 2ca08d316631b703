//! Job creation, listing and every status-changing action.

use serde::{Deserialize, Serialize};

use stagecraft_auth::{
    ActorContext, Permission, Role, ScopeTarget, assert_any_permission, assert_permission,
    assert_tenant_scope,
};
use stagecraft_core::{
    AssetId, DomainError, DomainResult, JobId, OfficeId, PresetId, TeamId, UserId,
};
use stagecraft_workflow::{
    ApprovalDecision, AssetInput, AssetKind, AuditEntityType, AuditEvent, AuditEventType, Job,
    JobApproval, JobAsset, JobDelivery, JobRevision, JobStatus, NewJob, Office, Preset, Priority,
    Team, TransitionActor, TransitionMetadata, User, submission_route, validate_transition,
};

use super::{WorkflowHandlers, can, in_scope, now};
use crate::store::keys;

const VIEW_JOBS: &[Permission] = &[Permission::ViewJobOwn, Permission::ViewJobOffice];

fn default_submit() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobInput {
    #[serde(default)]
    pub office_id: Option<OfficeId>,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub agent_user_id: Option<UserId>,
    pub property_address: String,
    #[serde(default)]
    pub mls_id: Option<String>,
    pub preset_id: PresetId,
    pub requested_edit_categories: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub disclosure_relevant: bool,
    #[serde(default)]
    pub original_assets: Vec<AssetInput>,
    #[serde(default = "default_submit")]
    pub submit: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedJob {
    pub job: Job,
    pub assets: Vec<JobAsset>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionInput {
    pub to_status: JobStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub output_asset_ids: Vec<AssetId>,
    #[serde(default)]
    pub revision_reason_category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalInput {
    pub decision: ApprovalDecision,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInput {
    #[serde(default)]
    pub outputs: Vec<AssetInput>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInput {
    #[serde(default)]
    pub reason_category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    pub job: Job,
    pub assets: Vec<JobAsset>,
    pub approvals: Vec<JobApproval>,
    pub deliveries: Vec<JobDelivery>,
    pub revisions: Vec<JobRevision>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResult {
    pub job: Job,
    pub approval: JobApproval,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub job: Job,
    pub delivery: JobDelivery,
    pub assets: Vec<JobAsset>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionResult {
    pub job: Job,
    pub revision: JobRevision,
}

/// The review decision a move out of `In Review` stands for.
fn decision_for(to: JobStatus) -> Option<ApprovalDecision> {
    match to {
        JobStatus::ApprovedForProcessing => Some(ApprovalDecision::Approve),
        JobStatus::Rejected => Some(ApprovalDecision::Reject),
        JobStatus::Draft => Some(ApprovalDecision::RequestChanges),
        _ => None,
    }
}

fn invalid_reference(field: &str, id: impl ToString) -> DomainError {
    DomainError::validation(format!("{field} does not reference a usable record"))
        .with_detail("field", field)
        .with_detail(field, id.to_string())
}

impl WorkflowHandlers {
    async fn load_job(&self, actor: &ActorContext, job_id: JobId) -> DomainResult<Job> {
        let job: Job = self.store.require(&job_id).await?;
        assert_tenant_scope(actor, &job.scope())?;
        Ok(job)
    }

    /// Apply an already-validated move, persist the job and record
    /// `JOB_STATUS_CHANGED`.
    async fn commit_transition(
        &self,
        actor: &ActorContext,
        job: &mut Job,
        to: JobStatus,
        by: TransitionActor,
        reason: Option<&str>,
        note: Option<&str>,
    ) -> DomainResult<()> {
        let before = job.clone();
        let at = now();
        job.apply_transition(to, at);
        self.store.put(&*job).await?;

        tracing::info!(
            job_id = %job.id,
            from = %before.status,
            to = %job.status,
            actor_role = %actor.role,
            by = by.as_str(),
            request_id = %actor.request_id,
            "job status changed"
        );

        self.audit(
            AuditEvent::new(
                actor,
                AuditEventType::JobStatusChanged,
                AuditEntityType::Job,
                job.id,
                at,
            )
            .scoped(job.scope())
                .before(&before)
                .after(&*job)
                .reason(reason)
                .note(note),
        )
        .await
    }

    /// Draft → Submitted by the actor, then the system routing hop chosen by
    /// the preset's `approvalRequired` flag.
    async fn submit(
        &self,
        actor: &ActorContext,
        job: &mut Job,
        preset: &Preset,
    ) -> DomainResult<()> {
        let route = submission_route(preset.approval_required);
        let meta = TransitionMetadata::default();
        validate_transition(job.status, JobStatus::Submitted, actor.role.into(), &meta)?;
        validate_transition(JobStatus::Submitted, route, TransitionActor::System, &meta)?;

        self.commit_transition(actor, job, JobStatus::Submitted, actor.role.into(), None, None)
            .await?;
        self.commit_transition(
            actor,
            job,
            route,
            TransitionActor::System,
            None,
            Some("routed by system"),
        )
        .await
    }

    pub async fn create_job(
        &self,
        actor: &ActorContext,
        input: CreateJobInput,
    ) -> DomainResult<CreatedJob> {
        assert_permission(actor.role, Permission::CreateJob)?;

        let office_id = input.office_id.or(actor.office_id).ok_or_else(|| {
            DomainError::validation("officeId is required").with_detail("field", "officeId")
        })?;
        let office = self.store.get::<Office>(&office_id).await?;
        if !office.is_some_and(|o| o.brokerage_id == actor.brokerage_id && o.active) {
            return Err(invalid_reference("officeId", office_id));
        }

        let team_id = input
            .team_id
            .or(actor.team_id.filter(|_| actor.office_id == Some(office_id)));
        if let Some(team_id) = team_id {
            let team = self.store.get::<Team>(&team_id).await?;
            if !team.is_some_and(|t| t.office_id == office_id && t.active) {
                return Err(invalid_reference("teamId", team_id));
            }
        }

        let agent_user_id = input.agent_user_id.unwrap_or(actor.user_id);
        if agent_user_id != actor.user_id {
            if !(actor.role.is_admin() || actor.role == Role::TeamLead) {
                return Err(DomainError::forbidden(
                    "only admins and team leads may create jobs for another agent",
                )
                .with_detail("role", actor.role.as_str()));
            }
            let agent = self.store.get::<User>(&agent_user_id).await?;
            if !agent.is_some_and(|u| u.brokerage_id == actor.brokerage_id && u.active) {
                return Err(invalid_reference("agentUserId", agent_user_id));
            }
        }

        assert_tenant_scope(
            actor,
            &ScopeTarget {
                brokerage_id: actor.brokerage_id,
                office_id: Some(office_id),
                team_id,
            },
        )?;

        let preset: Preset = self.store.require(&input.preset_id).await?;
        let at = now();
        let mut job = Job::create(
            NewJob {
                brokerage_id: actor.brokerage_id,
                office_id,
                team_id,
                agent_user_id,
                property_address: &input.property_address,
                mls_id: input.mls_id,
                preset: &preset,
                requested_edit_categories: &input.requested_edit_categories,
                priority: input.priority,
                disclosure_relevant: input.disclosure_relevant,
            },
            at,
        )?;
        if input.submit {
            let meta = TransitionMetadata::default();
            validate_transition(JobStatus::Draft, JobStatus::Submitted, actor.role.into(), &meta)?;
        }

        self.store
            .insert(
                &job,
                &[
                    keys::brokerage_jobs(job.brokerage_id),
                    keys::office_jobs(job.office_id),
                    keys::agent_jobs(job.agent_user_id),
                ],
            )
            .await?;
        let assets = JobAsset::from_inputs(
            &job,
            AssetKind::Original,
            1,
            &input.original_assets,
            actor.user_id,
            at,
        );
        for asset in &assets {
            self.store.insert(asset, &[keys::job_assets(job.id)]).await?;
        }

        self.audit(
            AuditEvent::new(actor, AuditEventType::JobCreated, AuditEntityType::Job, job.id, at)
                .scoped(job.scope())
                .after(&job),
        )
        .await?;
        tracing::info!(
            job_id = %job.id,
            office_id = %job.office_id,
            request_id = %actor.request_id,
            "job created"
        );

        if input.submit {
            self.submit(actor, &mut job, &preset).await?;
        }
        Ok(CreatedJob { job, assets })
    }

    /// Jobs the actor may see, optionally narrowed to one office.
    pub(super) async fn visible_jobs(
        &self,
        actor: &ActorContext,
        office_id: Option<OfficeId>,
    ) -> DomainResult<Vec<Job>> {
        let jobs: Vec<Job> = if can(actor, Permission::ViewJobOffice) {
            let own_office = actor.office_id.filter(|_| actor.role != Role::BrokerageAdmin);
            let office = office_id.or(own_office);
            match office {
                Some(o) => self.store.load_index(&keys::office_jobs(o)).await?,
                None => self.store.load_index(&keys::brokerage_jobs(actor.brokerage_id)).await?,
            }
        } else if can(actor, Permission::ViewJobOwn) {
            let own: Vec<Job> = self.store.load_index(&keys::agent_jobs(actor.user_id)).await?;
            own.into_iter().filter(|j| j.agent_user_id == actor.user_id).collect()
        } else {
            Vec::new()
        };

        Ok(jobs
            .into_iter()
            .filter(|j| in_scope(actor, &j.scope()))
            .filter(|j| office_id.is_none_or(|o| j.office_id == o))
            .collect())
    }

    /// Most recently created first.
    pub async fn list_jobs(
        &self,
        actor: &ActorContext,
        status: Option<JobStatus>,
        office_id: Option<OfficeId>,
    ) -> DomainResult<Vec<Job>> {
        assert_any_permission(actor.role, VIEW_JOBS)?;
        if let Some(o) = office_id {
            assert_tenant_scope(actor, &ScopeTarget::office(actor.brokerage_id, o))?;
        }
        let mut jobs = self.visible_jobs(actor, office_id).await?;
        if let Some(status) = status {
            jobs.retain(|j| j.status == status);
        }
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    pub async fn get_job(&self, actor: &ActorContext, job_id: JobId) -> DomainResult<JobDetail> {
        assert_any_permission(actor.role, VIEW_JOBS)?;
        let job = self.load_job(actor, job_id).await?;
        if !can(actor, Permission::ViewJobOffice) && job.agent_user_id != actor.user_id {
            return Err(DomainError::forbidden("job belongs to another agent")
                .with_detail("role", actor.role.as_str())
                .with_detail("jobId", job.id.to_string()));
        }

        Ok(JobDetail {
            assets: self.store.load_index(&keys::job_assets(job.id)).await?,
            approvals: self.store.load_index(&keys::job_approvals(job.id)).await?,
            deliveries: self.store.load_index(&keys::job_deliveries(job.id)).await?,
            revisions: self.store.load_index(&keys::job_revisions(job.id)).await?,
            job,
        })
    }

    /// `In Review` jobs in scope, oldest submission first.
    pub async fn review_queue(&self, actor: &ActorContext) -> DomainResult<Vec<Job>> {
        assert_permission(actor.role, Permission::ApproveJob)?;
        let mut jobs: Vec<Job> = self
            .visible_jobs(actor, None)
            .await?
            .into_iter()
            .filter(|j| j.status == JobStatus::InReview)
            .collect();
        jobs.sort_by_key(|j| (j.submitted_at.unwrap_or(j.created_at), j.created_at));
        Ok(jobs)
    }

    /// Generic status change. Moves that carry a record of their own (review
    /// decisions, deliveries, revision requests) write it too.
    pub async fn transition_job(
        &self,
        actor: &ActorContext,
        job_id: JobId,
        input: TransitionInput,
    ) -> DomainResult<Job> {
        let mut job = self.load_job(actor, job_id).await?;
        let (from, to) = (job.status, input.to_status);

        let meta = TransitionMetadata {
            reason: input.reason.as_deref(),
            output_asset_ids: &input.output_asset_ids,
            revision_reason_category: input.revision_reason_category.as_deref(),
        };
        let rule = validate_transition(from, to, actor.role.into(), &meta)?;
        if let Some(permission) = rule.permission {
            assert_permission(actor.role, permission)?;
        }

        match (from, to) {
            (JobStatus::InReview, _) => {
                let decision = decision_for(to).ok_or_else(|| {
                    DomainError::internal("review transition without a decision")
                })?;
                let (reason, note) = (input.reason.as_deref(), input.note.as_deref());
                self.finish_approval(actor, &mut job, decision, reason, note).await?;
            }
            (_, JobStatus::Delivered) => {
                let outputs = self.processed_outputs(&job, &input.output_asset_ids).await?;
                self.finish_delivery(actor, &mut job, outputs, input.note.clone()).await?;
            }
            (_, JobStatus::RevisionRequested) => {
                let category = input.revision_reason_category.as_deref().unwrap_or_default();
                self.finish_revision(actor, &mut job, category, input.note.clone()).await?;
            }
            (JobStatus::Draft, JobStatus::Submitted) => {
                let preset: Preset = self.store.require(&job.selected_preset_id).await?;
                self.submit(actor, &mut job, &preset).await?;
            }
            _ => {
                let (reason, note) = (input.reason.as_deref(), input.note.as_deref());
                self.commit_transition(actor, &mut job, to, actor.role.into(), reason, note)
                    .await?;
            }
        }
        Ok(job)
    }

    /// Distinct ids of processed assets of `job`, in request order. Anything
    /// else (originals, foreign or unknown ids) is rejected.
    async fn processed_outputs(
        &self,
        job: &Job,
        ids: &[AssetId],
    ) -> DomainResult<Vec<AssetId>> {
        let mut outputs: Vec<AssetId> = Vec::with_capacity(ids.len());
        for asset_id in ids {
            if outputs.contains(asset_id) {
                continue;
            }
            let asset = self.store.get::<JobAsset>(asset_id).await?;
            if !asset.is_some_and(|a| a.job_id == job.id && a.kind == AssetKind::Processed) {
                return Err(invalid_reference("outputAssetIds", asset_id));
            }
            outputs.push(*asset_id);
        }
        Ok(outputs)
    }

    async fn finish_approval(
        &self,
        actor: &ActorContext,
        job: &mut Job,
        decision: ApprovalDecision,
        reason: Option<&str>,
        note: Option<&str>,
    ) -> DomainResult<JobApproval> {
        let approval = JobApproval::new(
            job,
            decision,
            actor.user_id,
            note.or(reason).map(str::to_string),
            now(),
        );
        self.store.insert(&approval, &[keys::job_approvals(job.id)]).await?;
        let to = decision.target_status();
        self.commit_transition(actor, job, to, actor.role.into(), reason, note)
            .await?;

        self.audit(
            AuditEvent::new(
                actor,
                AuditEventType::JobApprovalDecision,
                AuditEntityType::JobApproval,
                approval.id,
                now(),
            )
            .scoped(job.scope())
            .after(&approval)
            .reason(reason)
            .note(note),
        )
        .await?;
        Ok(approval)
    }

    async fn finish_delivery(
        &self,
        actor: &ActorContext,
        job: &mut Job,
        output_asset_ids: Vec<AssetId>,
        notes: Option<String>,
    ) -> DomainResult<JobDelivery> {
        let delivery = JobDelivery::new(job, output_asset_ids, notes, actor.user_id, now())?;
        self.store.insert(&delivery, &[keys::job_deliveries(job.id)]).await?;
        self.commit_transition(
            actor,
            job,
            JobStatus::Delivered,
            actor.role.into(),
            None,
            delivery.notes.as_deref(),
        )
        .await?;

        self.audit(
            AuditEvent::new(
                actor,
                AuditEventType::JobDeliveryCreated,
                AuditEntityType::JobDelivery,
                delivery.id,
                now(),
            )
            .scoped(job.scope())
            .after(&delivery)
            .note(delivery.notes.as_deref()),
        )
        .await?;
        Ok(delivery)
    }

    async fn finish_revision(
        &self,
        actor: &ActorContext,
        job: &mut Job,
        reason_category: &str,
        notes: Option<String>,
    ) -> DomainResult<JobRevision> {
        // Built before the transition so the cycle number is the pre-increment count.
        let revision = JobRevision::new(job, reason_category, notes, actor.user_id, now())?;
        self.store
            .insert(
                &revision,
                &[keys::job_revisions(job.id), keys::brokerage_revisions(job.brokerage_id)],
            )
            .await?;
        self.commit_transition(
            actor,
            job,
            JobStatus::RevisionRequested,
            actor.role.into(),
            Some(revision.reason_category.as_str()),
            revision.notes.as_deref(),
        )
        .await?;

        self.audit(
            AuditEvent::new(
                actor,
                AuditEventType::JobRevisionRequested,
                AuditEntityType::JobRevision,
                revision.id,
                now(),
            )
            .scoped(job.scope())
            .after(&revision)
            .reason(Some(revision.reason_category.as_str()))
            .note(revision.notes.as_deref()),
        )
        .await?;
        Ok(revision)
    }

    /// Record a review decision. Only valid while the job is `In Review`.
    pub async fn record_approval(
        &self,
        actor: &ActorContext,
        job_id: JobId,
        input: ApprovalInput,
    ) -> DomainResult<ApprovalResult> {
        assert_permission(actor.role, Permission::ApproveJob)?;
        let mut job = self.load_job(actor, job_id).await?;
        if job.status != JobStatus::InReview {
            return Err(DomainError::conflict(
                "approvals can only be recorded while the job is In Review",
            )
            .with_detail("jobId", job.id.to_string())
            .with_detail("status", job.status.as_str()));
        }

        let reason = input.reason.as_deref();
        let meta = TransitionMetadata {
            reason,
            ..TransitionMetadata::default()
        };
        let to = input.decision.target_status();
        validate_transition(job.status, to, actor.role.into(), &meta)?;

        let approval = self
            .finish_approval(actor, &mut job, input.decision, reason, input.note.as_deref())
            .await?;
        Ok(ApprovalResult { job, approval })
    }

    /// Record processed outputs and move the job to `Delivered`.
    ///
    /// Outputs without a usable url are skipped; nothing is written when none remain.
    pub async fn deliver_job(
        &self,
        actor: &ActorContext,
        job_id: JobId,
        input: DeliveryInput,
    ) -> DomainResult<DeliveryResult> {
        assert_permission(actor.role, Permission::DeliverJob)?;
        let mut job = self.load_job(actor, job_id).await?;

        let existing: Vec<JobAsset> = self.store.load_index(&keys::job_assets(job.id)).await?;
        let version = existing
            .iter()
            .filter(|a| a.kind == AssetKind::Processed)
            .map(|a| a.version)
            .max()
            .unwrap_or(0)
            + 1;
        let assets = JobAsset::from_inputs(
            &job,
            AssetKind::Processed,
            version,
            &input.outputs,
            actor.user_id,
            now(),
        );
        if assets.is_empty() {
            return Err(DomainError::validation("at least one output with a url is required")
                .with_detail("field", "outputs"));
        }

        let asset_ids: Vec<AssetId> = assets.iter().map(|a| a.id).collect();
        let meta = TransitionMetadata {
            output_asset_ids: &asset_ids,
            ..TransitionMetadata::default()
        };
        validate_transition(job.status, JobStatus::Delivered, actor.role.into(), &meta)?;

        for asset in &assets {
            self.store.insert(asset, &[keys::job_assets(job.id)]).await?;
        }
        let delivery = self.finish_delivery(actor, &mut job, asset_ids, input.notes).await?;
        Ok(DeliveryResult { job, delivery, assets })
    }

    /// Ask for rework on a delivered job. Always targets `Revision Requested`.
    pub async fn request_revision(
        &self,
        actor: &ActorContext,
        job_id: JobId,
        input: RevisionInput,
    ) -> DomainResult<RevisionResult> {
        assert_permission(actor.role, Permission::RequestRevision)?;
        let mut job = self.load_job(actor, job_id).await?;

        let category = input.reason_category.as_deref().unwrap_or_default();
        let meta = TransitionMetadata {
            revision_reason_category: Some(category),
            ..TransitionMetadata::default()
        };
        validate_transition(job.status, JobStatus::RevisionRequested, actor.role.into(), &meta)?;

        let revision = self.finish_revision(actor, &mut job, category, input.notes).await?;
        Ok(RevisionResult { job, revision })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{Fixture, actor_in};
    use super::*;
    use stagecraft_core::ErrorCode;

    fn job_input(preset: &Preset, submit: bool) -> CreateJobInput {
        CreateJobInput {
            office_id: None,
            team_id: None,
            agent_user_id: None,
            property_address: "12 Oak St".into(),
            mls_id: Some("MLS-77".into()),
            preset_id: preset.id,
            requested_edit_categories: vec!["virtual_staging".into()],
            priority: Priority::High,
            disclosure_relevant: true,
            original_assets: vec![
                AssetInput { url: Some("https://example/orig.jpg".into()), edit_label: None },
                AssetInput { url: Some(" ".into()), edit_label: None },
            ],
            submit,
        }
    }

    fn agent_a(fx: &Fixture) -> ActorContext {
        actor_in(fx, Role::Agent, Some(fx.office_a.id), Some(fx.team_a.id))
    }

    fn delivery(urls: &[&str]) -> DeliveryInput {
        DeliveryInput {
            outputs: urls
                .iter()
                .map(|u| AssetInput { url: Some(u.to_string()), edit_label: Some("staged".into()) })
                .collect(),
            notes: Some("first pass".into()),
        }
    }

    /// A job in office A sitting in `Processing`.
    async fn processing_job(fx: &Fixture) -> Job {
        let created = fx
            .handlers
            .create_job(&agent_a(fx), job_input(&fx.direct_preset, true))
            .await
            .unwrap();
        let partner = actor_in(fx, Role::MediaPartner, Some(fx.office_a.id), None);
        fx.handlers
            .transition_job(
                &partner,
                created.job.id,
                TransitionInput {
                    to_status: JobStatus::Processing,
                    reason: None,
                    note: None,
                    output_asset_ids: vec![],
                    revision_reason_category: None,
                },
            )
            .await
            .unwrap()
    }

    async fn events_for(fx: &Fixture, request_id: &str) -> Vec<AuditEvent> {
        let rid = request_id.to_string();
        fx.handlers
            .store()
            .audit_events(fx.brokerage.id, move |e| e.request_id == rid, 100)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn submission_routes_by_preset_approval_flag() {
        let fx = Fixture::new().await;
        let agent = agent_a(&fx);

        let reviewed = fx
            .handlers
            .create_job(&agent, job_input(&fx.review_preset, true))
            .await
            .unwrap();
        assert_eq!(reviewed.job.status, JobStatus::InReview);
        assert!(reviewed.job.submitted_at.is_some());
        assert_eq!(reviewed.job.team_id, Some(fx.team_a.id));
        assert_eq!(reviewed.assets.len(), 1);

        let direct = fx
            .handlers
            .create_job(&agent, job_input(&fx.direct_preset, true))
            .await
            .unwrap();
        assert_eq!(direct.job.status, JobStatus::ApprovedForProcessing);

        let draft = fx
            .handlers
            .create_job(&agent, job_input(&fx.review_preset, false))
            .await
            .unwrap();
        assert_eq!(draft.job.status, JobStatus::Draft);
        assert!(draft.job.submitted_at.is_none());
    }

    #[tokio::test]
    async fn submitted_job_audits_creation_and_each_hop() {
        let fx = Fixture::new().await;
        let agent = agent_a(&fx);
        let created = fx
            .handlers
            .create_job(&agent, job_input(&fx.review_preset, true))
            .await
            .unwrap();

        let events = events_for(&fx, &agent.request_id).await;
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                AuditEventType::JobStatusChanged,
                AuditEventType::JobStatusChanged,
                AuditEventType::JobCreated
            ]
        );
        assert!(events.iter().all(|e| e.entity_id == created.job.id.to_string()));
        assert_eq!(events[0].office_id, Some(fx.office_a.id));
    }

    #[tokio::test]
    async fn reviewer_approval_records_decision_and_two_events() {
        let fx = Fixture::new().await;
        let created = fx
            .handlers
            .create_job(&agent_a(&fx), job_input(&fx.review_preset, true))
            .await
            .unwrap();

        let reviewer = actor_in(&fx, Role::Reviewer, Some(fx.office_a.id), None);
        let out = fx
            .handlers
            .record_approval(
                &reviewer,
                created.job.id,
                ApprovalInput {
                    decision: ApprovalDecision::Approve,
                    reason: None,
                    note: Some("ok".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(out.job.status, JobStatus::ApprovedForProcessing);

        let detail = fx.handlers.get_job(&fx.admin, created.job.id).await.unwrap();
        assert_eq!(detail.approvals.len(), 1);
        assert_eq!(detail.approvals[0].reviewer_user_id, reviewer.user_id);

        let events = events_for(&fx, &reviewer.request_id).await;
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| e.event_type == AuditEventType::JobApprovalDecision));
        assert!(events.iter().any(|e| e.event_type == AuditEventType::JobStatusChanged));
    }

    #[tokio::test]
    async fn approval_outside_review_is_conflict() {
        let fx = Fixture::new().await;
        let created = fx
            .handlers
            .create_job(&agent_a(&fx), job_input(&fx.direct_preset, true))
            .await
            .unwrap();
        let reviewer = actor_in(&fx, Role::Reviewer, Some(fx.office_a.id), None);
        let err = fx
            .handlers
            .record_approval(
                &reviewer,
                created.job.id,
                ApprovalInput { decision: ApprovalDecision::Approve, reason: None, note: None },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn rejection_needs_a_reason() {
        let fx = Fixture::new().await;
        let created = fx
            .handlers
            .create_job(&agent_a(&fx), job_input(&fx.review_preset, true))
            .await
            .unwrap();
        let lead = actor_in(&fx, Role::TeamLead, Some(fx.office_a.id), Some(fx.team_a.id));
        let err = fx
            .handlers
            .record_approval(
                &lead,
                created.job.id,
                ApprovalInput { decision: ApprovalDecision::Reject, reason: None, note: None },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        for decision in [ApprovalDecision::Reject, ApprovalDecision::RequestChanges] {
            let err = fx
                .handlers
                .record_approval(
                    &lead,
                    created.job.id,
                    ApprovalInput {
                        decision,
                        reason: None,
                        note: Some("see comments".into()),
                    },
                )
                .await
                .unwrap_err();
            assert_eq!(err.code, ErrorCode::ValidationFailed);
            assert_eq!(err.details["field"], "reason");
        }
        let detail = fx.handlers.get_job(&lead, created.job.id).await.unwrap();
        assert_eq!(detail.job.status, JobStatus::InReview);
        assert!(detail.approvals.is_empty());

        let out = fx
            .handlers
            .record_approval(
                &lead,
                created.job.id,
                ApprovalInput {
                    decision: ApprovalDecision::Reject,
                    reason: Some("wrong listing".into()),
                    note: Some("see comments".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(out.job.status, JobStatus::Rejected);
        assert_eq!(out.approval.note.as_deref(), Some("see comments"));
    }

    #[tokio::test]
    async fn media_partner_delivers_processing_job() {
        let fx = Fixture::new().await;
        let job = processing_job(&fx).await;
        let partner = actor_in(&fx, Role::MediaPartner, Some(fx.office_a.id), None);

        let out = fx
            .handlers
            .deliver_job(&partner, job.id, delivery(&["https://example/a.jpg"]))
            .await
            .unwrap();
        assert_eq!(out.job.status, JobStatus::Delivered);
        assert!(out.job.delivered_at.is_some());
        assert_eq!(out.delivery.output_asset_ids, vec![out.assets[0].id]);
        assert_eq!(out.assets[0].url, "https://example/a.jpg");
        assert_eq!(out.assets[0].version, 1);
        assert!(out.delivery.disclosure_flag_present);

        let detail = fx.handlers.get_job(&partner, job.id).await.unwrap();
        assert_eq!(detail.deliveries.len(), 1);
    }

    #[tokio::test]
    async fn empty_delivery_fails_and_leaves_status() {
        let fx = Fixture::new().await;
        let job = processing_job(&fx).await;
        let partner = actor_in(&fx, Role::MediaPartner, Some(fx.office_a.id), None);

        let err = fx
            .handlers
            .deliver_job(&partner, job.id, DeliveryInput { outputs: vec![], notes: None })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let err = fx
            .handlers
            .deliver_job(&partner, job.id, delivery(&["  "]))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let detail = fx.handlers.get_job(&partner, job.id).await.unwrap();
        assert_eq!(detail.job.status, JobStatus::Processing);
        assert!(detail.deliveries.is_empty());
    }

    fn deliver_ids(output_asset_ids: Vec<AssetId>) -> TransitionInput {
        TransitionInput {
            to_status: JobStatus::Delivered,
            reason: None,
            note: None,
            output_asset_ids,
            revision_reason_category: None,
        }
    }

    #[tokio::test]
    async fn generic_delivery_rejects_original_uploads() {
        let fx = Fixture::new().await;
        let job = processing_job(&fx).await;
        let partner = actor_in(&fx, Role::MediaPartner, Some(fx.office_a.id), None);
        let detail = fx.handlers.get_job(&partner, job.id).await.unwrap();
        let original = detail.assets[0].clone();
        assert_eq!(original.kind, AssetKind::Original);

        let err = fx
            .handlers
            .transition_job(&partner, job.id, deliver_ids(vec![original.id, original.id]))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details["field"], "outputAssetIds");

        let detail = fx.handlers.get_job(&partner, job.id).await.unwrap();
        assert_eq!(detail.job.status, JobStatus::Processing);
        assert!(detail.deliveries.is_empty());
    }

    #[tokio::test]
    async fn generic_delivery_collapses_repeated_outputs() {
        let fx = Fixture::new().await;
        let job = processing_job(&fx).await;
        let partner = actor_in(&fx, Role::MediaPartner, Some(fx.office_a.id), None);
        let first = fx
            .handlers
            .deliver_job(&partner, job.id, delivery(&["https://example/v1.jpg"]))
            .await
            .unwrap();
        let processed = first.assets[0].id;

        fx.handlers
            .request_revision(
                &agent_a(&fx),
                job.id,
                RevisionInput {
                    reason_category: Some("lighting".into()),
                    notes: None,
                },
            )
            .await
            .unwrap();
        fx.handlers
            .transition_job(
                &partner,
                job.id,
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

        let delivered = fx
            .handlers
            .transition_job(&partner, job.id, deliver_ids(vec![processed, processed]))
            .await
            .unwrap();
        assert_eq!(delivered.status, JobStatus::Delivered);

        let detail = fx.handlers.get_job(&partner, job.id).await.unwrap();
        assert_eq!(detail.deliveries.len(), 2);
        assert!(detail.deliveries.iter().all(|d| d.output_asset_ids == vec![processed]));
    }

    #[tokio::test]
    async fn revision_cycle_counts_and_versions() {
        let fx = Fixture::new().await;
        let job = processing_job(&fx).await;
        let partner = actor_in(&fx, Role::MediaPartner, Some(fx.office_a.id), None);
        let agent = agent_a(&fx);

        fx.handlers
            .deliver_job(&partner, job.id, delivery(&["https://example/v1.jpg"]))
            .await
            .unwrap();
        let rev = fx
            .handlers
            .request_revision(
                &agent,
                job.id,
                RevisionInput {
                    reason_category: Some("lighting".into()),
                    notes: Some("too dark".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(rev.job.status, JobStatus::RevisionRequested);
        assert_eq!(rev.job.revision_count, 1);
        assert_eq!(rev.revision.cycle_number, 0);

        fx.handlers
            .transition_job(
                &partner,
                job.id,
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
        let second = fx
            .handlers
            .deliver_job(&partner, job.id, delivery(&["https://example/v2.jpg"]))
            .await
            .unwrap();
        assert_eq!(second.assets[0].version, 2);

        let done = fx
            .handlers
            .transition_job(
                &agent,
                job.id,
                TransitionInput {
                    to_status: JobStatus::Completed,
                    reason: None,
                    note: None,
                    output_asset_ids: vec![],
                    revision_reason_category: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(done.revision_count, 1);
    }

    #[tokio::test]
    async fn revision_without_category_is_rejected() {
        let fx = Fixture::new().await;
        let job = processing_job(&fx).await;
        let partner = actor_in(&fx, Role::MediaPartner, Some(fx.office_a.id), None);
        fx.handlers
            .deliver_job(&partner, job.id, delivery(&["https://example/v1.jpg"]))
            .await
            .unwrap();

        let err = fx
            .handlers
            .request_revision(
                &agent_a(&fx),
                job.id,
                RevisionInput {
                    reason_category: None,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details["field"], "revisionReasonCategory");
    }

    #[tokio::test]
    async fn agent_cannot_touch_job_of_another_team() {
        let fx = Fixture::new().await;
        let mut input = job_input(&fx.direct_preset, false);
        input.office_id = Some(fx.office_b.id);
        input.team_id = Some(fx.team_b.id);
        let created = fx.handlers.create_job(&fx.admin, input).await.unwrap();

        let err = fx
            .handlers
            .request_revision(
                &agent_a(&fx),
                created.job.id,
                RevisionInput { reason_category: Some("lighting".into()), notes: None },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TenantScopeViolation);
    }

    #[tokio::test]
    async fn generic_transition_enforces_the_table() {
        let fx = Fixture::new().await;
        let job = processing_job(&fx).await;
        let move_to = |to_status, reason: Option<&str>| TransitionInput {
            to_status,
            reason: reason.map(str::to_string),
            note: None,
            output_asset_ids: vec![],
            revision_reason_category: None,
        };

        let err = fx
            .handlers
            .transition_job(&fx.admin, job.id, move_to(JobStatus::Draft, None))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);

        let err = fx
            .handlers
            .transition_job(
                &agent_a(&fx),
                job.id,
                move_to(JobStatus::Cancelled, Some("changed mind")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let err = fx
            .handlers
            .transition_job(&fx.admin, job.id, move_to(JobStatus::Cancelled, None))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let cancelled = fx
            .handlers
            .transition_job(
                &fx.admin,
                job.id,
                move_to(JobStatus::Cancelled, Some("listing withdrawn")),
            )
            .await
            .unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn generic_submit_routes_and_review_move_records_approval() {
        let fx = Fixture::new().await;
        let agent = agent_a(&fx);
        let draft = fx
            .handlers
            .create_job(&agent, job_input(&fx.review_preset, false))
            .await
            .unwrap();

        let submitted = fx
            .handlers
            .transition_job(
                &agent,
                draft.job.id,
                TransitionInput {
                    to_status: JobStatus::Submitted,
                    reason: None,
                    note: None,
                    output_asset_ids: vec![],
                    revision_reason_category: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(submitted.status, JobStatus::InReview);

        let office_admin = actor_in(&fx, Role::OfficeAdmin, Some(fx.office_a.id), None);
        let back = fx
            .handlers
            .transition_job(
                &office_admin,
                draft.job.id,
                TransitionInput {
                    to_status: JobStatus::Draft,
                    reason: Some("missing photos".into()),
                    note: None,
                    output_asset_ids: vec![],
                    revision_reason_category: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(back.status, JobStatus::Draft);

        let detail = fx.handlers.get_job(&agent, draft.job.id).await.unwrap();
        assert_eq!(detail.approvals.len(), 1);
        assert_eq!(detail.approvals[0].decision, ApprovalDecision::RequestChanges);
    }

    #[tokio::test]
    async fn creation_validates_references_and_delegation() {
        let fx = Fixture::new().await;
        let agent = agent_a(&fx);

        let mut input = job_input(&fx.direct_preset, true);
        input.requested_edit_categories = vec!["drone".into()];
        let err = fx.handlers.create_job(&agent, input).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let mut input = job_input(&fx.direct_preset, true);
        input.agent_user_id = Some(UserId::new());
        let err = fx.handlers.create_job(&agent, input).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);

        let mut input = job_input(&fx.direct_preset, true);
        input.office_id = Some(OfficeId::new());
        let err = fx.handlers.create_job(&agent, input).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let mut input = job_input(&fx.direct_preset, true);
        input.preset_id = PresetId::new();
        let err = fx.handlers.create_job(&agent, input).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let lead = actor_in(&fx, Role::TeamLead, Some(fx.office_a.id), Some(fx.team_a.id));
        let err = fx
            .handlers
            .create_job(&lead, job_input(&fx.direct_preset, true))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn listing_respects_visibility() {
        let fx = Fixture::new().await;
        let agent = agent_a(&fx);
        let other_agent = actor_in(&fx, Role::Agent, Some(fx.office_a.id), Some(fx.team_a.id));
        fx.handlers.create_job(&agent, job_input(&fx.review_preset, true)).await.unwrap();
        fx.handlers.create_job(&other_agent, job_input(&fx.direct_preset, true)).await.unwrap();
        let mut in_b = job_input(&fx.direct_preset, true);
        in_b.office_id = Some(fx.office_b.id);
        fx.handlers.create_job(&fx.admin, in_b).await.unwrap();

        assert_eq!(fx.handlers.list_jobs(&agent, None, None).await.unwrap().len(), 1);
        assert_eq!(fx.handlers.list_jobs(&fx.admin, None, None).await.unwrap().len(), 3);

        let reviewer_a = actor_in(&fx, Role::Reviewer, Some(fx.office_a.id), None);
        assert_eq!(fx.handlers.list_jobs(&reviewer_a, None, None).await.unwrap().len(), 2);
        let in_review = fx
            .handlers
            .list_jobs(&reviewer_a, Some(JobStatus::InReview), None)
            .await
            .unwrap();
        assert_eq!(in_review.len(), 1);

        let err = fx
            .handlers
            .list_jobs(&reviewer_a, None, Some(fx.office_b.id))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TenantScopeViolation);

        assert_eq!(fx.handlers.review_queue(&reviewer_a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn agent_cannot_read_another_agents_job() {
        let fx = Fixture::new().await;
        let created = fx
            .handlers
            .create_job(&agent_a(&fx), job_input(&fx.review_preset, true))
            .await
            .unwrap();
        let nosy = actor_in(&fx, Role::Agent, Some(fx.office_a.id), Some(fx.team_a.id));
        let err = fx.handlers.get_job(&nosy, created.job.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }
}
