//! The job entity and the records hanging off it.

use core::str::FromStr;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stagecraft_auth::ScopeTarget;
use stagecraft_core::{
    ApprovalId, AssetId, BrokerageId, DeliveryId, DomainError, DomainResult, Entity, JobId,
    OfficeId, PresetId, RevisionId, TeamId, UserId,
};

use crate::org::{optional_text, required_text};
use crate::preset::Preset;

/// Job lifecycle status. No other value is ever persisted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobStatus {
    Draft,
    Submitted,
    #[serde(rename = "In Review")]
    InReview,
    #[serde(rename = "Approved for Processing")]
    ApprovedForProcessing,
    Processing,
    Delivered,
    #[serde(rename = "Revision Requested")]
    RevisionRequested,
    Completed,
    Rejected,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 10] = [
        JobStatus::Draft,
        JobStatus::Submitted,
        JobStatus::InReview,
        JobStatus::ApprovedForProcessing,
        JobStatus::Processing,
        JobStatus::Delivered,
        JobStatus::RevisionRequested,
        JobStatus::Completed,
        JobStatus::Rejected,
        JobStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Draft => "Draft",
            JobStatus::Submitted => "Submitted",
            JobStatus::InReview => "In Review",
            JobStatus::ApprovedForProcessing => "Approved for Processing",
            JobStatus::Processing => "Processing",
            JobStatus::Delivered => "Delivered",
            JobStatus::RevisionRequested => "Revision Requested",
            JobStatus::Completed => "Completed",
            JobStatus::Rejected => "Rejected",
            JobStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    /// Accepts the display form ("In Review") and snake/kebab forms ("in_review").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['_', '-'], " ");
        JobStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| {
                DomainError::validation(format!("unknown job status '{s}'"))
                    .with_detail("status", s)
            })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub brokerage_id: BrokerageId,
    pub office_id: OfficeId,
    pub team_id: Option<TeamId>,
    pub agent_user_id: UserId,
    pub property_address: String,
    pub mls_id: Option<String>,
    pub selected_preset_id: PresetId,
    pub requested_edit_categories: BTreeSet<String>,
    pub priority: Priority,
    pub status: JobStatus,
    pub revision_count: u32,
    pub disclosure_relevant: bool,
    pub disclosure_required: bool,
    pub submitted_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated inputs for a new job. Office/team membership in the brokerage is
/// checked by the caller, which has the store.
#[derive(Debug, Clone)]
pub struct NewJob<'a> {
    pub brokerage_id: BrokerageId,
    pub office_id: OfficeId,
    pub team_id: Option<TeamId>,
    pub agent_user_id: UserId,
    pub property_address: &'a str,
    pub mls_id: Option<String>,
    pub preset: &'a Preset,
    pub requested_edit_categories: &'a [String],
    pub priority: Priority,
    pub disclosure_relevant: bool,
}

impl Job {
    /// Build a `Draft` job.
    pub fn create(new: NewJob<'_>, now: DateTime<Utc>) -> DomainResult<Self> {
        let preset = new.preset;
        if !preset.active {
            return Err(DomainError::validation("preset is inactive")
                .with_detail("presetId", preset.id.to_string()));
        }
        if preset.brokerage_id != new.brokerage_id || !preset.usable_in(new.office_id) {
            return Err(DomainError::validation("preset is not available for this office")
                .with_detail("presetId", preset.id.to_string())
                .with_detail("officeId", new.office_id.to_string()));
        }

        let categories: BTreeSet<String> = new
            .requested_edit_categories
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if categories.is_empty() {
            return Err(DomainError::validation("requestedEditCategories must not be empty")
                .with_detail("field", "requestedEditCategories"));
        }
        let disallowed: Vec<&str> = categories
            .iter()
            .filter(|c| !preset.allowed_edit_types.contains(*c))
            .map(String::as_str)
            .collect();
        if !disallowed.is_empty() {
            return Err(DomainError::validation("edit categories not allowed by preset")
                .with_detail("field", "requestedEditCategories")
                .with_detail("disallowed", disallowed.join(",")));
        }

        Ok(Self {
            id: JobId::new(),
            brokerage_id: new.brokerage_id,
            office_id: new.office_id,
            team_id: new.team_id,
            agent_user_id: new.agent_user_id,
            property_address: required_text("propertyAddress", new.property_address)?,
            mls_id: optional_text(new.mls_id),
            selected_preset_id: preset.id,
            requested_edit_categories: categories,
            priority: new.priority,
            status: JobStatus::Draft,
            revision_count: 0,
            disclosure_relevant: new.disclosure_relevant,
            disclosure_required: preset.disclosure_required_default,
            submitted_at: None,
            delivered_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn scope(&self) -> ScopeTarget {
        ScopeTarget {
            brokerage_id: self.brokerage_id,
            office_id: Some(self.office_id),
            team_id: self.team_id,
        }
    }

    /// Move to `to` after the transition has been validated.
    ///
    /// This is the only place `revision_count` changes: +1 exactly when the new
    /// status is `Revision Requested`.
    pub fn apply_transition(&mut self, to: JobStatus, now: DateTime<Utc>) {
        match to {
            JobStatus::Submitted => self.submitted_at = Some(now),
            JobStatus::Delivered => self.delivered_at = Some(now),
            JobStatus::Completed => self.completed_at = Some(now),
            JobStatus::RevisionRequested => self.revision_count += 1,
            _ => {}
        }
        self.status = to;
        self.updated_at = now;
    }
}

impl Entity for Job {
    type Id = JobId;
    const KIND: &'static str = "job";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Original,
    Processed,
}

/// A file reference supplied by a caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInput {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub edit_label: Option<String>,
}

impl AssetInput {
    /// Trimmed url, `None` when missing or blank.
    pub fn resolvable_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAsset {
    pub id: AssetId,
    pub job_id: JobId,
    pub brokerage_id: BrokerageId,
    pub kind: AssetKind,
    pub version: u32,
    pub edit_label: Option<String>,
    pub url: String,
    pub uploaded_by_user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobAsset {
    /// Builds one asset per input with a resolvable url; the rest are skipped.
    pub fn from_inputs(
        job: &Job,
        kind: AssetKind,
        version: u32,
        inputs: &[AssetInput],
        uploaded_by: UserId,
        now: DateTime<Utc>,
    ) -> Vec<JobAsset> {
        inputs
            .iter()
            .filter_map(|input| {
                let url = input.resolvable_url()?;
                Some(JobAsset {
                    id: AssetId::new(),
                    job_id: job.id,
                    brokerage_id: job.brokerage_id,
                    kind,
                    version,
                    edit_label: optional_text(input.edit_label.clone()),
                    url: url.to_string(),
                    uploaded_by_user_id: uploaded_by,
                    created_at: now,
                    updated_at: now,
                })
            })
            .collect()
    }
}

impl Entity for JobAsset {
    type Id = AssetId;
    const KIND: &'static str = "job_asset";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject,
    RequestChanges,
}

impl ApprovalDecision {
    pub fn target_status(self) -> JobStatus {
        match self {
            ApprovalDecision::Approve => JobStatus::ApprovedForProcessing,
            ApprovalDecision::Reject => JobStatus::Rejected,
            ApprovalDecision::RequestChanges => JobStatus::Draft,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobApproval {
    pub id: ApprovalId,
    pub job_id: JobId,
    pub brokerage_id: BrokerageId,
    pub decision: ApprovalDecision,
    pub reviewer_user_id: UserId,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobApproval {
    pub fn new(
        job: &Job,
        decision: ApprovalDecision,
        reviewer: UserId,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ApprovalId::new(),
            job_id: job.id,
            brokerage_id: job.brokerage_id,
            decision,
            reviewer_user_id: reviewer,
            note: optional_text(note),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for JobApproval {
    type Id = ApprovalId;
    const KIND: &'static str = "job_approval";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDelivery {
    pub id: DeliveryId,
    pub job_id: JobId,
    pub brokerage_id: BrokerageId,
    /// Never empty.
    pub output_asset_ids: Vec<AssetId>,
    pub disclosure_flag_present: bool,
    pub notes: Option<String>,
    pub delivered_by_user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobDelivery {
    pub fn new(
        job: &Job,
        output_asset_ids: Vec<AssetId>,
        notes: Option<String>,
        delivered_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if output_asset_ids.is_empty() {
            return Err(DomainError::validation("a delivery needs at least one output asset")
                .with_detail("field", "outputs"));
        }
        Ok(Self {
            id: DeliveryId::new(),
            job_id: job.id,
            brokerage_id: job.brokerage_id,
            output_asset_ids,
            disclosure_flag_present: job.disclosure_required,
            notes: optional_text(notes),
            delivered_by_user_id: delivered_by,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Entity for JobDelivery {
    type Id = DeliveryId;
    const KIND: &'static str = "job_delivery";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRevision {
    pub id: RevisionId,
    pub job_id: JobId,
    pub brokerage_id: BrokerageId,
    pub office_id: OfficeId,
    pub reason_category: String,
    /// The job's `revision_count` before this request incremented it.
    pub cycle_number: u32,
    pub notes: Option<String>,
    pub requested_by_user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRevision {
    /// Must be built before the job transitions, so `cycle_number` captures the
    /// pre-increment counter.
    pub fn new(
        job: &Job,
        reason_category: &str,
        notes: Option<String>,
        requested_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: RevisionId::new(),
            job_id: job.id,
            brokerage_id: job.brokerage_id,
            office_id: job.office_id,
            reason_category: required_text("reasonCategory", reason_category)?,
            cycle_number: job.revision_count,
            notes: optional_text(notes),
            requested_by_user_id: requested_by,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Entity for JobRevision {
    type Id = RevisionId;
    const KIND: &'static str = "job_revision";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
