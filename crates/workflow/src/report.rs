//! Reporting over jobs and revisions, plus CSV encoding for exports.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use stagecraft_core::{DomainError, OfficeId};

use crate::job::{Job, JobRevision, JobStatus};
use crate::org::Office;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportType {
    Summary,
    Jobs,
    OfficeUsage,
    Revisions,
}

impl ReportType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Summary => "summary",
            ReportType::Jobs => "jobs",
            ReportType::OfficeUsage => "office-usage",
            ReportType::Revisions => "revisions",
        }
    }

    /// Report types with a tabular CSV form.
    pub fn is_exportable(self) -> bool {
        !matches!(self, ReportType::Summary)
    }
}

impl core::str::FromStr for ReportType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(ReportType::Summary),
            "jobs" => Ok(ReportType::Jobs),
            "office-usage" | "office_usage" => Ok(ReportType::OfficeUsage),
            "revisions" => Ok(ReportType::Revisions),
            _ => Err(
                DomainError::validation(format!("unknown report type '{s}'")).with_detail("type", s)
            ),
        }
    }
}

/// A row that can be written as CSV.
pub trait CsvRow {
    const HEADERS: &'static [&'static str];

    fn fields(&self) -> Vec<String>;
}

/// Quote a field when it contains a comma, quote, CR or LF; inner quotes are doubled.
pub fn escape_csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Header row plus one line per row, `\n`-terminated.
pub fn to_csv<R: CsvRow>(rows: &[R]) -> String {
    let mut out = String::new();
    push_line(&mut out, R::HEADERS.iter().map(|h| h.to_string()));
    for row in rows {
        push_line(&mut out, row.fields().into_iter());
    }
    out
}

fn push_line(out: &mut String, fields: impl Iterator<Item = String>) {
    let line: Vec<String> = fields.map(|f| escape_csv_field(&f)).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

fn ts(v: Option<DateTime<Utc>>) -> String {
    v.map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRow {
    pub job_id: String,
    pub office_id: String,
    pub agent_user_id: String,
    pub property_address: String,
    pub status: String,
    pub priority: String,
    pub revision_count: u32,
    pub created_at: String,
    pub submitted_at: String,
    pub delivered_at: String,
    pub completed_at: String,
}

impl CsvRow for JobRow {
    const HEADERS: &'static [&'static str] = &[
        "jobId",
        "officeId",
        "agentUserId",
        "propertyAddress",
        "status",
        "priority",
        "revisionCount",
        "createdAt",
        "submittedAt",
        "deliveredAt",
        "completedAt",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.job_id.clone(),
            self.office_id.clone(),
            self.agent_user_id.clone(),
            self.property_address.clone(),
            self.status.clone(),
            self.priority.clone(),
            self.revision_count.to_string(),
            self.created_at.clone(),
            self.submitted_at.clone(),
            self.delivered_at.clone(),
            self.completed_at.clone(),
        ]
    }
}

pub fn job_rows(jobs: &[Job]) -> Vec<JobRow> {
    jobs.iter()
        .map(|j| JobRow {
            job_id: j.id.to_string(),
            office_id: j.office_id.to_string(),
            agent_user_id: j.agent_user_id.to_string(),
            property_address: j.property_address.clone(),
            status: j.status.as_str().to_string(),
            priority: j.priority.as_str().to_string(),
            revision_count: j.revision_count,
            created_at: ts(Some(j.created_at)),
            submitted_at: ts(j.submitted_at),
            delivered_at: ts(j.delivered_at),
            completed_at: ts(j.completed_at),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeUsageRow {
    pub office_id: String,
    pub office_name: String,
    pub total_jobs: usize,
    pub open_jobs: usize,
    pub delivered_jobs: usize,
    pub completed_jobs: usize,
    pub cancelled_jobs: usize,
    pub revisions: u64,
}

impl CsvRow for OfficeUsageRow {
    const HEADERS: &'static [&'static str] = &[
        "officeId",
        "officeName",
        "totalJobs",
        "openJobs",
        "deliveredJobs",
        "completedJobs",
        "cancelledJobs",
        "revisions",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.office_id.clone(),
            self.office_name.clone(),
            self.total_jobs.to_string(),
            self.open_jobs.to_string(),
            self.delivered_jobs.to_string(),
            self.completed_jobs.to_string(),
            self.cancelled_jobs.to_string(),
            self.revisions.to_string(),
        ]
    }
}

/// One row per office in `offices` (in the given order), followed by rows for
/// offices that only appear on jobs.
pub fn office_usage(offices: &[Office], jobs: &[Job]) -> Vec<OfficeUsageRow> {
    let mut by_office: BTreeMap<OfficeId, Vec<&Job>> = BTreeMap::new();
    for job in jobs {
        by_office.entry(job.office_id).or_default().push(job);
    }

    let row = |office_id: OfficeId, office_name: String, jobs: &[&Job]| OfficeUsageRow {
        office_id: office_id.to_string(),
        office_name,
        total_jobs: jobs.len(),
        open_jobs: jobs.iter().filter(|j| !j.status.is_terminal()).count(),
        delivered_jobs: jobs.iter().filter(|j| j.delivered_at.is_some()).count(),
        completed_jobs: jobs.iter().filter(|j| j.status == JobStatus::Completed).count(),
        cancelled_jobs: jobs.iter().filter(|j| j.status == JobStatus::Cancelled).count(),
        revisions: jobs.iter().map(|j| u64::from(j.revision_count)).sum(),
    };

    let mut rows: Vec<OfficeUsageRow> = offices
        .iter()
        .map(|o| {
            let jobs = by_office.remove(&o.id).unwrap_or_default();
            row(o.id, o.name.clone(), &jobs)
        })
        .collect();
    rows.extend(by_office.into_iter().map(|(id, jobs)| row(id, String::new(), &jobs)));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionRow {
    pub revision_id: String,
    pub job_id: String,
    pub office_id: String,
    pub cycle_number: u32,
    pub reason_category: String,
    pub notes: String,
    pub created_at: String,
}

impl CsvRow for RevisionRow {
    const HEADERS: &'static [&'static str] = &[
        "revisionId",
        "jobId",
        "officeId",
        "cycleNumber",
        "reasonCategory",
        "notes",
        "createdAt",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.revision_id.clone(),
            self.job_id.clone(),
            self.office_id.clone(),
            self.cycle_number.to_string(),
            self.reason_category.clone(),
            self.notes.clone(),
            self.created_at.clone(),
        ]
    }
}

pub fn revision_rows(revisions: &[JobRevision]) -> Vec<RevisionRow> {
    revisions
        .iter()
        .map(|r| RevisionRow {
            revision_id: r.id.to_string(),
            job_id: r.job_id.to_string(),
            office_id: r.office_id.to_string(),
            cycle_number: r.cycle_number,
            reason_category: r.reason_category.clone(),
            notes: r.notes.clone().unwrap_or_default(),
            created_at: ts(Some(r.created_at)),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_jobs: usize,
    /// Keyed by status display name; every status is present.
    pub jobs_by_status: BTreeMap<String, usize>,
    pub total_revisions: u64,
    pub delivered_jobs: usize,
    /// Mean hours from `submittedAt` to `deliveredAt` over delivered jobs.
    pub average_turnaround_hours: Option<f64>,
}

pub fn summary(jobs: &[Job]) -> ReportSummary {
    let mut jobs_by_status: BTreeMap<String, usize> = JobStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    for job in jobs {
        *jobs_by_status.entry(job.status.as_str().to_string()).or_default() += 1;
    }

    let turnarounds: Vec<f64> = jobs
        .iter()
        .filter_map(|j| {
            let hours = (j.delivered_at? - j.submitted_at?).num_seconds() as f64 / 3600.0;
            (hours >= 0.0).then_some(hours)
        })
        .collect();

    ReportSummary {
        total_jobs: jobs.len(),
        jobs_by_status,
        total_revisions: jobs.iter().map(|j| u64::from(j.revision_count)).sum(),
        delivered_jobs: jobs.iter().filter(|j| j.delivered_at.is_some()).count(),
        average_turnaround_hours: (!turnarounds.is_empty())
            .then(|| turnarounds.iter().sum::<f64>() / turnarounds.len() as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_job;
    use chrono::Duration;
    use stagecraft_core::BrokerageId;

    #[test]
    fn csv_quoting_rules() {
        assert_eq!(escape_csv_field("plain"), "plain");
        assert_eq!(escape_csv_field("12 Oak St, Unit 4"), "\"12 Oak St, Unit 4\"");
        assert_eq!(escape_csv_field("the \"blue\" house"), "\"the \"\"blue\"\" house\"");
        assert_eq!(escape_csv_field("line1\nline2"), "\"line1\nline2\"");
        assert_eq!(escape_csv_field(""), "");
    }

    #[test]
    fn jobs_csv_has_header_and_quoted_address() {
        let mut job = sample_job(false);
        job.property_address = "12 Oak St, Unit 4".to_string();
        let csv = to_csv(&job_rows(&[job]));
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), JobRow::HEADERS.join(","));
        assert!(lines.next().unwrap().contains("\"12 Oak St, Unit 4\""));
        assert!(lines.next().is_none());
    }

    #[test]
    fn office_usage_counts_per_office() {
        let office = Office::new(BrokerageId::new(), "Harbor", Utc::now()).unwrap();
        let mut a = sample_job(false);
        a.office_id = office.id;
        a.status = JobStatus::Completed;
        a.revision_count = 2;
        a.delivered_at = Some(Utc::now());
        let mut b = sample_job(false);
        b.office_id = office.id;
        let stray = sample_job(false);

        let rows = office_usage(&[office.clone()], &[a, b, stray.clone()]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].office_name, "Harbor");
        assert_eq!(rows[0].total_jobs, 2);
        assert_eq!(rows[0].open_jobs, 1);
        assert_eq!(rows[0].completed_jobs, 1);
        assert_eq!(rows[0].revisions, 2);
        assert_eq!(rows[1].office_id, stray.office_id.to_string());
    }

    #[test]
    fn summary_averages_turnaround() {
        let start = Utc::now();
        let mut a = sample_job(false);
        a.submitted_at = Some(start);
        a.delivered_at = Some(start + Duration::hours(4));
        a.status = JobStatus::Delivered;
        let mut b = sample_job(false);
        b.submitted_at = Some(start);
        b.delivered_at = Some(start + Duration::hours(2));
        b.status = JobStatus::Delivered;
        let c = sample_job(false);

        let s = summary(&[a, b, c]);
        assert_eq!(s.total_jobs, 3);
        assert_eq!(s.jobs_by_status["Delivered"], 2);
        assert_eq!(s.jobs_by_status["Draft"], 1);
        assert_eq!(s.jobs_by_status["Cancelled"], 0);
        assert_eq!(s.average_turnaround_hours, Some(3.0));
    }

    #[test]
    fn report_type_parsing() {
        assert_eq!("office-usage".parse::<ReportType>().unwrap(), ReportType::OfficeUsage);
        assert!(!ReportType::Summary.is_exportable());
        assert!("payroll".parse::<ReportType>().is_err());
    }
}
