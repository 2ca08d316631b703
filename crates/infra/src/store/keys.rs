//! Index and auxiliary key layout.
//!
//! Entity records live under `{kind}:{id}` (see `Entity::key_for`). Indexes are
//! JSON arrays of id strings under `idx:*` keys.

use stagecraft_core::{BrokerageId, JobId, OfficeId, UserId};

pub const BOOTSTRAP_LOCK: &str = "lock:bootstrap";

pub fn brokerage_offices(b: BrokerageId) -> String {
    format!("idx:brokerage:{b}:offices")
}

pub fn brokerage_teams(b: BrokerageId) -> String {
    format!("idx:brokerage:{b}:teams")
}

pub fn office_teams(o: OfficeId) -> String {
    format!("idx:office:{o}:teams")
}

pub fn brokerage_users(b: BrokerageId) -> String {
    format!("idx:brokerage:{b}:users")
}

/// Maps a lower-cased email to the user id holding it within one brokerage.
pub fn user_email(b: BrokerageId, email: &str) -> String {
    format!("user-email:{b}:{email}")
}

pub fn user_memberships(u: UserId) -> String {
    format!("idx:user:{u}:memberships")
}

pub fn brokerage_presets(b: BrokerageId) -> String {
    format!("idx:brokerage:{b}:presets")
}

pub fn brokerage_jobs(b: BrokerageId) -> String {
    format!("idx:brokerage:{b}:jobs")
}

pub fn office_jobs(o: OfficeId) -> String {
    format!("idx:office:{o}:jobs")
}

pub fn agent_jobs(u: UserId) -> String {
    format!("idx:agent:{u}:jobs")
}

pub fn job_assets(j: JobId) -> String {
    format!("idx:job:{j}:assets")
}

pub fn job_approvals(j: JobId) -> String {
    format!("idx:job:{j}:approvals")
}

pub fn job_deliveries(j: JobId) -> String {
    format!("idx:job:{j}:deliveries")
}

pub fn job_revisions(j: JobId) -> String {
    format!("idx:job:{j}:revisions")
}

pub fn brokerage_revisions(b: BrokerageId) -> String {
    format!("idx:brokerage:{b}:revisions")
}

/// Most recent first.
pub fn brokerage_audit(b: BrokerageId) -> String {
    format!("idx:brokerage:{b}:audit")
}
