use serde::{Deserialize, Serialize};

/// Permission tag.
///
/// The vocabulary is closed; roles map to fixed subsets of it (see `authorize`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "create:job")]
    CreateJob,
    #[serde(rename = "approve:job")]
    ApproveJob,
    #[serde(rename = "process:job")]
    ProcessJob,
    #[serde(rename = "deliver:job")]
    DeliverJob,
    #[serde(rename = "request:revision")]
    RequestRevision,
    #[serde(rename = "complete:job")]
    CompleteJob,
    #[serde(rename = "cancel:job")]
    CancelJob,
    #[serde(rename = "export:report")]
    ExportReport,
    #[serde(rename = "view:audit")]
    ViewAudit,
    #[serde(rename = "manage:office-users")]
    ManageOfficeUsers,
    #[serde(rename = "manage:office-presets")]
    ManageOfficePresets,
    #[serde(rename = "manage:brokerage-presets")]
    ManageBrokeragePresets,
    #[serde(rename = "manage:brokerage-users")]
    ManageBrokerageUsers,
    #[serde(rename = "manage:brokerage-org")]
    ManageBrokerageOrg,
    #[serde(rename = "view:job-own")]
    ViewJobOwn,
    #[serde(rename = "view:job-office")]
    ViewJobOffice,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::CreateJob => "create:job",
            Permission::ApproveJob => "approve:job",
            Permission::ProcessJob => "process:job",
            Permission::DeliverJob => "deliver:job",
            Permission::RequestRevision => "request:revision",
            Permission::CompleteJob => "complete:job",
            Permission::CancelJob => "cancel:job",
            Permission::ExportReport => "export:report",
            Permission::ViewAudit => "view:audit",
            Permission::ManageOfficeUsers => "manage:office-users",
            Permission::ManageOfficePresets => "manage:office-presets",
            Permission::ManageBrokeragePresets => "manage:brokerage-presets",
            Permission::ManageBrokerageUsers => "manage:brokerage-users",
            Permission::ManageBrokerageOrg => "manage:brokerage-org",
            Permission::ViewJobOwn => "view:job-own",
            Permission::ViewJobOffice => "view:job-office",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
