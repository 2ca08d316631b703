//! Reusable job templates.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stagecraft_auth::ScopeTarget;
use stagecraft_core::{BrokerageId, DomainError, DomainResult, Entity, OfficeId, PresetId};

use crate::org::{optional_text, required_text};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetScope {
    Brokerage,
    Office,
}

/// Preset creation input.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetDraft {
    pub scope: PresetScope,
    #[serde(default)]
    pub office_id: Option<OfficeId>,
    pub name: String,
    pub allowed_edit_types: Vec<String>,
    #[serde(default)]
    pub approval_required: bool,
    #[serde(default)]
    pub disclosure_required_default: bool,
    #[serde(default)]
    pub delivery_notes_template: Option<String>,
    #[serde(default)]
    pub revision_policy_template: Option<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetPatch {
    pub name: Option<String>,
    pub allowed_edit_types: Option<Vec<String>>,
    pub approval_required: Option<bool>,
    pub disclosure_required_default: Option<bool>,
    pub delivery_notes_template: Option<String>,
    pub revision_policy_template: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: PresetId,
    pub brokerage_id: BrokerageId,
    pub scope: PresetScope,
    pub office_id: Option<OfficeId>,
    pub name: String,
    /// Never empty.
    pub allowed_edit_types: BTreeSet<String>,
    pub approval_required: bool,
    pub disclosure_required_default: bool,
    pub delivery_notes_template: Option<String>,
    pub revision_policy_template: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Preset {
    pub fn from_draft(
        brokerage_id: BrokerageId,
        draft: PresetDraft,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let office_id = match draft.scope {
            PresetScope::Brokerage => None,
            PresetScope::Office => Some(draft.office_id.ok_or_else(|| {
                DomainError::validation("officeId is required for office presets")
                    .with_detail("field", "officeId")
            })?),
        };

        Ok(Self {
            id: PresetId::new(),
            brokerage_id,
            scope: draft.scope,
            office_id,
            name: required_text("name", &draft.name)?,
            allowed_edit_types: edit_type_set(draft.allowed_edit_types)?,
            approval_required: draft.approval_required,
            disclosure_required_default: draft.disclosure_required_default,
            delivery_notes_template: optional_text(draft.delivery_notes_template),
            revision_policy_template: optional_text(draft.revision_policy_template),
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: PresetPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = patch.name.map(|n| required_text("name", &n)).transpose()?;
        let types = patch.allowed_edit_types.map(edit_type_set).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(types) = types {
            self.allowed_edit_types = types;
        }
        if let Some(v) = patch.approval_required {
            self.approval_required = v;
        }
        if let Some(v) = patch.disclosure_required_default {
            self.disclosure_required_default = v;
        }
        if patch.delivery_notes_template.is_some() {
            self.delivery_notes_template = optional_text(patch.delivery_notes_template);
        }
        if patch.revision_policy_template.is_some() {
            self.revision_policy_template = optional_text(patch.revision_policy_template);
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn scope_target(&self) -> ScopeTarget {
        ScopeTarget {
            brokerage_id: self.brokerage_id,
            office_id: self.office_id,
            team_id: None,
        }
    }

    /// Whether a job in `office_id` may use this preset.
    pub fn usable_in(&self, office_id: OfficeId) -> bool {
        match self.scope {
            PresetScope::Brokerage => true,
            PresetScope::Office => self.office_id == Some(office_id),
        }
    }
}

impl Entity for Preset {
    type Id = PresetId;
    const KIND: &'static str = "preset";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn edit_type_set(types: Vec<String>) -> DomainResult<BTreeSet<String>> {
    let set: BTreeSet<String> = types
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if set.is_empty() {
        return Err(DomainError::validation("allowedEditTypes must not be empty")
            .with_detail("field", "allowedEditTypes"));
    }
    Ok(set)
}
