use stagecraft_auth::{ActorContext, Permission, assert_permission, assert_tenant_scope};
use stagecraft_core::{DomainResult, PresetId};
use stagecraft_workflow::{
    AuditEntityType, AuditEvent, AuditEventType, Office, Preset, PresetDraft, PresetPatch,
    PresetScope,
};

use super::{WorkflowHandlers, in_scope, now};
use crate::store::keys;

fn manage_permission(scope: PresetScope) -> Permission {
    match scope {
        PresetScope::Brokerage => Permission::ManageBrokeragePresets,
        PresetScope::Office => Permission::ManageOfficePresets,
    }
}

impl WorkflowHandlers {
    pub async fn create_preset(
        &self,
        actor: &ActorContext,
        draft: PresetDraft,
    ) -> DomainResult<Preset> {
        assert_permission(actor.role, manage_permission(draft.scope))?;
        if let (PresetScope::Office, Some(office_id)) = (draft.scope, draft.office_id) {
            let office: Office = self.store.require(&office_id).await?;
            assert_tenant_scope(actor, &office.scope())?;
        }

        let preset = Preset::from_draft(actor.brokerage_id, draft, now())?;
        self.store
            .insert(&preset, &[keys::brokerage_presets(preset.brokerage_id)])
            .await?;

        self.audit(
            AuditEvent::new(
                actor,
                AuditEventType::PresetCreated,
                AuditEntityType::Preset,
                preset.id,
                preset.created_at,
            )
            .scoped(preset.scope_target())
            .after(&preset),
        )
        .await?;
        Ok(preset)
    }

    /// Presets visible to the actor: brokerage-wide ones plus office presets in scope.
    pub async fn list_presets(&self, actor: &ActorContext) -> DomainResult<Vec<Preset>> {
        let presets: Vec<Preset> = self
            .store
            .load_index(&keys::brokerage_presets(actor.brokerage_id))
            .await?;
        Ok(presets
            .into_iter()
            .filter(|p| in_scope(actor, &p.scope_target()))
            .collect())
    }

    pub async fn update_preset(
        &self,
        actor: &ActorContext,
        preset_id: PresetId,
        patch: PresetPatch,
    ) -> DomainResult<Preset> {
        let mut preset: Preset = self.store.require(&preset_id).await?;
        assert_permission(actor.role, manage_permission(preset.scope))?;
        assert_tenant_scope(actor, &preset.scope_target())?;

        let before = preset.clone();
        preset.apply_patch(patch, now())?;
        self.store.put(&preset).await?;

        self.audit(
            AuditEvent::new(
                actor,
                AuditEventType::PresetUpdated,
                AuditEntityType::Preset,
                preset.id,
                preset.updated_at,
            )
            .scoped(preset.scope_target())
            .before(&before)
            .after(&preset),
        )
        .await?;
        Ok(preset)
    }
}
