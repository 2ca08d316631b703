//! Seeded tenant used by handler tests.

use std::sync::Arc;

use chrono::Utc;

use stagecraft_auth::{ActorContext, Role};
use stagecraft_core::{BrokerageId, OfficeId, TeamId, UserId};
use stagecraft_workflow::{Brokerage, Office, Preset, PresetDraft, PresetScope, Team};

use super::WorkflowHandlers;
use crate::config::AppConfig;
use crate::kv::InMemoryKvStore;
use crate::store::{EntityStore, keys};

/// One brokerage with two offices, one team per office and two presets.
pub struct Fixture {
    pub handlers: WorkflowHandlers,
    pub brokerage: Brokerage,
    pub office_a: Office,
    pub office_b: Office,
    pub team_a: Team,
    pub team_b: Team,
    /// `approvalRequired = true`
    pub review_preset: Preset,
    /// `approvalRequired = false`
    pub direct_preset: Preset,
    pub admin: ActorContext,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_bootstrap(secret: &str) -> Self {
        Self::with_config(AppConfig {
            bootstrap_secret: Some(secret.to_string()),
            ..AppConfig::default()
        })
        .await
    }

    async fn with_config(config: AppConfig) -> Self {
        let store = EntityStore::new(Arc::new(InMemoryKvStore::new()));
        let handlers = WorkflowHandlers::new(store.clone(), &config);
        let now = Utc::now();

        let brokerage = Brokerage::new("Acme Realty", now).unwrap();
        let office_a = Office::new(brokerage.id, "Office A", now).unwrap();
        let office_b = Office::new(brokerage.id, "Office B", now).unwrap();
        let team_a = Team::new(&office_a, "Team A", now).unwrap();
        let team_b = Team::new(&office_b, "Team B", now).unwrap();

        store.put(&brokerage).await.unwrap();
        for office in [&office_a, &office_b] {
            store.insert(office, &[keys::brokerage_offices(brokerage.id)]).await.unwrap();
        }
        for team in [&team_a, &team_b] {
            store
                .insert(
                    team,
                    &[keys::office_teams(team.office_id), keys::brokerage_teams(brokerage.id)],
                )
                .await
                .unwrap();
        }

        let preset = |name: &str, approval_required: bool| {
            Preset::from_draft(
                brokerage.id,
                PresetDraft {
                    scope: PresetScope::Brokerage,
                    office_id: None,
                    name: name.to_string(),
                    allowed_edit_types: vec!["virtual_staging".into(), "sky_replacement".into()],
                    approval_required,
                    disclosure_required_default: true,
                    delivery_notes_template: None,
                    revision_policy_template: None,
                },
                now,
            )
            .unwrap()
        };
        let review_preset = preset("Reviewed", true);
        let direct_preset = preset("Direct", false);
        for p in [&review_preset, &direct_preset] {
            store.insert(p, &[keys::brokerage_presets(brokerage.id)]).await.unwrap();
        }

        let admin = actor(Role::BrokerageAdmin, brokerage.id, None, None);
        Self {
            handlers,
            brokerage,
            office_a,
            office_b,
            team_a,
            team_b,
            review_preset,
            direct_preset,
            admin,
        }
    }
}

pub fn actor(
    role: Role,
    brokerage_id: BrokerageId,
    office_id: Option<OfficeId>,
    team_id: Option<TeamId>,
) -> ActorContext {
    ActorContext {
        user_id: UserId::new(),
        role,
        brokerage_id,
        office_id,
        team_id,
        request_id: format!("req-{}", role.as_str()),
    }
}

/// A fresh actor inside the fixture's brokerage.
pub fn actor_in(
    fx: &Fixture,
    role: Role,
    office_id: Option<OfficeId>,
    team_id: Option<TeamId>,
) -> ActorContext {
    actor(role, fx.brokerage.id, office_id, team_id)
}
