//! Entity store access layer over a [`KeyValueStore`].
//!
//! Records are JSON blobs keyed by `{kind}:{id}`. Listing goes through index
//! keys holding JSON arrays of ids; index updates are read-modify-write cycles
//! serialized per index key. Audit logs are native lists, newest first.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};

use stagecraft_core::{BrokerageId, DomainError, DomainResult, Entity};
use stagecraft_workflow::AuditEvent;

use crate::kv::{KeyValueStore, StoreError};

pub mod keys;
mod locks;

pub use locks::KeyedLocks;

const AUDIT_PAGE: usize = 200;

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "store operation failed");
        DomainError::internal("storage failure")
    }
}

fn encode<T: Serialize>(value: &T) -> DomainResult<String> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()).into())
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> DomainResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| StoreError::Serialization(format!("{key}: {e}")).into())
}

#[derive(Clone)]
pub struct EntityStore {
    kv: Arc<dyn KeyValueStore>,
    locks: Arc<KeyedLocks>,
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("backend", &self.kv.backend())
            .finish()
    }
}

impl EntityStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            locks: Arc::new(KeyedLocks::new()),
        }
    }

    pub fn kv(&self) -> &dyn KeyValueStore {
        self.kv.as_ref()
    }

    async fn get_raw<T: DeserializeOwned>(&self, key: &str) -> DomainResult<Option<T>> {
        match self.kv.get(key).await? {
            Some(raw) => decode(key, &raw).map(Some),
            None => Ok(None),
        }
    }

    pub async fn get<E: Entity>(&self, id: &E::Id) -> DomainResult<Option<E>> {
        self.get_raw(&E::key_for(id)).await
    }

    /// Like [`EntityStore::get`], but a missing record is `NOT_FOUND`.
    pub async fn require<E: Entity>(&self, id: &E::Id) -> DomainResult<E> {
        self.get(id).await?.ok_or_else(|| {
            DomainError::not_found(format!("{} not found", E::KIND))
                .with_detail("entity", E::KIND)
                .with_detail("id", id.to_string())
        })
    }

    pub async fn put<E: Entity>(&self, entity: &E) -> DomainResult<()> {
        let key = E::key_for(entity.id());
        self.kv.set(&key, encode(entity)?, None).await?;
        Ok(())
    }

    /// Persist `entity` and add its id to each of `indexes`.
    pub async fn insert<E: Entity>(&self, entity: &E, indexes: &[String]) -> DomainResult<()> {
        self.put(entity).await?;
        let id = entity.id().to_string();
        for index in indexes {
            self.index_add(index, &id).await?;
        }
        Ok(())
    }

    pub async fn index_ids(&self, index: &str) -> DomainResult<Vec<String>> {
        Ok(self.get_raw(index).await?.unwrap_or_default())
    }

    async fn update_index(
        &self,
        index: &str,
        update: impl FnOnce(&mut Vec<String>) -> bool + Send,
    ) -> DomainResult<()> {
        let _guard = self.locks.lock(index).await;
        let mut ids = self.index_ids(index).await?;
        if update(&mut ids) {
            self.kv.set(index, encode(&ids)?, None).await?;
        }
        Ok(())
    }

    /// Append `id` unless already present.
    pub async fn index_add(&self, index: &str, id: &str) -> DomainResult<()> {
        self.update_index(index, |ids| {
            if ids.iter().any(|existing| existing == id) {
                return false;
            }
            ids.push(id.to_string());
            true
        })
        .await
    }

    /// Load every record listed in `index`, in index order. Ids whose record is
    /// missing are skipped.
    pub async fn load_index<E: Entity>(&self, index: &str) -> DomainResult<Vec<E>> {
        let ids = self.index_ids(index).await?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let key = format!("{}:{}", E::KIND, id);
            match self.get_raw::<E>(&key).await? {
                Some(entity) => out.push(entity),
                None => tracing::warn!(index, %key, "index entry without record"),
            }
        }
        Ok(out)
    }

    /// Append an audit event to its brokerage's log.
    pub async fn append_audit(&self, event: &AuditEvent) -> DomainResult<()> {
        self.put(event).await?;
        let log = keys::brokerage_audit(event.brokerage_id);
        self.kv.list_push(&log, event.id.to_string()).await?;
        Ok(())
    }

    /// Audit events of one brokerage, most recent first, keeping those that pass
    /// `filter` until `limit` is reached. The log is read in pages.
    pub async fn audit_events(
        &self,
        brokerage_id: BrokerageId,
        filter: impl Fn(&AuditEvent) -> bool + Send + Sync,
        limit: usize,
    ) -> DomainResult<Vec<AuditEvent>> {
        let log = keys::brokerage_audit(brokerage_id);
        let mut out = Vec::new();
        let mut start = 0;
        while out.len() < limit {
            let ids = self.kv.list_range(&log, start, start + AUDIT_PAGE - 1).await?;
            if ids.is_empty() {
                break;
            }
            start += ids.len();
            for id in ids {
                let key = format!("{}:{}", AuditEvent::KIND, id);
                let Some(event) = self.get_raw::<AuditEvent>(&key).await? else {
                    continue;
                };
                if filter(&event) {
                    out.push(event);
                    if out.len() >= limit {
                        break;
                    }
                }
            }
        }
        Ok(out)
    }
}
