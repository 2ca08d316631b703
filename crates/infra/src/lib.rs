//! Infrastructure layer: key-value storage, the entity store over it,
//! configuration, and the request handlers that drive the workflow.

pub mod config;
pub mod handlers;
pub mod kv;
pub mod store;

pub use config::{AppConfig, AppEnv, ConfigError, build_store};
pub use handlers::WorkflowHandlers;
pub use kv::{InMemoryKvStore, KeyValueStore, StoreError};
pub use store::EntityStore;
