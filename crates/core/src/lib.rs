//! `stagecraft-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult, ErrorCode};
pub use id::{
    ApprovalId, AssetId, AuditEventId, BrokerageId, DeliveryId, JobId, MembershipId, OfficeId,
    PresetId, RevisionId, TeamId, UserId,
};
