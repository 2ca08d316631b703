//! HTTP API: router, identity middleware and response envelope.

pub mod app;
pub mod context;
pub mod middleware;
