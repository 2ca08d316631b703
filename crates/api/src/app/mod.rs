//! HTTP API application wiring (Axum router + handler wiring).
//!
//! - `routes/`: HTTP routes, one file per area
//! - `dto.rs`: query/body extraction and parsing helpers
//! - `errors.rs`: the response envelope and error mapping

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Router};
use tower::ServiceBuilder;

use stagecraft_infra::WorkflowHandlers;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(handlers: WorkflowHandlers) -> Router {
    let handlers = Arc::new(handlers);

    // Protected routes: require identity headers.
    let protected = routes::router().route_layer(axum::middleware::from_fn(middleware::identity));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/bootstrap", post(routes::system::bootstrap))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::request_context))
                .layer(Extension(handlers)),
        )
}
