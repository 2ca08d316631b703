use axum::Router;

pub mod jobs;
pub mod org;
pub mod presets;
pub mod reports;
pub mod system;

/// Router for all endpoints that need an actor.
pub fn router() -> Router {
    Router::new()
        .merge(org::router())
        .merge(presets::router())
        .merge(jobs::router())
        .merge(reports::router())
}
