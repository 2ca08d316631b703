use anyhow::Context;

use stagecraft_infra::{AppConfig, EntityStore, WorkflowHandlers, build_store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    stagecraft_observability::init_with(config.log_format);

    let kv = build_store(&config).await.context("failed to open key/value store")?;
    tracing::info!(env = ?config.env, store = kv.backend(), "starting");

    let handlers = WorkflowHandlers::new(EntityStore::new(kv), &config);
    let app = stagecraft_api::app::build_app(handlers);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
