use anyhow::Context;

use siteops_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    siteops_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        legacy_fallback = config.fallback.legacy_fallback_enabled,
        trigger = ?config.fallback.trigger,
        persistent = config.database_url.is_some(),
        "starting siteops-api"
    );

    let app = siteops_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
