use std::sync::Arc;

use anyhow::Context;

use fcb_infra::AppConfig;
use fcb_observability::LogConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // First pass picks the log format; the second logs defaulted values.
    let config = AppConfig::from_env().context("invalid configuration")?;
    fcb_observability::init(&LogConfig::json(config.json_logs));
    let config = AppConfig::from_env().context("invalid configuration")?;

    let services = fcb_api::app::build_services(&config).await?;
    let app = fcb_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
