use std::sync::Arc;

use anyhow::Context;
use employee_service::{
    build_routes, init_tracing, AppConfig, Auth, EmployeeRepository, MemoryStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;

    init_tracing(config.log_format);

    let store = Arc::new(MemoryStore::new());
    let repo = EmployeeRepository::new(store, config.store_timeout);
    let auth = Auth::new(config.auth.clone());

    let routes = build_routes(&auth, repo);

    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(config.bind_addr, shutdown_signal())
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(%addr, "employee service listening");
    server.await;
    tracing::info!("employee service stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
