use crate::App;
use crate::scheduler::Scheduler;
use anyhow::{Context, Result};
use tracing::info;

/// Warms the caches and runs the background refresh cycles until Ctrl-C.
pub async fn run(app: &App) -> Result<()> {
    app.engine.warm_up().await;

    let scheduler = Scheduler::new(
        app.engine.clone(),
        app.registry.clone(),
        app.config.scheduler.clone(),
    );
    let handles = scheduler.spawn();
    info!(
        daily_hour = app.config.scheduler.daily_hour,
        "Scheduler running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down scheduler");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}
