use anyhow::{Context, Result};
use ned_co2::APP_VERSION;
use ned_co2::config::Config;
use ned_co2::entry::EntryRegistry;
use ned_co2::logging::init_logging;
use tracing::{error, info};

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;
    config.validate().context("Invalid configuration")?;

    info!("NED CO2 {} starting up", APP_VERSION);

    let mut registry = EntryRegistry::new();
    let entry_id = registry
        .setup_entry(&config)
        .await
        .context("Failed to set up entry")?;
    info!(
        "Polling point {} every {}s (entry {})",
        config.window.point, config.update_interval_secs, entry_id
    );

    #[cfg(feature = "web")]
    let outcome = {
        let handle = registry
            .get(&entry_id)
            .cloned()
            .context("Entry vanished after setup")?;
        let state = ned_co2::web::AppState::new(entry_id.clone(), handle);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let host = config.web.host.clone();
        let port = config.web.port;
        let mut web_task = tokio::spawn(async move {
            let shutdown = async {
                let _ = stop_rx.await;
            };
            ned_co2::web::serve(state, &host, port, shutdown).await
        });

        // The process has no reason to run once the HTTP surface is gone
        tokio::select! {
            joined = &mut web_task => match joined {
                Ok(Ok(())) => Err(anyhow::anyhow!("Web server stopped unexpectedly")),
                Ok(Err(e)) => Err(e.context("Web server failed")),
                Err(e) => Err(anyhow::anyhow!("Web server task failed: {}", e)),
            },
            () = ctrl_c() => {
                info!("Shutdown requested");
                let _ = stop_tx.send(());
                match web_task.await {
                    Ok(result) => result.context("Web server failed during shutdown"),
                    Err(e) => Err(anyhow::anyhow!("Web server task failed: {}", e)),
                }
            }
        }
    };

    #[cfg(not(feature = "web"))]
    let outcome: Result<()> = {
        ctrl_c().await;
        info!("Shutdown requested");
        Ok(())
    };

    if let Err(e) = &outcome {
        error!("{:#}", e);
    }
    registry.unload_all().await;
    info!("Shutdown complete");
    outcome
}
