use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;
use vitality::*;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn log_snapshot(snapshot: &models::Snapshot) {
    tracing::info!(
        sequence = snapshot.sequence,
        cpu = %format!("{:.1}%", snapshot.cpu_usage * 100.0),
        memory = %format!("{:.1}%", snapshot.memory_usage * 100.0),
        battery = %format!("{:.0}%", snapshot.battery_health * 100.0),
        cycles = snapshot.battery_cycles,
        uptime = %snapshot.uptime_text,
        thermal = snapshot.thermal_state.label(),
        disks = snapshot.disks.len(),
        rx_bps = snapshot.network_rx_bytes_per_sec as u64,
        tx_bps = snapshot.network_tx_bytes_per_sec as u64,
        top_cpu = snapshot.top_cpu_apps.first().map(|p| p.name.as_str()).unwrap_or("-"),
        top_memory = snapshot.top_memory_apps.first().map(|p| p.name.as_str()).unwrap_or("-"),
        "snapshot"
    );
    if tracing::enabled!(tracing::Level::DEBUG) {
        match serde_json::to_string(snapshot) {
            Ok(json) => tracing::debug!(snapshot = %json, "snapshot json"),
            Err(e) => tracing::warn!(error = %e, operation = "serialize_snapshot", "snapshot json failed"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        interval_ms = app_config.sampling.interval_ms,
        top_n = app_config.sampling.top_n,
        "{} starting",
        version::banner()
    );

    let engine = engine::MonitorEngine::new(&app_config);
    let mut snapshots = engine.subscribe();
    engine.start();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                log_snapshot(&snapshot);
            }
            _ = &mut shutdown => {
                tracing::info!("Received shutdown signal");
                break;
            }
        }
    }

    engine.stop().await;
    Ok(())
}
