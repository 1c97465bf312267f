// Standard library
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

// 3rd party crates
use tokio::signal::ctrl_c;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, reload, EnvFilter};

// Project imports
use dns_failover::health::HealthStatus;
use dns_failover::service::HealthService;
use dns_failover::settings::{ConfigManager, Settings};

type LogHandle = reload::Handle<EnvFilter, fmt::Formatter>;

/// Main entry point for the DNS failover daemon.
///
/// Keeps the health of the configured targets up to date:
/// - Loads health checks, alert sinks and maintenance entries from settings
/// - Probes every watched target in the background
/// - Reports status changes through web hooks and email alerts
/// - Reloads the configuration on SIGHUP
/// - Shuts down gracefully on Ctrl+C
#[tokio::main]
async fn main() {
    // loads the .env file from the current directory or parents.
    dotenvy::dotenv_override().ok();

    let config: Arc<ConfigManager> =
        Arc::new(ConfigManager::new().expect("Failed to initialize configuration"));

    // setup logging.
    let log_level: String = config.get_log_level().await;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(&log_level))
        .with_level(true)
        .with_filter_reloading();
    let log_handle: LogHandle = builder.reload_handle();
    builder.init();

    info!("⚙️ Settings have been loaded.");

    // Create a broadcast channel for shutdown signal
    let (shutdown_tx, _) = broadcast::channel(1);
    let shutdown_tx_clone = shutdown_tx.clone();

    // Handle Ctrl+C
    tokio::spawn(async move {
        if let Err(e) = ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Received shutdown signal, initiating graceful shutdown...");
        let _ = shutdown_tx_clone.send(());
    });

    let (reload_tx, reload_rx) = mpsc::channel(1);
    listen_for_hangup(reload_tx);

    if let Err(e) = run(config, log_handle, reload_rx, shutdown_tx.subscribe()).await {
        error!("Application error: {}", e);
    }

    info!("Shutdown complete.");
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::builder().parse_lossy(format!(
        "{},hyper=error,hyper_util=error,reqwest=error,rustls=error",
        level
    ))
}

#[cfg(unix)]
fn listen_for_hangup(reload_tx: mpsc::Sender<()>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                error!("Failed to listen for SIGHUP: {}", e);
                return;
            }
        };
        while hangup.recv().await.is_some() {
            info!("Received SIGHUP, reloading configuration...");
            if reload_tx.send(()).await.is_err() {
                break;
            }
        }
    });
}

#[cfg(not(unix))]
fn listen_for_hangup(reload_tx: mpsc::Sender<()>) {
    // No SIGHUP here; configuration changes need a restart.
    drop(reload_tx);
}

/// Main application loop.
///
/// Queries every watched target once per status interval and logs the
/// verdicts, reloading the engine whenever a reload is requested.
async fn run(
    config: Arc<ConfigManager>,
    log_handle: LogHandle,
    mut reload_rx: mpsc::Receiver<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), Box<dyn Error>> {
    let mut settings: Settings = config.get_settings().await;

    let service = HealthService::new(settings.service_options())?;
    service.reload(&settings.failover).await?;
    info!(
        "🕰️ Reporting {} watched targets every {} seconds",
        settings.watch.len(),
        settings.status.interval
    );

    let mut previous: HashMap<String, HealthStatus> = HashMap::new();

    loop {
        tokio::select! {
            // Handle shutdown signal
            Ok(_) = shutdown_rx.recv() => {
                info!("Received shutdown signal, stopping monitors...");
                break;
            }

            // Handle configuration reloads
            Some(()) = reload_rx.recv() => {
                match config.reload().await {
                    Ok(new_settings) => {
                        if let Err(e) = log_handle.reload(build_filter(&new_settings.get_log_level())) {
                            warn!("Failed to apply log level: {}", e);
                        }
                        if new_settings.service_options() != service.options() {
                            warn!("Monitor expiry and reaper interval changes apply after a restart");
                        }
                        match service.reload(&new_settings.failover).await {
                            Ok(()) => {
                                previous.retain(|key, _| {
                                    new_settings.watch.iter().any(|target| {
                                        target.monitor_key().map(|k| &k.to_string() == key).unwrap_or(false)
                                    })
                                });
                                settings = new_settings;
                            }
                            Err(e) => error!("Failed to reload health service: {}", e),
                        }
                    }
                    Err(e) => error!("Failed to reload configuration: {}", e),
                }
            }

            // Handle periodic status reports
            _ = tokio::time::sleep(settings.get_status_interval()) => {
                report_status(&service, &settings, &mut previous);
            }
        }
    }

    service.shutdown().await;
    Ok(())
}

fn report_status(
    service: &HealthService,
    settings: &Settings,
    previous: &mut HashMap<String, HealthStatus>,
) {
    debug!("Starting status round");
    for target in &settings.watch {
        let key = match target.monitor_key() {
            Ok(key) => key,
            Err(e) => {
                warn!("Skipping watch target: {}", e);
                continue;
            }
        };

        let response = service.query_status(key.clone(), true);
        let status = response.status();
        let name = key.to_string();

        if previous.insert(name, status) == Some(status) {
            debug!(monitor = %key, %status, "🩺 {}", response);
        } else {
            info!(monitor = %key, %status, "🩺 {}", response);
        }
    }
    debug!(monitors = service.monitor_count(), "Status round finished");
}
