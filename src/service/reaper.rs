// Standard library
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

// 3rd party crates
use dashmap::DashMap;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info};

// Project imports
use crate::monitor::types::{Monitor, MonitorKey};

use super::types::Reaper;

impl Reaper {
    /// Starts sweeping `monitors` every `interval`, measured from the end of
    /// one sweep to the start of the next.
    pub fn spawn(
        runtime: &Handle,
        monitors: Arc<DashMap<MonitorKey, Arc<Monitor>>>,
        interval: Duration,
        expiry: Duration,
    ) -> Self {
        Self::start(runtime, interval, move || {
            let monitors = Arc::clone(&monitors);
            async move { sweep_expired(&monitors, Instant::now(), expiry).await }
        })
    }

    fn start<F, Fut>(runtime: &Handle, interval: Duration, sweep: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = usize> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(run_reaper(interval, sweep, shutdown_rx));

        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Stops the sweep loop and waits for it to finish.
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    error!("Reaper task panicked: {}", e);
                }
            }
        }
        debug!("Reaper stopped");
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run_reaper<F, Fut>(interval: Duration, mut sweep: F, mut shutdown: watch::Receiver<bool>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = usize>,
{
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => break,
        }

        // A failing sweep must not end garbage collection for good.
        let outcome = AssertUnwindSafe(sweep()).catch_unwind().await;

        match outcome {
            Ok(0) => debug!("Reaper sweep found no expired monitors"),
            Ok(removed) => info!(removed, "🧹 Reaper retired expired monitors"),
            Err(panic) => error!("Reaper sweep failed: {}", panic_message(panic.as_ref())),
        }
    }
}

/// Removes and disposes every Monitor idle for longer than `expiry`.
///
/// The expiry is re-checked at removal time, so a Monitor queried while
/// the sweep runs survives.
pub async fn sweep_expired(
    monitors: &DashMap<MonitorKey, Arc<Monitor>>,
    now: Instant,
    expiry: Duration,
) -> usize {
    let expired: Vec<MonitorKey> = monitors
        .iter()
        .filter(|entry| entry.value().is_expired(now, expiry))
        .map(|entry| entry.key().clone())
        .collect();

    let mut removed = 0;
    for key in expired {
        if let Some((_, monitor)) =
            monitors.remove_if(&key, |_, monitor| monitor.is_expired(now, expiry))
        {
            monitor.dispose().await;
            debug!(monitor = %key, "Expired monitor removed");
            removed += 1;
        }
    }

    removed
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
