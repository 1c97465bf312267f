// Standard library
use std::net::IpAddr;
use std::sync::Arc;

// 3rd party crates
use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info};

// Project imports
use crate::alerts::types::{AlertDispatcher, AlertEvent};
use crate::health::traits::Resolver;
use crate::health::types::{HealthCheck, HealthCheckResponse, HealthStatus, ProbeTarget};

use super::types::{MonitorContext, MonitorKey, MonitorState};

/// Probing loop of one Monitor.
///
/// Cycles are strictly sequential: the next cycle starts `interval` after
/// the previous one finished. The loop ends when shutdown is signalled or
/// its health check no longer exists.
pub(super) async fn run_monitor_loop(
    key: MonitorKey,
    state: Arc<RwLock<MonitorState>>,
    context: MonitorContext,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(monitor = %key, "Monitor loop starting");

    loop {
        let health_check: Arc<HealthCheck> = match context.health_checks.get(key.health_check())
        {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                debug!(monitor = %key, "Health check removed, monitor loop exiting");
                break;
            }
        };

        let (response, addresses) = tokio::select! {
            outcome = probe_once(&key, &health_check, context.resolver.as_ref()) => outcome,
            _ = shutdown.changed() => break,
        };

        apply_response(
            &key,
            &state,
            &health_check,
            &context.dispatcher,
            response,
            addresses,
        );

        tokio::select! {
            _ = tokio::time::sleep(health_check.interval()) => {}
            _ = shutdown.changed() => break,
        }
    }

    debug!(monitor = %key, "Monitor loop stopped");
}

/// Runs one probe cycle for `key`.
///
/// Domain targets are resolved first; every resolved address is tried in
/// order and the first healthy one wins. The address set is `None` when
/// resolution failed, so the previous set stays in place.
pub(super) async fn probe_once(
    key: &MonitorKey,
    health_check: &HealthCheck,
    resolver: &dyn Resolver,
) -> (HealthCheckResponse, Option<Vec<IpAddr>>) {
    match key {
        MonitorKey::Address { address, url, .. } => {
            let response = health_check
                .execute(ProbeTarget::Address(*address), url.as_ref())
                .await;
            (response, Some(vec![*address]))
        }
        MonitorKey::Domain {
            domain,
            record_type,
            url,
            ..
        } => {
            let addresses = match resolver.resolve(domain, *record_type).await {
                Ok(addresses) => addresses,
                Err(e) => return (HealthCheckResponse::failed(e.to_string()), None),
            };

            let mut last: Option<HealthCheckResponse> = None;
            for address in &addresses {
                let target = ProbeTarget::Domain {
                    domain: domain.clone(),
                    record_type: *record_type,
                    address: *address,
                };
                let response = health_check.execute(target, url.as_ref()).await;
                if response.status() == HealthStatus::Healthy {
                    return (response, Some(addresses));
                }
                last = Some(response);
            }

            let response = last.unwrap_or_else(|| {
                HealthCheckResponse::failed(format!("No {} address for {}", record_type, domain))
            });
            (response, Some(addresses))
        }
    }
}

/// Stores `response` and reports a transition when the status changed.
///
/// `addresses` replaces the probed address set only when present.
pub(super) fn apply_response(
    key: &MonitorKey,
    state: &RwLock<MonitorState>,
    health_check: &HealthCheck,
    dispatcher: &AlertDispatcher,
    response: HealthCheckResponse,
    addresses: Option<Vec<IpAddr>>,
) -> bool {
    let previous_status = {
        let mut state = state.write();
        let previous = state.response.status();
        state.response = response.clone();
        if let Some(addresses) = addresses {
            state.addresses = addresses;
        }
        previous
    };

    if previous_status == response.status() {
        return false;
    }

    info!(
        monitor = %key,
        previous = %previous_status,
        status = %response.status(),
        "Health status changed"
    );

    let event = AlertEvent {
        health_check: health_check.name().to_string(),
        monitor: key.to_string(),
        target: key.target(),
        previous_status,
        status: response.status(),
        message: response.message().map(str::to_string),
        date_time: Utc::now(),
    };
    dispatcher.notify(&health_check.config(), event);

    true
}
