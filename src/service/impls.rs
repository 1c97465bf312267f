// Standard library
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

// 3rd party crates
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, error, info, trace};
use url::Url;

// Project imports
use crate::alerts::types::{
    AlertDispatcher, EmailAlert, EmailAlertConfig, LogMailTransport, WebHook, WebHookConfig,
};
use crate::health::types::{
    HealthCheck, HealthCheckConfig, HealthCheckResponse, NetworkProber, SystemResolver,
};
use crate::maintenance::types::{MaintenanceEntry, MaintenanceOverlay};
use crate::monitor::types::{Monitor, MonitorContext, MonitorKey, RecordType};
use crate::settings::errors::ValidationError;

use super::constants::{
    DEFAULT_MONITOR_EXPIRY_SECS, DEFAULT_REAPER_INTERVAL_SECS, UNDER_MAINTENANCE,
};
use super::errors::ServiceError;
use super::reaper::sweep_expired;
use super::types::{
    Collaborators, FailoverConfig, HealthService, MonitorInfo, Reaper, ServiceOptions,
};

impl FailoverConfig {
    /// Parses a JSON application config.
    pub fn from_json(json: &str) -> Result<Self, ServiceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut names: HashSet<&str> = HashSet::new();
        for config in &self.email_alerts {
            config.validate()?;
            if !names.insert(&config.name) {
                return Err(ValidationError::DuplicateName {
                    section: "email alert",
                    name: config.name.clone(),
                });
            }
        }

        names.clear();
        for config in &self.web_hooks {
            config.validate()?;
            if !names.insert(&config.name) {
                return Err(ValidationError::DuplicateName {
                    section: "web hook",
                    name: config.name.clone(),
                });
            }
        }

        names.clear();
        for config in &self.health_checks {
            config.validate()?;
            if !names.insert(&config.name) {
                return Err(ValidationError::DuplicateName {
                    section: "health check",
                    name: config.name.clone(),
                });
            }
        }

        let mut networks = HashSet::new();
        for entry in &self.under_maintenance {
            if !networks.insert(entry.network) {
                return Err(ValidationError::DuplicateNetwork(entry.network.to_string()));
            }
        }

        Ok(())
    }
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            monitor_expiry: Duration::from_secs(DEFAULT_MONITOR_EXPIRY_SECS),
            reaper_interval: Duration::from_secs(DEFAULT_REAPER_INTERVAL_SECS),
        }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            prober: Arc::new(NetworkProber::default()),
            resolver: Arc::new(SystemResolver),
            mail_transport: Arc::new(LogMailTransport),
        }
    }
}

impl HealthService {
    /// Creates an empty service with network probing and starts its reaper.
    ///
    /// Must be called inside a tokio runtime; Monitors and the reaper are
    /// spawned onto it.
    pub fn new(options: ServiceOptions) -> Result<Self, ServiceError> {
        Self::with_collaborators(options, Collaborators::default())
    }

    pub fn with_collaborators(
        options: ServiceOptions,
        collaborators: Collaborators,
    ) -> Result<Self, ServiceError> {
        let runtime = Handle::try_current().map_err(|_| ServiceError::NoRuntime)?;
        let monitors: Arc<DashMap<MonitorKey, Arc<Monitor>>> = Arc::new(DashMap::new());

        let reaper = Reaper::spawn(
            &runtime,
            Arc::clone(&monitors),
            options.reaper_interval,
            options.monitor_expiry,
        );

        Ok(Self {
            options,
            runtime,
            collaborators,
            health_checks: Arc::new(DashMap::new()),
            email_alerts: Arc::new(DashMap::new()),
            web_hooks: Arc::new(DashMap::new()),
            maintenance: RwLock::new(MaintenanceOverlay::new()),
            monitors,
            reaper: Mutex::new(Some(reaper)),
            disposed: AtomicBool::new(false),
        })
    }

    pub fn options(&self) -> ServiceOptions {
        self.options
    }

    fn monitor_context(&self) -> MonitorContext {
        MonitorContext {
            health_checks: Arc::clone(&self.health_checks),
            dispatcher: AlertDispatcher::new(
                Arc::clone(&self.email_alerts),
                Arc::clone(&self.web_hooks),
            ),
            resolver: Arc::clone(&self.collaborators.resolver),
        }
    }

    /// Reconciles live state against `config`.
    ///
    /// Entries present on both sides are reloaded in place, new entries are
    /// created and missing ones removed. Removing a health check also
    /// disposes every Monitor using it. The maintenance set is replaced
    /// wholesale. The configuration is validated first; an invalid one
    /// leaves everything untouched.
    ///
    /// Concurrent calls are not serialized here; callers must not overlap
    /// reloads.
    pub async fn reload(&self, config: &FailoverConfig) -> Result<(), ServiceError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(ServiceError::ShutDown);
        }

        config.validate().map_err(|e| {
            error!("Configuration validation failed during reload: {}", e);
            e
        })?;

        self.reload_email_alerts(&config.email_alerts);
        self.reload_web_hooks(&config.web_hooks);
        self.reload_health_checks(&config.health_checks).await;

        self.maintenance.write().replace(&config.under_maintenance);

        info!(
            health_checks = self.health_checks.len(),
            email_alerts = self.email_alerts.len(),
            web_hooks = self.web_hooks.len(),
            maintenance = config.under_maintenance.len(),
            "⚙️ Failover configuration reloaded"
        );
        Ok(())
    }

    fn reload_email_alerts(&self, configs: &[EmailAlertConfig]) {
        for config in configs {
            let existing = self
                .email_alerts
                .get(&config.name)
                .map(|entry| Arc::clone(entry.value()));

            match existing {
                Some(alert) => alert.reload(config.clone()),
                None => {
                    let alert = EmailAlert::new(
                        config.clone(),
                        Arc::clone(&self.collaborators.mail_transport),
                    );
                    self.email_alerts.insert(config.name.clone(), Arc::new(alert));
                    debug!(email_alert = %config.name, "Email alert added");
                }
            }
        }

        self.email_alerts.retain(|name, _| {
            let keep = configs.iter().any(|config| &config.name == name);
            if !keep {
                debug!(email_alert = %name, "Email alert removed");
            }
            keep
        });
    }

    fn reload_web_hooks(&self, configs: &[WebHookConfig]) {
        for config in configs {
            let existing = self
                .web_hooks
                .get(&config.name)
                .map(|entry| Arc::clone(entry.value()));

            match existing {
                Some(hook) => hook.reload(config.clone()),
                None => match WebHook::new(config.clone()) {
                    Ok(hook) => {
                        self.web_hooks.insert(config.name.clone(), Arc::new(hook));
                        debug!(web_hook = %config.name, "Web hook added");
                    }
                    Err(e) => error!(web_hook = %config.name, "Failed to create web hook: {}", e),
                },
            }
        }

        self.web_hooks.retain(|name, _| {
            let keep = configs.iter().any(|config| &config.name == name);
            if !keep {
                debug!(web_hook = %name, "Web hook removed");
            }
            keep
        });
    }

    async fn reload_health_checks(&self, configs: &[HealthCheckConfig]) {
        for config in configs {
            let existing = self
                .health_checks
                .get(&config.name)
                .map(|entry| Arc::clone(entry.value()));

            match existing {
                Some(check) => check.reload(config.clone()),
                None => {
                    let check =
                        HealthCheck::new(config.clone(), Arc::clone(&self.collaborators.prober));
                    self.health_checks.insert(config.name.clone(), Arc::new(check));
                    debug!(health_check = %config.name, "Health check added");
                }
            }
        }

        let removed: Vec<String> = self
            .health_checks
            .iter()
            .filter(|entry| !configs.iter().any(|config| &config.name == entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        for name in removed {
            if self.health_checks.remove(&name).is_some() {
                let disposed = self.remove_monitors_for(&name).await;
                debug!(health_check = %name, monitors = disposed, "Health check removed");
            }
        }
    }

    /// Disposes every Monitor whose key references `health_check`.
    async fn remove_monitors_for(&self, health_check: &str) -> usize {
        let keys: Vec<MonitorKey> = self
            .monitors
            .iter()
            .filter(|entry| entry.key().health_check() == health_check)
            .map(|entry| entry.key().clone())
            .collect();

        let mut disposed = 0;
        for key in keys {
            if let Some((_, monitor)) = self.monitors.remove(&key) {
                monitor.dispose().await;
                disposed += 1;
            }
        }
        disposed
    }

    /// Status of `address` according to `health_check`.
    ///
    /// Never waits on a probe. See [`HealthService::query_status`].
    pub fn query_address_status(
        &self,
        address: IpAddr,
        health_check: &str,
        url: Option<&Url>,
        try_add: bool,
    ) -> HealthCheckResponse {
        self.query_status(MonitorKey::address(health_check, address, url), try_add)
    }

    /// Status of the `record_type` addresses of `domain` according to
    /// `health_check`. The domain is matched case-insensitively.
    pub fn query_domain_status(
        &self,
        domain: &str,
        record_type: RecordType,
        health_check: &str,
        url: Option<&Url>,
        try_add: bool,
    ) -> HealthCheckResponse {
        self.query_status(
            MonitorKey::domain(health_check, domain, record_type, url),
            try_add,
        )
    }

    /// Returns the cached verdict for `key`.
    ///
    /// - A live Monitor answers with its last result, maintenance applied.
    /// - An unknown health check yields `Failed` with
    ///   `"No such health check: <name>"`.
    /// - Otherwise `Unknown` is returned, and with `try_add` a Monitor is
    ///   created and starts probing in the background.
    pub fn query_status(&self, key: MonitorKey, try_add: bool) -> HealthCheckResponse {
        let existing = self.monitors.get(&key).map(|entry| Arc::clone(entry.value()));
        if let Some(monitor) = existing {
            monitor.touch();
            return self.visible_response(&monitor);
        }

        if !self.health_checks.contains_key(key.health_check()) {
            return HealthCheckResponse::failed(format!(
                "No such health check: {}",
                key.health_check()
            ));
        }

        if !try_add || self.disposed.load(Ordering::Acquire) {
            return HealthCheckResponse::unknown();
        }

        match self.monitors.entry(key.clone()) {
            Entry::Occupied(entry) => {
                entry.get().touch();
                trace!(monitor = %key, "Monitor was created concurrently");
            }
            Entry::Vacant(entry) => {
                let monitor = Arc::new(Monitor::new(key.clone()));
                monitor.start(&self.runtime, self.monitor_context());
                entry.insert(monitor);
                debug!(monitor = %key, "Monitor created");
            }
        }

        // The health check may have been removed, or the service shut down,
        // between the checks above and the insert.
        if self.disposed.load(Ordering::Acquire)
            || !self.health_checks.contains_key(key.health_check())
        {
            if let Some((_, monitor)) = self.monitors.remove(&key) {
                self.runtime.spawn(async move { monitor.dispose().await });
            }
        }

        HealthCheckResponse::unknown()
    }

    fn visible_response(&self, monitor: &Monitor) -> HealthCheckResponse {
        let state = monitor.snapshot();
        let overlay = self.maintenance.read();
        if !overlay.is_empty() && overlay.any_under_maintenance(&state.addresses) {
            return HealthCheckResponse::failed(UNDER_MAINTENANCE);
        }
        state.response
    }

    /// Configured health checks, sorted by name.
    pub fn health_checks(&self) -> Vec<HealthCheckConfig> {
        let mut configs: Vec<HealthCheckConfig> = self
            .health_checks
            .iter()
            .map(|entry| entry.value().config())
            .collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        configs
    }

    pub fn email_alerts(&self) -> Vec<EmailAlertConfig> {
        let mut configs: Vec<EmailAlertConfig> = self
            .email_alerts
            .iter()
            .map(|entry| entry.value().config())
            .collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        configs
    }

    pub fn web_hooks(&self) -> Vec<WebHookConfig> {
        let mut configs: Vec<WebHookConfig> = self
            .web_hooks
            .iter()
            .map(|entry| entry.value().config())
            .collect();
        configs.sort_by(|a, b| a.name.cmp(&b.name));
        configs
    }

    pub fn under_maintenance(&self) -> Vec<MaintenanceEntry> {
        self.maintenance.read().entries()
    }

    /// Live Monitors, sorted by key.
    pub fn monitors(&self) -> Vec<MonitorInfo> {
        let now = Instant::now();
        let mut monitors: Vec<MonitorInfo> = self
            .monitors
            .iter()
            .map(|entry| {
                let monitor = entry.value();
                let state = monitor.snapshot();
                MonitorInfo {
                    key: monitor.key().clone(),
                    response: state.response,
                    visible: self.visible_response(monitor),
                    addresses: state.addresses,
                    idle_secs: now.saturating_duration_since(monitor.last_access()).as_secs(),
                }
            })
            .collect();
        monitors.sort_by_key(|info| info.key.to_string());
        monitors
    }

    pub fn monitor(&self, key: &MonitorKey) -> Option<Arc<Monitor>> {
        self.monitors.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    /// Runs a reaper sweep now, returning how many Monitors were retired.
    pub async fn sweep_expired(&self) -> usize {
        sweep_expired(&self.monitors, Instant::now(), self.options.monitor_expiry).await
    }

    pub fn is_shut_down(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Stops the reaper and disposes Monitors, health checks and alert
    /// sinks, in that order. Only the first call does anything.
    pub async fn shutdown(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let reaper = self.reaper.lock().take();
        if let Some(reaper) = reaper {
            reaper.stop().await;
        }

        let keys: Vec<MonitorKey> = self
            .monitors
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for key in keys {
            if let Some((_, monitor)) = self.monitors.remove(&key) {
                monitor.dispose().await;
            }
        }

        self.health_checks.clear();
        self.email_alerts.clear();
        self.web_hooks.clear();
        self.maintenance.write().replace(&[]);

        info!("Health service shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_sections_are_optional() {
        let config = FailoverConfig::from_json("{}").unwrap();
        assert_eq!(config, FailoverConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_names_default_to_default() {
        let config = FailoverConfig::from_json(
            r#"{
                "healthChecks": [ { "interval": 30 } ],
                "webHooks": [ { "enabled": false } ],
                "emailAlerts": [ { } ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.health_checks[0].name, "default");
        assert_eq!(config.health_checks[0].interval, 30);
        assert_eq!(config.health_checks[0].retries, 3);
        assert_eq!(config.web_hooks[0].name, "default");
        assert_eq!(config.email_alerts[0].name, "default");
    }

    #[test]
    fn camel_case_fields_are_accepted() {
        let config = FailoverConfig::from_json(
            r#"{
                "healthChecks": [
                    { "name": "web", "url": "https://example.com/", "emailAlert": "ops", "webHook": "hook" }
                ],
                "underMaintenance": [ { "network": "192.0.2.0/24", "enable": true } ]
            }"#,
        )
        .unwrap();

        let check = &config.health_checks[0];
        assert_eq!(check.email_alert.as_deref(), Some("ops"));
        assert_eq!(check.web_hook.as_deref(), Some("hook"));
        assert_eq!(config.under_maintenance.len(), 1);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let config = FailoverConfig::from_json(
            r#"{ "healthChecks": [ { "name": "web" }, { "name": "web" } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::DuplicateName { section: "health check", .. })
        ));

        let config = FailoverConfig::from_json(
            r#"{ "underMaintenance": [
                { "network": "10.0.0.0/8", "enable": true },
                { "network": "10.1.0.0/8", "enable": false }
            ] }"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::DuplicateNetwork(_))
        ));
    }

    #[test]
    fn malformed_sections_fail_to_parse() {
        assert!(FailoverConfig::from_json(r#"{ "healthChecks": [ { "port": "eighty" } ] }"#).is_err());
        assert!(
            FailoverConfig::from_json(r#"{ "underMaintenance": [ { "network": "10.0.0.0/99", "enable": true } ] }"#)
                .is_err()
        );
    }

    #[test]
    fn service_requires_a_runtime() {
        assert!(matches!(
            HealthService::new(ServiceOptions::default()),
            Err(ServiceError::NoRuntime)
        ));
    }

    #[tokio::test]
    async fn options_are_kept_as_given() {
        let options = ServiceOptions {
            monitor_expiry: Duration::from_secs(120),
            reaper_interval: Duration::from_secs(30),
        };
        let service = HealthService::new(options).unwrap();
        assert_eq!(service.options(), options);
        service.shutdown().await;
    }
}
