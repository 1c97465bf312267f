// Standard library
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// 3rd party crates
use async_trait::async_trait;
use parking_lot::Mutex;

// Project imports
use dns_failover::alerts::{AlertError, EmailMessage, MailTransport};
use dns_failover::health::{HealthStatus, ProbeError, ProbeRequest, Prober, Resolver};
use dns_failover::monitor::{MonitorKey, RecordType};
use dns_failover::service::{
    Collaborators, FailoverConfig, HealthService, ServiceError, ServiceOptions,
};

/// Probes succeed for addresses marked healthy and fail for everything else.
#[derive(Default)]
struct ScriptedProber {
    healthy: Mutex<HashMap<IpAddr, bool>>,
    probes: AtomicUsize,
}

impl ScriptedProber {
    fn set(&self, address: &str, healthy: bool) {
        self.healthy.lock().insert(ip(address), healthy);
    }

    fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, request: &ProbeRequest) -> Result<(), ProbeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let address = request.target.address();
        if self.healthy.lock().get(&address).copied().unwrap_or(false) {
            Ok(())
        } else {
            Err(ProbeError::Connect {
                address,
                port: request.port,
                error: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            })
        }
    }
}

#[derive(Default)]
struct ScriptedResolver {
    records: Mutex<HashMap<String, Vec<IpAddr>>>,
}

#[async_trait]
impl Resolver for ScriptedResolver {
    async fn resolve(
        &self,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Vec<IpAddr>, ProbeError> {
        let addresses: Vec<IpAddr> = self
            .records
            .lock()
            .get(domain)
            .map(|addresses| {
                addresses
                    .iter()
                    .copied()
                    .filter(|address| record_type.matches(address))
                    .collect()
            })
            .unwrap_or_default();

        if addresses.is_empty() {
            return Err(ProbeError::NoAddress {
                domain: domain.to_string(),
                record_type: record_type.to_string(),
            });
        }
        Ok(addresses)
    }
}

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send_mail(&self, message: &EmailMessage) -> Result<(), AlertError> {
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

struct Harness {
    service: Arc<HealthService>,
    prober: Arc<ScriptedProber>,
    resolver: Arc<ScriptedResolver>,
    transport: Arc<RecordingTransport>,
}

fn ip(address: &str) -> IpAddr {
    address.parse().unwrap()
}

fn config(json: &str) -> FailoverConfig {
    FailoverConfig::from_json(json).unwrap()
}

const TCP_CHECK: &str = r#"{ "healthChecks": [ { "name": "tcp", "interval": 10, "retries": 1 } ] }"#;

fn harness(options: ServiceOptions) -> Harness {
    let prober = Arc::new(ScriptedProber::default());
    let resolver = Arc::new(ScriptedResolver::default());
    let transport = Arc::new(RecordingTransport::default());

    let service = HealthService::with_collaborators(
        options,
        Collaborators {
            prober: prober.clone(),
            resolver: resolver.clone(),
            mail_transport: transport.clone(),
        },
    )
    .unwrap();

    Harness {
        service: Arc::new(service),
        prober,
        resolver,
        transport,
    }
}

/// Polls `key` without creating Monitors until it reports `status`.
async fn wait_for(service: &HealthService, key: &MonitorKey, status: HealthStatus) {
    let polled = tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            if service.query_status(key.clone(), false).status() == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "{} never became {}", key, status);
}

#[tokio::test(start_paused = true)]
async fn first_query_is_unknown_then_probe_result() {
    let h = harness(ServiceOptions::default());
    h.service.reload(&config(TCP_CHECK)).await.unwrap();
    h.prober.set("192.0.2.1", true);

    let response = h.service.query_address_status(ip("192.0.2.1"), "tcp", None, true);
    assert_eq!(response.status(), HealthStatus::Unknown);
    assert_eq!(h.service.monitor_count(), 1);

    let key = MonitorKey::address("tcp", ip("192.0.2.1"), None);
    wait_for(&h.service, &key, HealthStatus::Healthy).await;

    // Without try_add nothing new is monitored.
    let response = h.service.query_address_status(ip("192.0.2.2"), "tcp", None, false);
    assert_eq!(response.status(), HealthStatus::Unknown);
    assert_eq!(h.service.monitor_count(), 1);

    h.service.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_queries_share_one_monitor() {
    let h = harness(ServiceOptions::default());
    h.service
        .reload(&config(
            r#"{ "healthChecks": [ { "name": "tcp", "interval": 3600, "retries": 1 } ] }"#,
        ))
        .await
        .unwrap();
    h.prober.set("192.0.2.1", true);

    let queries: Vec<_> = (0..16)
        .map(|_| {
            let service = Arc::clone(&h.service);
            tokio::spawn(async move {
                service
                    .query_address_status(ip("192.0.2.1"), "tcp", None, true)
                    .status()
            })
        })
        .collect();

    for query in queries {
        let status = query.await.unwrap();
        assert_ne!(status, HealthStatus::Failed);
    }

    assert_eq!(h.service.monitor_count(), 1);
    let key = MonitorKey::address("tcp", ip("192.0.2.1"), None);
    wait_for(&h.service, &key, HealthStatus::Healthy).await;
    assert!(h.service.monitor(&key).unwrap().is_running());
    assert_eq!(h.prober.probes(), 1);

    h.service.shutdown().await;
}

#[tokio::test]
async fn unknown_health_check_is_reported_without_monitoring() {
    let h = harness(ServiceOptions::default());
    h.service.reload(&config(TCP_CHECK)).await.unwrap();

    for _ in 0..2 {
        let response = h
            .service
            .query_address_status(ip("192.0.2.1"), "missing", None, true);
        assert_eq!(response.status(), HealthStatus::Failed);
        assert_eq!(response.message(), Some("No such health check: missing"));
    }
    assert_eq!(h.service.monitor_count(), 0);
    assert_eq!(h.prober.probes(), 0);

    h.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn removing_a_health_check_disposes_its_monitors() {
    let h = harness(ServiceOptions::default());
    let both = r#"{ "healthChecks": [
        { "name": "a", "interval": 10, "retries": 1 },
        { "name": "b", "interval": 10, "retries": 1 }
    ] }"#;
    h.service.reload(&config(both)).await.unwrap();
    h.prober.set("192.0.2.1", true);

    let a = MonitorKey::address("a", ip("192.0.2.1"), None);
    let b = MonitorKey::address("b", ip("192.0.2.1"), None);
    h.service.query_status(a.clone(), true);
    h.service.query_status(b.clone(), true);
    wait_for(&h.service, &a, HealthStatus::Healthy).await;
    wait_for(&h.service, &b, HealthStatus::Healthy).await;

    let disposed = h.service.monitor(&a).unwrap();
    h.service
        .reload(&config(
            r#"{ "healthChecks": [ { "name": "b", "interval": 10, "retries": 1 } ] }"#,
        ))
        .await
        .unwrap();

    assert!(h.service.monitor(&a).is_none());
    assert!(!disposed.is_running());
    assert!(h.service.monitor(&b).is_some());

    let response = h.service.query_status(a.clone(), false);
    assert_eq!(response.status(), HealthStatus::Failed);
    assert_eq!(response.message(), Some("No such health check: a"));

    // A re-added check starts from scratch.
    h.service.reload(&config(both)).await.unwrap();
    assert_eq!(
        h.service.query_status(a, false).status(),
        HealthStatus::Unknown
    );

    h.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn idle_monitors_are_reaped() {
    let h = harness(ServiceOptions {
        monitor_expiry: Duration::from_secs(60),
        reaper_interval: Duration::from_secs(30),
    });
    h.service.reload(&config(TCP_CHECK)).await.unwrap();

    let idle = MonitorKey::address("tcp", ip("192.0.2.1"), None);
    let busy = MonitorKey::address("tcp", ip("192.0.2.2"), None);
    h.service.query_status(idle.clone(), true);
    h.service.query_status(busy.clone(), true);
    let retired = h.service.monitor(&idle).unwrap();

    for _ in 0..6 {
        tokio::time::sleep(Duration::from_secs(20)).await;
        h.service.query_status(busy.clone(), false);
    }

    assert!(h.service.monitor(&idle).is_none());
    assert!(!retired.is_running());
    assert!(h.service.monitor(&busy).is_some());
    assert_eq!(h.service.monitor_count(), 1);

    h.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn reload_with_same_config_keeps_identity() {
    let h = harness(ServiceOptions::default());
    let failover = config(
        r#"{
            "healthChecks": [ { "name": "tcp", "interval": 10, "retries": 1 } ],
            "webHooks": [ { "name": "hook", "enabled": false, "urls": [] } ],
            "underMaintenance": [ { "network": "198.51.100.0/24", "enable": true } ]
        }"#,
    );
    h.service.reload(&failover).await.unwrap();
    h.prober.set("192.0.2.1", true);

    let key = MonitorKey::address("tcp", ip("192.0.2.1"), None);
    h.service.query_status(key.clone(), true);
    wait_for(&h.service, &key, HealthStatus::Healthy).await;
    let before = h.service.monitor(&key).unwrap();
    let checks = h.service.health_checks();

    h.service.reload(&failover).await.unwrap();

    let after = h.service.monitor(&key).unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(after.is_running());
    assert_eq!(h.service.health_checks(), checks);
    assert_eq!(h.service.web_hooks().len(), 1);
    assert_eq!(h.service.under_maintenance(), failover.under_maintenance);
    assert_eq!(
        h.service.query_status(key, false).status(),
        HealthStatus::Healthy
    );

    h.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn maintenance_overrides_the_visible_verdict() {
    let h = harness(ServiceOptions::default());
    h.service.reload(&config(TCP_CHECK)).await.unwrap();
    h.prober.set("10.1.2.3", true);

    let key = MonitorKey::address("tcp", ip("10.1.2.3"), None);
    h.service.query_status(key.clone(), true);
    wait_for(&h.service, &key, HealthStatus::Healthy).await;

    let mut failover = config(TCP_CHECK);
    failover.under_maintenance = config(
        r#"{ "underMaintenance": [ { "network": "10.0.0.0/8", "enable": true } ] }"#,
    )
    .under_maintenance;
    h.service.reload(&failover).await.unwrap();

    let response = h.service.query_status(key.clone(), false);
    assert_eq!(response.status(), HealthStatus::Failed);
    assert_eq!(response.message(), Some("Under maintenance"));

    let info = h.service.monitors().remove(0);
    assert_eq!(info.response.status(), HealthStatus::Healthy);
    assert_eq!(info.visible.status(), HealthStatus::Failed);

    // A narrower disabled entry keeps the target in service.
    failover.under_maintenance = config(
        r#"{ "underMaintenance": [
            { "network": "10.0.0.0/8", "enable": true },
            { "network": "10.1.0.0/16", "enable": false }
        ] }"#,
    )
    .under_maintenance;
    h.service.reload(&failover).await.unwrap();
    assert_eq!(
        h.service.query_status(key.clone(), false).status(),
        HealthStatus::Healthy
    );

    h.service.reload(&config(TCP_CHECK)).await.unwrap();
    assert!(h.service.under_maintenance().is_empty());
    assert_eq!(
        h.service.query_status(key, false).status(),
        HealthStatus::Healthy
    );

    h.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn domain_stays_under_maintenance_when_resolution_fails() {
    let h = harness(ServiceOptions::default());
    let mut failover = config(TCP_CHECK);
    failover.under_maintenance = config(
        r#"{ "underMaintenance": [ { "network": "10.0.0.0/8", "enable": true } ] }"#,
    )
    .under_maintenance;
    h.service.reload(&failover).await.unwrap();

    h.resolver
        .records
        .lock()
        .insert("example.com".to_string(), vec![ip("10.1.2.3")]);
    h.prober.set("10.1.2.3", true);

    let key = MonitorKey::domain("tcp", "example.com", RecordType::A, None);
    h.service.query_status(key.clone(), true);
    wait_for(&h.service, &key, HealthStatus::Failed).await;
    assert_eq!(
        h.service.monitor(&key).unwrap().addresses(),
        vec![ip("10.1.2.3")]
    );

    h.resolver.records.lock().clear();
    tokio::time::sleep(Duration::from_secs(25)).await;

    let info = h.service.monitors().remove(0);
    assert_eq!(info.response.status(), HealthStatus::Failed);
    assert_eq!(
        info.response.message(),
        Some("No A address found for example.com")
    );
    assert_eq!(info.addresses, vec![ip("10.1.2.3")]);

    let response = h.service.query_status(key, false);
    assert_eq!(response.status(), HealthStatus::Failed);
    assert_eq!(response.message(), Some("Under maintenance"));

    h.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn every_transition_sends_one_alert() {
    let h = harness(ServiceOptions::default());
    h.service
        .reload(&config(
            r#"{
                "emailAlerts": [
                    { "name": "ops", "enabled": true, "alertTo": ["ops@example.com"] }
                ],
                "healthChecks": [
                    { "name": "tcp", "interval": 10, "retries": 1, "emailAlert": "ops" }
                ]
            }"#,
        ))
        .await
        .unwrap();

    let key = MonitorKey::address("tcp", ip("192.0.2.10"), None);
    h.prober.set("192.0.2.10", true);
    h.service.query_status(key.clone(), true);
    wait_for(&h.service, &key, HealthStatus::Healthy).await;

    h.prober.set("192.0.2.10", false);
    wait_for(&h.service, &key, HealthStatus::Failed).await;

    h.prober.set("192.0.2.10", true);
    wait_for(&h.service, &key, HealthStatus::Healthy).await;

    // Steady state after the last transition sends nothing more.
    tokio::time::sleep(Duration::from_secs(60)).await;

    let sent = h.transport.sent.lock().clone();
    assert_eq!(sent.len(), 3);
    assert!(sent[0].subject.contains("192.0.2.10 is Healthy"));
    assert!(sent[1].subject.contains("192.0.2.10 is Failed"));
    assert!(sent[1].body.contains("Reason:"));
    assert!(sent[2].subject.contains("192.0.2.10 is Healthy"));
    assert_eq!(sent[2].to, vec!["ops@example.com".to_string()]);

    h.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn domains_are_resolved_and_first_healthy_address_wins() {
    let h = harness(ServiceOptions::default());
    h.service.reload(&config(TCP_CHECK)).await.unwrap();
    h.resolver.records.lock().insert(
        "example.com".to_string(),
        vec![ip("192.0.2.20"), ip("192.0.2.21"), ip("2001:db8::1")],
    );
    h.prober.set("192.0.2.21", true);

    let response = h
        .service
        .query_domain_status("Example.COM", RecordType::A, "tcp", None, true);
    assert_eq!(response.status(), HealthStatus::Unknown);

    let key = MonitorKey::domain("tcp", "example.com", RecordType::A, None);
    wait_for(&h.service, &key, HealthStatus::Healthy).await;
    assert_eq!(
        h.service.monitor(&key).unwrap().addresses(),
        vec![ip("192.0.2.20"), ip("192.0.2.21")]
    );

    let missing = MonitorKey::domain("tcp", "nowhere.example", RecordType::Aaaa, None);
    h.service.query_status(missing.clone(), true);
    wait_for(&h.service, &missing, HealthStatus::Failed).await;

    h.service.shutdown().await;
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let h = harness(ServiceOptions::default());
    h.service.reload(&config(TCP_CHECK)).await.unwrap();
    h.service
        .query_address_status(ip("192.0.2.1"), "tcp", None, true);
    let monitor = h
        .service
        .monitor(&MonitorKey::address("tcp", ip("192.0.2.1"), None))
        .unwrap();

    h.service.shutdown().await;
    assert!(h.service.is_shut_down());
    assert!(!monitor.is_running());
    assert_eq!(h.service.monitor_count(), 0);
    assert!(h.service.health_checks().is_empty());

    h.service.shutdown().await;
    assert!(matches!(
        h.service.reload(&config(TCP_CHECK)).await,
        Err(ServiceError::ShutDown)
    ));
    assert_eq!(
        h.service
            .query_address_status(ip("192.0.2.1"), "tcp", None, true)
            .status(),
        HealthStatus::Failed
    );
    assert_eq!(h.service.monitor_count(), 0);
}
