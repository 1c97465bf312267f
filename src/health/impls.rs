// Standard library
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

// 3rd party crates
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use reqwest::header::HOST;
use reqwest::Client;
use tokio::net::TcpStream;
use tracing::{debug, trace};
use url::{Host, Url};

// Project imports
use crate::monitor::types::RecordType;
use crate::settings::errors::ValidationError;

use super::constants::{RETRY_DELAY_MS, USER_AGENT};
use super::errors::ProbeError;
use super::traits::{Prober, Resolver};
use super::types::{
    HealthCheck, HealthCheckConfig, HealthCheckResponse, HealthStatus, NetworkProber,
    ProbeRequest, ProbeTarget, SystemResolver,
};

impl HealthCheckResponse {
    pub fn new(status: HealthStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            date_time: Utc::now(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(HealthStatus::Unknown, None)
    }

    pub fn healthy() -> Self {
        Self::new(HealthStatus::Healthy, None)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Failed, Some(message.into()))
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// When the response was produced.
    pub fn date_time(&self) -> DateTime<Utc> {
        self.date_time
    }
}

impl fmt::Display for HealthCheckResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.status, message),
            None => write!(f, "{}", self.status),
        }
    }
}

impl ProbeTarget {
    /// The address the attempt connects to.
    pub fn address(&self) -> IpAddr {
        match self {
            ProbeTarget::Address(address) => *address,
            ProbeTarget::Domain { address, .. } => *address,
        }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeTarget::Address(address) => write!(f, "{}", address),
            ProbeTarget::Domain {
                domain,
                record_type,
                address,
            } => write!(f, "{} {} ({})", domain, record_type, address),
        }
    }
}

impl HealthCheckConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName("health check"));
        }

        if self.interval == 0 {
            return Err(ValidationError::ZeroValue {
                health_check: self.name.clone(),
                field: "interval",
            });
        }

        if self.timeout == 0 {
            return Err(ValidationError::ZeroValue {
                health_check: self.name.clone(),
                field: "timeout",
            });
        }

        if self.retries == 0 {
            return Err(ValidationError::ZeroValue {
                health_check: self.name.clone(),
                field: "retries",
            });
        }

        if let Some(url) = &self.url {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ValidationError::InvalidUrl {
                    health_check: self.name.clone(),
                    url: url.to_string(),
                });
            }
        }

        Ok(())
    }
}

impl HealthCheck {
    pub fn new(config: HealthCheckConfig, prober: Arc<dyn Prober>) -> Self {
        Self {
            name: config.name.clone(),
            config: RwLock::new(config),
            prober,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the current parameters.
    pub fn config(&self) -> HealthCheckConfig {
        self.config.read().clone()
    }

    pub fn interval(&self) -> Duration {
        self.config.read().interval()
    }

    /// Replaces the parameters while keeping the identity of the check.
    pub fn reload(&self, config: HealthCheckConfig) {
        let mut current = self.config.write();
        if *current != config {
            debug!(health_check = %self.name, "Health check parameters reloaded");
            *current = config;
        }
    }

    /// Runs one probe cycle against `target`.
    ///
    /// Up to `retries` attempts are made; the first success wins. Every
    /// failure is converted into a `Failed` response carrying the reason of
    /// the last attempt.
    pub async fn execute(&self, target: ProbeTarget, url: Option<&Url>) -> HealthCheckResponse {
        let config = self.config();
        let request = ProbeRequest {
            target,
            url: url.cloned().or(config.url.clone()),
            port: config.port,
            timeout: config.timeout(),
        };

        let attempts = config.retries.max(1);
        let mut last_error: Option<ProbeError> = None;

        for attempt in 1..=attempts {
            let started = Instant::now();
            let outcome = match tokio::time::timeout(request.timeout, self.prober.probe(&request))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(ProbeError::Timeout(started.elapsed().as_millis())),
            };

            match outcome {
                Ok(()) => {
                    trace!(
                        health_check = %self.name,
                        target = %request.target,
                        attempt,
                        "Probe succeeded"
                    );
                    return HealthCheckResponse::healthy();
                }
                Err(e) => {
                    debug!(
                        health_check = %self.name,
                        target = %request.target,
                        attempt,
                        error = %e,
                        "Probe attempt failed"
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS)).await;
                    }
                }
            }
        }

        match last_error {
            Some(e) => HealthCheckResponse::failed(e.to_string()),
            None => HealthCheckResponse::failed("Probe did not run"),
        }
    }
}

impl fmt::Debug for HealthCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthCheck")
            .field("name", &self.name)
            .field("config", &*self.config.read())
            .finish()
    }
}

impl Default for NetworkProber {
    fn default() -> Self {
        Self::new(USER_AGENT)
    }
}

impl NetworkProber {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            clients: Arc::new(DashMap::new()),
        }
    }

    async fn tcp_probe(
        &self,
        address: IpAddr,
        port: u16,
        timeout: Duration,
    ) -> Result<(), ProbeError> {
        let started = Instant::now();
        match tokio::time::timeout(timeout, TcpStream::connect(SocketAddr::new(address, port)))
            .await
        {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(error)) => Err(ProbeError::Connect {
                address,
                port,
                error,
            }),
            Err(_) => Err(ProbeError::Timeout(started.elapsed().as_millis())),
        }
    }

    /// Client whose DNS lookups of `host` resolve to `socket`, or a plain
    /// client when the URL names an IP literal.
    fn client_for(&self, host: Option<&str>, socket: SocketAddr) -> Result<Client, reqwest::Error> {
        let key = (host.map(str::to_string), socket);
        if let Some(client) = self.clients.get(&key) {
            return Ok(client.value().clone());
        }

        let mut builder = Client::builder().user_agent(self.user_agent.as_str());
        if let Some(host) = host {
            builder = builder.resolve(host, socket);
        }
        let client = builder.build()?;

        Ok(self.clients.entry(key).or_insert(client).value().clone())
    }

    /// GETs `url` against `address`, so every resolved address of a target
    /// is probed on its own.
    ///
    /// Domain hosts are pinned through the client's resolver. IP literal
    /// hosts are swapped for `address` while the `Host` header keeps the
    /// original authority.
    async fn http_probe(
        &self,
        url: &Url,
        address: IpAddr,
        timeout: Duration,
    ) -> Result<(), ProbeError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProbeError::UnsupportedScheme(url.scheme().to_string()));
        }

        let host = url
            .host()
            .ok_or_else(|| ProbeError::MissingHost(url.to_string()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ProbeError::UnsupportedScheme(url.scheme().to_string()))?;
        let socket = SocketAddr::new(address, port);

        let request = match host {
            Host::Domain(domain) => self
                .client_for(Some(domain), socket)
                .map_err(|error| ProbeError::Http {
                    url: url.to_string(),
                    error,
                })?
                .get(url.clone()),
            Host::Ipv4(_) | Host::Ipv6(_) => {
                let authority = match (url.host_str(), url.port()) {
                    (Some(host), Some(port)) => format!("{}:{}", host, port),
                    (Some(host), None) => host.to_string(),
                    (None, _) => return Err(ProbeError::MissingHost(url.to_string())),
                };

                let mut pinned = url.clone();
                pinned
                    .set_ip_host(address)
                    .map_err(|_| ProbeError::MissingHost(url.to_string()))?;

                self.client_for(None, socket)
                    .map_err(|error| ProbeError::Http {
                        url: url.to_string(),
                        error,
                    })?
                    .get(pinned)
                    .header(HOST, authority)
            }
        };

        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|error| ProbeError::Http {
                url: url.to_string(),
                error,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn probe(&self, request: &ProbeRequest) -> Result<(), ProbeError> {
        let address = request.target.address();
        match &request.url {
            Some(url) => self.http_probe(url, address, request.timeout).await,
            None => self.tcp_probe(address, request.port, request.timeout).await,
        }
    }
}

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(
        &self,
        domain: &str,
        record_type: RecordType,
    ) -> Result<Vec<IpAddr>, ProbeError> {
        let resolved = tokio::net::lookup_host((domain, 0))
            .await
            .map_err(|e| ProbeError::Resolve {
                domain: domain.to_string(),
                message: e.to_string(),
            })?;

        let mut addresses: Vec<IpAddr> = Vec::new();
        for socket_address in resolved {
            let address = socket_address.ip();
            if record_type.matches(&address) && !addresses.contains(&address) {
                addresses.push(address);
            }
        }

        if addresses.is_empty() {
            return Err(ProbeError::NoAddress {
                domain: domain.to_string(),
                record_type: record_type.to_string(),
            });
        }

        Ok(addresses)
    }
}
