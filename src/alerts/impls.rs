// Standard library
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// 3rd party crates
use async_trait::async_trait;
use dashmap::DashMap;
use futures::{stream::FuturesUnordered, StreamExt};
use parking_lot::RwLock;
use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

// Project imports
use crate::health::constants::USER_AGENT;
use crate::health::types::HealthCheckConfig;
use crate::settings::errors::ValidationError;

use super::constants::WEB_HOOK_TIMEOUT_SECS;
use super::errors::AlertError;
use super::traits::{AlertSink, MailTransport};
use super::types::{
    AlertDispatcher, AlertEvent, EmailAlert, EmailAlertConfig, EmailMessage, LogMailTransport,
    WebHook, WebHookConfig,
};

impl EmailAlertConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName("email alert"));
        }

        if self.enabled && self.alert_to.is_empty() {
            return Err(ValidationError::MissingRecipients(self.name.clone()));
        }

        Ok(())
    }
}

impl WebHookConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName("web hook"));
        }

        if self.enabled && self.urls.is_empty() {
            warn!(web_hook = %self.name, "Web hook is enabled but has no URLs");
        }

        Ok(())
    }
}

impl EmailAlert {
    pub fn new(config: EmailAlertConfig, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            name: config.name.clone(),
            config: RwLock::new(config),
            transport,
        }
    }

    pub fn config(&self) -> EmailAlertConfig {
        self.config.read().clone()
    }

    pub fn reload(&self, config: EmailAlertConfig) {
        *self.config.write() = config;
        debug!(email_alert = %self.name, "Email alert reloaded");
    }

    /// Renders the mail sent for `event`.
    pub fn render(&self, event: &AlertEvent) -> EmailMessage {
        let config = self.config.read();

        let subject = format!(
            "DNS Failover Alert: {} is {}",
            event.target, event.status
        );

        let mut body = format!(
            "Health check '{}' reports {} as {} (was {}) at {}.\r\n",
            event.health_check,
            event.target,
            event.status,
            event.previous_status,
            event.date_time.to_rfc2822()
        );
        if let Some(message) = &event.message {
            body.push_str(&format!("\r\nReason: {}\r\n", message));
        }

        EmailMessage {
            smtp_server: config.smtp_server.clone(),
            smtp_port: config.smtp_port,
            from: config.mail_from.clone(),
            to: config.alert_to.clone(),
            subject,
            body,
        }
    }
}

#[async_trait]
impl AlertSink for EmailAlert {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.config.read().enabled
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), AlertError> {
        let message = self.render(event);
        if message.to.is_empty() {
            return Err(AlertError::NoRecipients(self.name.clone()));
        }
        self.transport.send_mail(&message).await
    }
}

impl fmt::Debug for EmailAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailAlert")
            .field("name", &self.name)
            .field("config", &*self.config.read())
            .finish()
    }
}

#[async_trait]
impl MailTransport for LogMailTransport {
    async fn send_mail(&self, message: &EmailMessage) -> Result<(), AlertError> {
        info!(
            to = ?message.to,
            smtp_server = ?message.smtp_server,
            "📧 {}",
            message.subject
        );
        Ok(())
    }
}

impl WebHook {
    pub fn new(config: WebHookConfig) -> Result<Self, AlertError> {
        let client: Client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(WEB_HOOK_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(web_hook = %config.name, "Failed to build HTTP client: {}", e);
                AlertError::HttpClientBuild(e)
            })?;

        Ok(Self {
            name: config.name.clone(),
            config: RwLock::new(config),
            client,
        })
    }

    pub fn config(&self) -> WebHookConfig {
        self.config.read().clone()
    }

    pub fn reload(&self, config: WebHookConfig) {
        *self.config.write() = config;
        debug!(web_hook = %self.name, "Web hook reloaded");
    }

    async fn post(&self, url: &url::Url, event: &AlertEvent) -> Result<(), AlertError> {
        let response = self
            .client
            .post(url.clone())
            .json(event)
            .send()
            .await
            .map_err(|error| AlertError::Http {
                url: url.to_string(),
                error,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl AlertSink for WebHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.config.read().enabled
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), AlertError> {
        let urls = self.config.read().urls.clone();
        let total = urls.len();

        let mut deliveries: FuturesUnordered<_> =
            urls.iter().map(|url| self.post(url, event)).collect();

        let mut errors: Vec<AlertError> = Vec::new();
        while let Some(result) = deliveries.next().await {
            if let Err(e) = result {
                errors.push(e);
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 if total == 1 => Err(errors.remove(0)),
            failed => {
                for e in &errors {
                    warn!(web_hook = %self.name, error = %e, "Web hook delivery failed");
                }
                Err(AlertError::Partial(failed, total))
            }
        }
    }
}

impl fmt::Debug for WebHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebHook")
            .field("name", &self.name)
            .field("config", &*self.config.read())
            .finish()
    }
}

impl AlertDispatcher {
    pub fn new(
        email_alerts: Arc<DashMap<String, Arc<EmailAlert>>>,
        web_hooks: Arc<DashMap<String, Arc<WebHook>>>,
    ) -> Self {
        Self {
            email_alerts,
            web_hooks,
        }
    }

    /// Enabled sinks referenced by `health_check`, resolved by name now so
    /// reloaded or removed sinks take effect immediately.
    fn sinks_for(&self, health_check: &HealthCheckConfig) -> Vec<Arc<dyn AlertSink>> {
        let mut sinks: Vec<Arc<dyn AlertSink>> = Vec::new();

        if let Some(name) = &health_check.email_alert {
            match self.email_alerts.get(name) {
                Some(alert) => sinks.push(Arc::clone(alert.value()) as Arc<dyn AlertSink>),
                None => warn!(
                    health_check = %health_check.name,
                    "No such email alert: {}",
                    name
                ),
            }
        }

        if let Some(name) = &health_check.web_hook {
            match self.web_hooks.get(name) {
                Some(hook) => sinks.push(Arc::clone(hook.value()) as Arc<dyn AlertSink>),
                None => warn!(
                    health_check = %health_check.name,
                    "No such web hook: {}",
                    name
                ),
            }
        }

        sinks.retain(|sink| sink.is_enabled());
        sinks
    }

    /// Fans `event` out to the sinks of `health_check` in the background.
    ///
    /// Returns the delivery task, or `None` when no enabled sink is attached.
    pub fn notify(
        &self,
        health_check: &HealthCheckConfig,
        event: AlertEvent,
    ) -> Option<JoinHandle<()>> {
        let sinks = self.sinks_for(health_check);
        if sinks.is_empty() {
            return None;
        }

        Some(tokio::spawn(async move {
            let mut deliveries: FuturesUnordered<_> = sinks
                .iter()
                .map(|sink| {
                    let event = &event;
                    async move { (sink.name().to_string(), sink.send(event).await) }
                })
                .collect();

            while let Some((sink, result)) = deliveries.next().await {
                match result {
                    Ok(()) => debug!(%sink, monitor = %event.monitor, "Alert delivered"),
                    Err(e) => error!(%sink, monitor = %event.monitor, "Alert delivery failed: {}", e),
                }
            }
        }))
    }
}
