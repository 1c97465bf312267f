// Standard library
use std::sync::Arc;

// 3rd party crates
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

// Project imports
use crate::health::constants::default_health_check_name;
use crate::health::types::HealthStatus;

use super::constants::default_smtp_port;
use super::traits::MailTransport;

/// A health-state transition of one monitored target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub health_check: String,
    /// Stable identity of the Monitor that observed the transition.
    pub monitor: String,
    /// Human readable target, e.g. `192.0.2.1` or `example.com A (192.0.2.1)`.
    pub target: String,
    pub previous_status: HealthStatus,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub date_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAlertConfig {
    #[serde(default = "default_health_check_name")]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, alias = "alertTo")]
    pub alert_to: Vec<String>,
    #[serde(default, alias = "smtpServer")]
    pub smtp_server: Option<String>,
    #[serde(default = "default_smtp_port", alias = "smtpPort")]
    pub smtp_port: u16,
    #[serde(default, alias = "mailFrom")]
    pub mail_from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebHookConfig {
    #[serde(default = "default_health_check_name")]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub urls: Vec<Url>,
}

/// A rendered alert mail handed to a [`MailTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub smtp_server: Option<String>,
    pub smtp_port: u16,
    pub from: Option<String>,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Sends transition notifications by mail through a pluggable transport.
pub struct EmailAlert {
    pub(super) name: String,
    pub(super) config: RwLock<EmailAlertConfig>,
    pub(super) transport: Arc<dyn MailTransport>,
}

/// POSTs transition notifications as JSON to a list of URLs.
pub struct WebHook {
    pub(super) name: String,
    pub(super) config: RwLock<WebHookConfig>,
    pub(super) client: Client,
}

/// Mail transport that only writes the message to the log.
#[derive(Debug, Clone, Default)]
pub struct LogMailTransport;

/// Routes transitions to the alert sinks named by a health check.
#[derive(Clone)]
pub struct AlertDispatcher {
    pub(super) email_alerts: Arc<DashMap<String, Arc<EmailAlert>>>,
    pub(super) web_hooks: Arc<DashMap<String, Arc<WebHook>>>,
}
