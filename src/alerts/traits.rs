// 3rd party crates
use async_trait::async_trait;

use super::errors::AlertError;
use super::types::{AlertEvent, EmailMessage};

/// A named destination for health-state transition notifications.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Name the sink is registered under.
    fn name(&self) -> &str;

    /// Disabled sinks are skipped by the dispatcher but keep their
    /// configuration.
    fn is_enabled(&self) -> bool;

    /// Delivers one notification.
    async fn send(&self, event: &AlertEvent) -> Result<(), AlertError>;
}

/// Wire-level mail delivery, provided by the host.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send_mail(&self, message: &EmailMessage) -> Result<(), AlertError>;
}
