//! Alert Dispatcher
//!
//! Monitors report every health-state transition here. The dispatcher looks
//! up the email alert and web hook named by the health check and delivers in
//! a detached task, so a slow or failing sink never holds up probing.

pub mod constants;
pub mod errors;
pub mod impls;
pub mod traits;
pub mod types;

pub use errors::AlertError;
pub use traits::{AlertSink, MailTransport};
pub use types::{
    AlertDispatcher, AlertEvent, EmailAlert, EmailAlertConfig, EmailMessage, LogMailTransport,
    WebHook, WebHookConfig,
};
