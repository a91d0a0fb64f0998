//! Hand-off point to whatever actually sends alerts.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Alert;

/// Receives admitted alerts. The transport (webhook, mail, ...) is up to
/// the implementor.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: &Alert) -> Result<()>;
}

/// Sink that logs and keeps every alert it receives.
#[derive(Debug, Default)]
pub struct CollectingAlertSink {
    alerts: Mutex<Vec<Alert>>,
}

impl CollectingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts received so far, in delivery order.
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Remove and return the received alerts.
    pub fn take(&self) -> Vec<Alert> {
        std::mem::take(&mut *self.alerts.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[async_trait]
impl AlertSink for CollectingAlertSink {
    async fn deliver(&self, alert: &Alert) -> Result<()> {
        log::info!("Alert: {} -> {}", alert.text, alert.link);
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(alert.clone());
        Ok(())
    }
}
