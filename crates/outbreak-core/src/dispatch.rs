//! Notification dispatcher port and the bundled implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::compose::{AlertMessage, AlertSeverity};
use crate::error::{OutbreakError, OutbreakResult};
use crate::model::CollectiveAlert;

/// Data payload attached to a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub alert_type: String,
    pub alert_id: String,
}

impl NotificationPayload {
    pub fn for_alert(alert: &CollectiveAlert) -> Self {
        NotificationPayload {
            alert_type: alert.alert_type.as_str().to_string(),
            alert_id: alert.id.clone(),
        }
    }
}

/// Delivers one confirmed alert to one destination
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        target: &str,
        payload: &NotificationPayload,
        message: &AlertMessage,
        record: &CollectiveAlert,
    ) -> OutbreakResult<()>;
}

/// Emits each notification as a tracing event
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(
        &self,
        target: &str,
        payload: &NotificationPayload,
        message: &AlertMessage,
        record: &CollectiveAlert,
    ) -> OutbreakResult<()> {
        info!(
            target_destination = target,
            alert_id = payload.alert_id.as_str(),
            alert_type = payload.alert_type.as_str(),
            case_count = record.statistics.case_count,
            title = message.title.as_str(),
            "{}",
            message.body
        );
        Ok(())
    }
}

/// One line of the outbox file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub target: String,
    pub payload: NotificationPayload,
    pub title: String,
    pub body: String,
    pub description: String,
    pub severity: AlertSeverity,
    pub record: CollectiveAlert,
}

/// Appends notifications as JSON lines for a downstream sender to pick up
#[derive(Debug)]
pub struct OutboxDispatcher {
    path: PathBuf,
    // serialises appends from concurrent dispatches
    lock: Mutex<()>,
}

impl OutboxDispatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        OutboxDispatcher {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Parse every entry written so far
    pub fn read_entries(path: &Path) -> OutbreakResult<Vec<OutboxEntry>> {
        let content = std::fs::read_to_string(path)?;
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str::<OutboxEntry>(l).map_err(OutbreakError::from))
            .collect()
    }
}

#[async_trait]
impl NotificationDispatcher for OutboxDispatcher {
    async fn dispatch(
        &self,
        target: &str,
        payload: &NotificationPayload,
        message: &AlertMessage,
        record: &CollectiveAlert,
    ) -> OutbreakResult<()> {
        let entry = OutboxEntry {
            target: target.to_string(),
            payload: payload.clone(),
            title: message.title.clone(),
            body: message.body.clone(),
            description: message.description.clone(),
            severity: message.severity,
            record: record.clone(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
