use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use sea_orm::{DatabaseConnection, DbErr};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::db::entities::channel;
use crate::db::enums::ChannelStatus;
use crate::db::services::{find_status_subscribers, StatusChange};
use crate::queue::{JobQueue, QueueError, WebhookJob};

pub const STATUS_HOOK_TYPE: &str = "hookSessionStatus";

#[derive(Error, Debug)]
pub enum HookError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),
    #[error("Queue error: {0}")]
    QueueError(#[from] QueueError),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Body posted to `url_service_status` when a session changes state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatusPayload {
    pub name: Option<String>,
    pub number: Option<String>,
    pub status: ChannelStatus,
    pub timestamp: i64,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// Fans a channel status transition out to the tenant's API integrations.
pub struct StatusHook {
    db: Arc<DatabaseConnection>,
    queue: JobQueue,
    locale: String,
}

impl StatusHook {
    pub fn new(db: Arc<DatabaseConnection>, queue: JobQueue, locale: impl Into<String>) -> Self {
        Self {
            db,
            queue,
            locale: locale.into(),
        }
    }

    pub fn should_notify(change: &StatusChange) -> bool {
        change.changed() && change.current.status.is_hooked()
    }

    pub fn status_message(status: ChannelStatus, locale: &str) -> Option<String> {
        let key = match status {
            ChannelStatus::Destroyed => "session_status.destroyed",
            ChannelStatus::Disconnected => "session_status.disconnected",
            ChannelStatus::Connected => "session_status.connected",
            _ => return None,
        };
        Some(t!(key, locale = locale).into_owned())
    }

    pub fn build_payload(&self, channel: &channel::Model, timestamp_ms: i64) -> SessionStatusPayload {
        SessionStatusPayload {
            name: channel.name.clone(),
            number: channel.number.clone(),
            status: channel.status,
            timestamp: timestamp_ms,
            msg: Self::status_message(channel.status, &self.locale).unwrap_or_default(),
            kind: STATUS_HOOK_TYPE,
        }
    }

    /// Queues one `WebHooksAPI` job per subscribed integration and returns how
    /// many were queued. Transitions into non-hooked statuses, and writes that
    /// did not change the status, queue nothing.
    pub async fn on_status_change(&self, change: &StatusChange) -> Result<usize, HookError> {
        if !Self::should_notify(change) {
            return Ok(0);
        }

        let channel = &change.current;
        let subscribers = find_status_subscribers(self.db.as_ref(), channel.tenant_id, channel.id).await?;
        if subscribers.is_empty() {
            debug!(channel_id = channel.id, "No status subscribers for channel.");
            return Ok(0);
        }

        let payload = serde_json::to_value(self.build_payload(channel, Utc::now().timestamp_millis()))?;
        let jobs: Vec<WebhookJob> = subscribers
            .into_iter()
            .filter_map(|api| api.url_service_status.filter(|url| !url.is_empty()))
            .map(|url| WebhookJob {
                url,
                kind: STATUS_HOOK_TYPE.to_string(),
                payload: payload.clone(),
            })
            .collect();

        let results = join_all(jobs.into_iter().map(|job| self.queue.add(job))).await;
        let queued = results.into_iter().collect::<Result<Vec<_>, _>>()?.len();

        info!(
            channel_id = channel.id,
            tenant_id = channel.tenant_id,
            status = %channel.status,
            queued,
            "Session status hook queued."
        );
        Ok(queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::ChannelType;
    use crate::test_support::{sample_api_config, sample_channel};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn change(previous: ChannelStatus, current: ChannelStatus) -> StatusChange {
        StatusChange {
            previous,
            current: sample_channel(10, ChannelType::Whatsapp, current),
        }
    }

    #[test]
    fn notifies_only_on_changed_hooked_status() {
        assert!(StatusHook::should_notify(&change(ChannelStatus::Opening, ChannelStatus::Connected)));
        assert!(StatusHook::should_notify(&change(ChannelStatus::Connected, ChannelStatus::Destroyed)));
        assert!(!StatusHook::should_notify(&change(ChannelStatus::Connected, ChannelStatus::Connected)));
        assert!(!StatusHook::should_notify(&change(ChannelStatus::Connected, ChannelStatus::Qrcode)));
        assert!(!StatusHook::should_notify(&change(ChannelStatus::Qrcode, ChannelStatus::Opening)));
    }

    #[test]
    fn messages_are_localized() {
        let pt = StatusHook::status_message(ChannelStatus::Connected, "pt-BR").unwrap();
        let en = StatusHook::status_message(ChannelStatus::Connected, "en").unwrap();
        assert_eq!(pt, "Sessão conectada.");
        assert_eq!(en, "Session connected.");
        assert!(StatusHook::status_message(ChannelStatus::Opening, "en").is_none());
    }

    #[tokio::test]
    async fn unchanged_status_skips_the_database() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let (queue, _receiver) = JobQueue::new(4);
        let hook = StatusHook::new(Arc::new(db), queue, "en");

        let queued = hook
            .on_status_change(&change(ChannelStatus::Connected, ChannelStatus::Connected))
            .await
            .unwrap();
        assert_eq!(queued, 0);
    }

    #[tokio::test]
    async fn queues_one_job_per_subscriber_with_url() {
        let mut without_url = sample_api_config(2, 10);
        without_url.url_service_status = None;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_api_config(1, 10), without_url]])
            .into_connection();
        let (queue, mut receiver) = JobQueue::new(4);
        let hook = StatusHook::new(Arc::new(db), queue, "pt-BR");

        let queued = hook
            .on_status_change(&change(ChannelStatus::Opening, ChannelStatus::Disconnected))
            .await
            .unwrap();
        assert_eq!(queued, 1);

        let job = receiver.recv().await.unwrap();
        assert_eq!(job.data.url, "https://tenant.example.com/status/1");
        assert_eq!(job.data.kind, STATUS_HOOK_TYPE);
        assert_eq!(job.data.payload["status"], "DISCONNECTED");
        assert_eq!(job.data.payload["type"], STATUS_HOOK_TYPE);
        assert_eq!(job.data.payload["name"], "channel-10");
        assert!(job.data.payload["msg"].as_str().unwrap().starts_with("Desconectado por"));
        assert!(receiver.try_recv().is_err());
    }
}
