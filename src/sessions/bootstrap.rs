use std::collections::BTreeMap;

use sea_orm::{DatabaseConnection, DbErr};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::db::services::find_resumable_channels;

use super::plan::{plan_session_starts, SessionPlan, SkipReason, SkippedChannel};
use super::{Provider, SessionStarters};

/// What boot dispatched. The handles are only for callers that want to
/// wait; dropping them leaves the starts running.
#[derive(Debug, Default)]
pub struct BootstrapReport {
    pub counts: BTreeMap<Provider, usize>,
    pub skipped: Vec<SkippedChannel>,
    pub handles: Vec<JoinHandle<()>>,
}

impl BootstrapReport {
    pub fn count(&self, provider: Provider) -> usize {
        self.counts.get(&provider).copied().unwrap_or(0)
    }

    pub fn dispatched_total(&self) -> usize {
        self.handles.len()
    }
}

/// Loads every resumable channel and fires its provider starter.
///
/// Returns once all starts are spawned; it does not wait for any of them.
/// Only the channel query can fail the call.
pub async fn start_all_sessions(
    db: &DatabaseConnection,
    starters: &SessionStarters,
) -> Result<BootstrapReport, DbErr> {
    let channels = find_resumable_channels(db).await?;
    debug!(loaded = channels.len(), "Loaded resumable channels.");

    let report = dispatch_sessions(plan_session_starts(channels), starters);
    info!(
        whatsapp = report.count(Provider::WhatsApp),
        telegram = report.count(Provider::Telegram),
        waba360 = report.count(Provider::Waba360),
        instagram = report.count(Provider::Instagram),
        skipped = report.skipped.len(),
        "Session bootstrap dispatched."
    );
    Ok(report)
}

/// Spawns one task per planned start. Each task logs its own failure, so
/// one channel going wrong never touches the others.
pub fn dispatch_sessions(plan: SessionPlan, starters: &SessionStarters) -> BootstrapReport {
    let mut report = BootstrapReport {
        skipped: plan.skipped,
        ..Default::default()
    };
    for skipped in &report.skipped {
        debug!(
            channel_id = skipped.channel_id,
            channel_type = %skipped.channel_type,
            reason = ?skipped.reason,
            "Channel not resumed."
        );
    }

    for start in plan.starts {
        let provider = start.provider;
        let channel = start.channel;
        let Some(starter) = starters.get(provider) else {
            warn!(channel_id = channel.id, %provider, "No session starter registered.");
            report.skipped.push(SkippedChannel {
                channel_id: channel.id,
                channel_type: channel.channel_type,
                reason: SkipReason::NoStarter,
            });
            continue;
        };

        *report.counts.entry(provider).or_insert(0) += 1;
        report.handles.push(tokio::spawn(async move {
            if let Err(e) = starter.start(&channel).await {
                error!(
                    channel_id = channel.id,
                    tenant_id = channel.tenant_id,
                    %provider,
                    error = %e,
                    "Failed to start session."
                );
            }
        }));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entities::channel;
    use crate::db::enums::{ChannelStatus, ChannelType};
    use crate::sessions::{SessionError, SessionStarter};
    use crate::test_support::sample_channel;
    use async_trait::async_trait;
    use futures::future::join_all;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::{Arc, Mutex};

    struct RecordingStarter {
        provider: Provider,
        started: Arc<Mutex<Vec<i32>>>,
        fail_for: Option<i32>,
    }

    impl RecordingStarter {
        fn new(provider: Provider, started: Arc<Mutex<Vec<i32>>>) -> Self {
            Self {
                provider,
                started,
                fail_for: None,
            }
        }
    }

    #[async_trait]
    impl SessionStarter for RecordingStarter {
        fn provider(&self) -> Provider {
            self.provider
        }

        async fn start(&self, channel: &channel::Model) -> Result<(), SessionError> {
            if self.fail_for == Some(channel.id) {
                return Err(SessionError::Rejected("boom".to_string()));
            }
            self.started.lock().unwrap().push(channel.id);
            Ok(())
        }
    }

    fn recording_starters(started: &Arc<Mutex<Vec<i32>>>) -> SessionStarters {
        [
            Provider::WhatsApp,
            Provider::Telegram,
            Provider::Waba360,
            Provider::Instagram,
        ]
        .into_iter()
        .fold(SessionStarters::new(), |starters, provider| {
            starters.with(Arc::new(RecordingStarter::new(provider, started.clone())))
        })
    }

    #[tokio::test]
    async fn starts_every_resumable_channel() {
        let mut gupshup = sample_channel(5, ChannelType::Waba, ChannelStatus::Connected);
        gupshup.waba_bsp = Some(crate::db::enums::WabaBsp::Gupshup);
        let rows = vec![
            sample_channel(1, ChannelType::Whatsapp, ChannelStatus::Connected),
            sample_channel(2, ChannelType::Telegram, ChannelStatus::Opening),
            sample_channel(3, ChannelType::Waba, ChannelStatus::Connected),
            sample_channel(4, ChannelType::Instagram, ChannelStatus::Connected),
            gupshup,
        ];
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([rows])
            .into_connection();
        let started = Arc::new(Mutex::new(Vec::new()));

        let report = start_all_sessions(&db, &recording_starters(&started))
            .await
            .unwrap();
        assert_eq!(report.dispatched_total(), 4);
        assert_eq!(report.count(Provider::Waba360), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].channel_id, 5);

        join_all(report.handles).await;
        let mut ids = started.lock().unwrap().clone();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn no_channels_dispatch_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<channel::Model>::new()])
            .into_connection();
        let started = Arc::new(Mutex::new(Vec::new()));

        let report = start_all_sessions(&db, &recording_starters(&started))
            .await
            .unwrap();
        assert_eq!(report.dispatched_total(), 0);
        assert!(report.skipped.is_empty());
    }

    #[tokio::test]
    async fn query_failure_is_returned() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("connection refused".to_string())])
            .into_connection();
        let started = Arc::new(Mutex::new(Vec::new()));

        let result = start_all_sessions(&db, &recording_starters(&started)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn one_failing_start_does_not_affect_the_others() {
        let started = Arc::new(Mutex::new(Vec::new()));
        let starters = SessionStarters::new().with(Arc::new(RecordingStarter {
            provider: Provider::WhatsApp,
            started: started.clone(),
            fail_for: Some(2),
        }));
        let plan = plan_session_starts(vec![
            sample_channel(1, ChannelType::Whatsapp, ChannelStatus::Connected),
            sample_channel(2, ChannelType::Whatsapp, ChannelStatus::Connected),
            sample_channel(3, ChannelType::Whatsapp, ChannelStatus::Connected),
        ]);

        let report = dispatch_sessions(plan, &starters);
        for result in join_all(report.handles).await {
            assert!(result.is_ok());
        }
        let mut ids = started.lock().unwrap().clone();
        ids.sort();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn missing_starter_is_reported_as_skipped() {
        let started = Arc::new(Mutex::new(Vec::new()));
        let starters = SessionStarters::new()
            .with(Arc::new(RecordingStarter::new(Provider::WhatsApp, started.clone())));
        let plan = plan_session_starts(vec![
            sample_channel(1, ChannelType::Whatsapp, ChannelStatus::Connected),
            sample_channel(2, ChannelType::Telegram, ChannelStatus::Connected),
        ]);

        let report = dispatch_sessions(plan, &starters);
        assert_eq!(report.dispatched_total(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::NoStarter);
        join_all(report.handles).await;
    }

    /// A provider handshake that never completes.
    struct HangingStarter;

    #[async_trait]
    impl SessionStarter for HangingStarter {
        fn provider(&self) -> Provider {
            Provider::WhatsApp
        }

        async fn start(&self, _channel: &channel::Model) -> Result<(), SessionError> {
            futures::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn bootstrap_returns_while_a_start_is_still_pending() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_channel(
                1,
                ChannelType::Whatsapp,
                ChannelStatus::Connected,
            )]])
            .into_connection();
        let starters = SessionStarters::new().with(Arc::new(HangingStarter));

        let report = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            start_all_sessions(&db, &starters),
        )
        .await
        .expect("bootstrap must not wait for session starts")
        .unwrap();
        assert_eq!(report.dispatched_total(), 1);
        assert!(report.handles.iter().all(|handle| !handle.is_finished()));
        for handle in &report.handles {
            handle.abort();
        }
    }
}
