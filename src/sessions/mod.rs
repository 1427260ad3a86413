//! Provider session lifecycle.
//!
//! Each provider has a [`SessionStarter`]. On boot, [`bootstrap::start_all_sessions`]
//! selects the channels to resume and fires the matching starter for each one.
//! Starters share a [`SessionContext`] that owns status persistence, the status
//! hook and the registry of live sessions.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::entities::channel;
use crate::db::enums::ChannelStatus;
use crate::db::services::{update_channel_status_with, ChannelServiceError, StatusChange, StatusDetails};
use crate::hooks::StatusHook;
use crate::webhooks::WebhookSettings;

pub mod bootstrap;
pub mod connector;
pub mod instagram;
pub mod plan;
pub mod registry;
pub mod telegram;
pub mod waba360;
pub mod whatsapp;

pub use bootstrap::{dispatch_sessions, start_all_sessions, BootstrapReport};
pub use plan::{plan_session_starts, select_provider, PlannedStart, SessionPlan, SkipReason, SkippedChannel};
pub use registry::{SessionHandle, SessionRegistry, SessionState};

/// Session starter kinds. Ordering follows the boot dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    WhatsApp,
    Telegram,
    Waba360,
    Instagram,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::WhatsApp => "whatsapp",
            Provider::Telegram => "telegram",
            Provider::Waba360 => "waba360",
            Provider::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Provider rejected the session: {0}")]
    Rejected(String),
    #[error("Channel service error: {0}")]
    ChannelError(#[from] ChannelServiceError),
}

/// Opens the provider session of one channel.
#[async_trait]
pub trait SessionStarter: Send + Sync {
    fn provider(&self) -> Provider;

    async fn start(&self, channel: &channel::Model) -> Result<(), SessionError>;
}

/// What a provider handshake ended in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    Connected {
        account: Option<String>,
        number: Option<String>,
    },
    AwaitingQr {
        qrcode: String,
    },
}

/// State shared by every starter.
pub struct SessionContext {
    pub db: Arc<DatabaseConnection>,
    pub registry: SessionRegistry,
    pub status_hook: StatusHook,
    pub webhooks: WebhookSettings,
}

impl SessionContext {
    pub fn new(
        db: Arc<DatabaseConnection>,
        registry: SessionRegistry,
        status_hook: StatusHook,
        webhooks: WebhookSettings,
    ) -> Self {
        Self {
            db,
            registry,
            status_hook,
            webhooks,
        }
    }

    pub async fn set_status(
        &self,
        channel_id: i32,
        status: ChannelStatus,
    ) -> Result<channel::Model, SessionError> {
        self.set_status_with(channel_id, status, StatusDetails::default())
            .await
    }

    /// Persists a status and fires the status hook. A hook failure is logged,
    /// never propagated: the status write already happened.
    pub async fn set_status_with(
        &self,
        channel_id: i32,
        status: ChannelStatus,
        details: StatusDetails,
    ) -> Result<channel::Model, SessionError> {
        let change = update_channel_status_with(self.db.as_ref(), channel_id, status, details).await?;
        self.fire_status_hook(&change).await;
        Ok(change.current)
    }

    async fn fire_status_hook(&self, change: &StatusChange) {
        if let Err(e) = self.status_hook.on_status_change(change).await {
            warn!(channel_id = change.current.id, error = %e, "Session status hook failed.");
        }
    }

    /// Common session start skeleton: mark the channel OPENING, run the
    /// provider handshake, then record the outcome. A failed handshake leaves
    /// the channel DISCONNECTED and out of the registry.
    pub async fn open_session<F>(
        &self,
        channel: &channel::Model,
        provider: Provider,
        handshake: F,
    ) -> Result<(), SessionError>
    where
        F: Future<Output = Result<HandshakeOutcome, SessionError>> + Send,
    {
        self.set_status(channel.id, ChannelStatus::Opening).await?;

        match handshake.await {
            Ok(HandshakeOutcome::Connected { account, number }) => {
                let details = StatusDetails {
                    qrcode: None,
                    number,
                };
                self.set_status_with(channel.id, ChannelStatus::Connected, details)
                    .await?;
                self.register(channel, provider, SessionState::Connected, account.clone());
                info!(channel_id = channel.id, %provider, account = ?account, "Session connected.");
                Ok(())
            }
            Ok(HandshakeOutcome::AwaitingQr { qrcode }) => {
                let details = StatusDetails {
                    qrcode: Some(qrcode),
                    number: None,
                };
                self.set_status_with(channel.id, ChannelStatus::Qrcode, details)
                    .await?;
                self.register(channel, provider, SessionState::Pairing, None);
                info!(channel_id = channel.id, %provider, "Session waiting for QR code scan.");
                Ok(())
            }
            Err(e) => {
                self.registry.remove(channel.id);
                if let Err(status_err) = self
                    .set_status(channel.id, ChannelStatus::Disconnected)
                    .await
                {
                    error!(
                        channel_id = channel.id,
                        error = %status_err,
                        "Failed to mark channel as disconnected."
                    );
                }
                Err(e)
            }
        }
    }

    fn register(
        &self,
        channel: &channel::Model,
        provider: Provider,
        state: SessionState,
        account: Option<String>,
    ) {
        self.registry.insert(SessionHandle {
            channel_id: channel.id,
            tenant_id: channel.tenant_id,
            provider,
            state,
            account,
            started_at: Utc::now(),
        });
    }
}

/// Base URLs of the services the starters talk to.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub connector_url: String,
    pub telegram_api_url: String,
    pub waba360_api_url: String,
}

/// Starter lookup by provider.
#[derive(Clone, Default)]
pub struct SessionStarters {
    starters: HashMap<Provider, Arc<dyn SessionStarter>>,
}

impl SessionStarters {
    pub fn new() -> Self {
        Self::default()
    }

    /// All four provider starters over one shared context.
    pub fn standard(ctx: Arc<SessionContext>, endpoints: &ProviderEndpoints) -> Self {
        let connector = Arc::new(connector::ConnectorClient::new(&endpoints.connector_url));
        Self::new()
            .with(Arc::new(whatsapp::WhatsAppSessionStarter::new(
                ctx.clone(),
                connector.clone(),
            )))
            .with(Arc::new(telegram::TelegramSessionStarter::new(
                ctx.clone(),
                &endpoints.telegram_api_url,
            )))
            .with(Arc::new(waba360::Waba360SessionStarter::new(
                ctx.clone(),
                &endpoints.waba360_api_url,
            )))
            .with(Arc::new(instagram::InstagramSessionStarter::new(
                ctx, connector,
            )))
    }

    pub fn with(mut self, starter: Arc<dyn SessionStarter>) -> Self {
        self.starters.insert(starter.provider(), starter);
        self
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn SessionStarter>> {
        self.starters.get(&provider).cloned()
    }
}
