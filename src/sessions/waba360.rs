use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::db::entities::channel;
use crate::db::enums::WabaBsp;
use crate::db::services::ensure_webhook_key;

use super::{HandshakeOutcome, Provider, SessionContext, SessionError, SessionStarter};

pub const DEFAULT_WABA360_API_URL: &str = "https://waba.360dialog.io";
const API_KEY_HEADER: &str = "D360-API-KEY";

#[derive(Debug, Serialize)]
struct WebhookConfig<'a> {
    url: &'a str,
}

/// WABA channels served by 360dialog. Starting one means pointing the BSP's
/// webhook at this backend.
pub struct Waba360SessionStarter {
    ctx: Arc<SessionContext>,
    client: Client,
    api_url: String,
}

impl Waba360SessionStarter {
    pub fn new(ctx: Arc<SessionContext>, api_url: &str) -> Self {
        Self {
            ctx,
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn webhook_config_url(&self) -> String {
        format!("{}/v1/configs/webhook", self.api_url)
    }

    async fn register_webhook(
        &self,
        channel: &channel::Model,
        api_key: &str,
    ) -> Result<HandshakeOutcome, SessionError> {
        let channel = ensure_webhook_key(
            self.ctx.db.as_ref(),
            channel.clone(),
            &self.ctx.webhooks.jwt_secret,
        )
        .await?;
        let webhook_url = self
            .ctx
            .webhooks
            .waba_webhook_url_for(&channel)
            .ok_or(SessionError::MissingCredential("waba_key_hook"))?;
        debug!(channel_id = channel.id, %webhook_url, "Registering 360dialog webhook.");

        let response = self
            .client
            .post(self.webhook_config_url())
            .header(API_KEY_HEADER, api_key)
            .json(&WebhookConfig { url: &webhook_url })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SessionError::Rejected(format!(
                "360dialog returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        Ok(HandshakeOutcome::Connected {
            account: None,
            number: None,
        })
    }
}

#[async_trait]
impl SessionStarter for Waba360SessionStarter {
    fn provider(&self) -> Provider {
        Provider::Waba360
    }

    async fn start(&self, channel: &channel::Model) -> Result<(), SessionError> {
        let api_key = channel
            .waba_credentials()
            .ok_or(SessionError::MissingCredential("waba_api_key"))?;
        if channel.waba_bsp != Some(WabaBsp::Dialog360) {
            return Err(SessionError::Rejected(format!(
                "channel {} is not served by 360dialog",
                channel.id
            )));
        }
        self.ctx
            .open_session(channel, Provider::Waba360, self.register_webhook(channel, api_key))
            .await
    }
}
