use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::db::entities::channel;

use super::{HandshakeOutcome, Provider, SessionContext, SessionError, SessionStarter};

pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Deserialize)]
pub struct GetMeResponse {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<TelegramBot>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramBot {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

impl GetMeResponse {
    pub fn into_outcome(self) -> Result<HandshakeOutcome, SessionError> {
        if !self.ok {
            return Err(SessionError::Rejected(
                self.description
                    .unwrap_or_else(|| "getMe returned ok=false".to_string()),
            ));
        }
        let account = self
            .result
            .map(|bot| bot.username.unwrap_or_else(|| bot.id.to_string()));
        Ok(HandshakeOutcome::Connected {
            account,
            number: None,
        })
    }
}

/// Token-based bot sessions: a token is live when Bot API `getMe` accepts it.
pub struct TelegramSessionStarter {
    ctx: Arc<SessionContext>,
    client: Client,
    api_url: String,
}

impl TelegramSessionStarter {
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

    pub fn get_me_url(&self, token: &str) -> String {
        format!("{}/bot{}/getMe", self.api_url, token)
    }

    async fn get_me(&self, token: &str) -> Result<HandshakeOutcome, SessionError> {
        // Bot API errors come back as JSON with ok=false, whatever the HTTP status.
        let response = self.client.get(self.get_me_url(token)).send().await?;
        response.json::<GetMeResponse>().await?.into_outcome()
    }
}

#[async_trait]
impl SessionStarter for TelegramSessionStarter {
    fn provider(&self) -> Provider {
        Provider::Telegram
    }

    async fn start(&self, channel: &channel::Model) -> Result<(), SessionError> {
        let token = channel
            .telegram_token()
            .ok_or(SessionError::MissingCredential("token_telegram"))?;
        self.ctx
            .open_session(channel, Provider::Telegram, self.get_me(token))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::{ChannelStatus, ChannelType};
    use crate::test_support::{context_over, sample_channel};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    fn starter() -> TelegramSessionStarter {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        TelegramSessionStarter::new(Arc::new(context_over(db)), "https://api.telegram.org/")
    }

    #[test]
    fn get_me_url_embeds_token() {
        assert_eq!(
            starter().get_me_url("123:abc"),
            "https://api.telegram.org/bot123:abc/getMe"
        );
    }

    #[test]
    fn ok_response_connects_with_bot_username() {
        let response: GetMeResponse = serde_json::from_value(json!({
            "ok": true,
            "result": {"id": 42, "is_bot": true, "username": "support_bot"}
        }))
        .unwrap();
        assert_eq!(
            response.into_outcome().unwrap(),
            HandshakeOutcome::Connected {
                account: Some("support_bot".to_string()),
                number: None,
            }
        );
    }

    #[test]
    fn error_response_is_rejected_with_description() {
        let response: GetMeResponse = serde_json::from_value(json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        }))
        .unwrap();
        let err = response.into_outcome().unwrap_err();
        assert!(matches!(err, SessionError::Rejected(msg) if msg == "Unauthorized"));
    }

    #[tokio::test]
    async fn missing_token_fails_before_touching_the_database() {
        let mut channel = sample_channel(9, ChannelType::Telegram, ChannelStatus::Connected);
        channel.token_telegram = None;

        let err = starter().start(&channel).await.unwrap_err();
        assert!(matches!(err, SessionError::MissingCredential("token_telegram")));
    }
}
