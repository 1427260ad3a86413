use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::db::entities::channel;

use super::connector::ConnectorClient;
use super::{HandshakeOutcome, Provider, SessionContext, SessionError, SessionStarter};

pub struct InstagramSessionStarter {
    ctx: Arc<SessionContext>,
    connector: Arc<ConnectorClient>,
}

impl InstagramSessionStarter {
    pub fn new(ctx: Arc<SessionContext>, connector: Arc<ConnectorClient>) -> Self {
        Self { ctx, connector }
    }

    pub fn session_request(channel: &channel::Model, key: &str) -> Value {
        json!({
            "tenantId": channel.tenant_id,
            "username": channel.instagram_user,
            "password": key,
            "session": channel.session,
        })
    }
}

/// Instagram logs in with credentials only; a QR answer means the connector
/// is confused about the account.
fn require_connected(outcome: HandshakeOutcome) -> Result<HandshakeOutcome, SessionError> {
    match outcome {
        HandshakeOutcome::AwaitingQr { .. } => Err(SessionError::Rejected(
            "instagram sessions cannot pair by QR code".to_string(),
        )),
        connected => Ok(connected),
    }
}

#[async_trait]
impl SessionStarter for InstagramSessionStarter {
    fn provider(&self) -> Provider {
        Provider::Instagram
    }

    async fn start(&self, channel: &channel::Model) -> Result<(), SessionError> {
        let key = channel
            .instagram_credentials()
            .ok_or(SessionError::MissingCredential("instagram_key"))?;
        let body = Self::session_request(channel, key);

        let handshake = async {
            let state = self
                .connector
                .start_session(Provider::Instagram, channel.id, &body)
                .await?;
            require_connected(state.into_outcome()?)
        };
        self.ctx
            .open_session(channel, Provider::Instagram, handshake)
            .await
    }
}
