use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::db::entities::channel;

use super::connector::ConnectorClient;
use super::{Provider, SessionContext, SessionError, SessionStarter};

pub struct WhatsAppSessionStarter {
    ctx: Arc<SessionContext>,
    connector: Arc<ConnectorClient>,
}

impl WhatsAppSessionStarter {
    pub fn new(ctx: Arc<SessionContext>, connector: Arc<ConnectorClient>) -> Self {
        Self { ctx, connector }
    }

    /// Stored session blob goes back to the connector so it can resume
    /// without a new pairing.
    pub fn session_request(channel: &channel::Model) -> Value {
        json!({
            "tenantId": channel.tenant_id,
            "name": channel.display_name(),
            "session": channel.session,
        })
    }
}

#[async_trait]
impl SessionStarter for WhatsAppSessionStarter {
    fn provider(&self) -> Provider {
        Provider::WhatsApp
    }

    async fn start(&self, channel: &channel::Model) -> Result<(), SessionError> {
        let body = Self::session_request(channel);
        let handshake = async {
            self.connector
                .start_session(Provider::WhatsApp, channel.id, &body)
                .await?
                .into_outcome()
        };
        self.ctx
            .open_session(channel, Provider::WhatsApp, handshake)
            .await
    }
}
