//! Client of the external connector service that runs the WhatsApp and
//! Instagram protocols on behalf of this process.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{HandshakeOutcome, Provider, SessionError};

pub const DEFAULT_CONNECTOR_URL: &str = "http://127.0.0.1:8090";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorSessionState {
    pub status: String,
    #[serde(default)]
    pub qrcode: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
}

impl ConnectorSessionState {
    /// Maps the connector answer onto a handshake outcome. Anything other
    /// than a connected session or a QR to scan is a rejection.
    pub fn into_outcome(self) -> Result<HandshakeOutcome, SessionError> {
        match self.status.as_str() {
            "CONNECTED" => Ok(HandshakeOutcome::Connected {
                account: self.account,
                number: self.number,
            }),
            "qrcode" => match self.qrcode.filter(|qr| !qr.is_empty()) {
                Some(qrcode) => Ok(HandshakeOutcome::AwaitingQr { qrcode }),
                None => Err(SessionError::Rejected(
                    "connector asked for a QR scan without a QR code".to_string(),
                )),
            },
            other => Err(SessionError::Rejected(format!(
                "connector reported status {other}"
            ))),
        }
    }
}

pub struct ConnectorClient {
    client: Client,
    base_url: String,
}

impl ConnectorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn start_url(&self, provider: Provider, channel_id: i32) -> String {
        format!("{}/sessions/{}/{}/start", self.base_url, provider, channel_id)
    }

    /// Asks the connector to open (or resume) the session of one channel.
    pub async fn start_session(
        &self,
        provider: Provider,
        channel_id: i32,
        body: &Value,
    ) -> Result<ConnectorSessionState, SessionError> {
        let url = self.start_url(provider, channel_id);
        debug!(channel_id, %provider, "Requesting session start from connector.");

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SessionError::Rejected(format!(
                "connector returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        Ok(response.json::<ConnectorSessionState>().await?)
    }
}
