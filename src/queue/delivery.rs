use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use thiserror::Error;

use super::WebhookJob;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Webhook returned non-success status: {status}. Body: {body}")]
    Rejected { status: u16, body: String },
}

/// Transport used by the job worker to hand a payload to its endpoint.
#[async_trait]
pub trait WebhookDelivery: Send + Sync {
    async fn deliver(&self, job: &WebhookJob) -> Result<(), DeliveryError>;
}

/// Posts the job payload as JSON.
pub struct HttpWebhookDelivery {
    client: Client,
}

impl Default for HttpWebhookDelivery {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpWebhookDelivery {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl WebhookDelivery for HttpWebhookDelivery {
    async fn deliver(&self, job: &WebhookJob) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&job.url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&job.payload)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
