//! In-process job queue for outbound webhook notifications.
//!
//! Producers enqueue through a cloneable [`JobQueue`]; a single
//! [`worker::JobWorker`] drains the channel and delivers each job, with
//! retries, in a task of its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

pub mod delivery;
pub mod worker;

pub use delivery::{DeliveryError, HttpWebhookDelivery, WebhookDelivery};
pub use worker::{wait_for_drain, JobWorker, RetryPolicy};

/// Name of the job that posts a payload to a tenant API endpoint.
pub const WEBHOOKS_API_JOB: &str = "WebHooksAPI";

/// Data of a `WebHooksAPI` job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookJob {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub name: &'static str,
    pub data: WebhookJob,
    pub enqueued_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Job queue is closed")]
    Closed,
}

#[derive(Debug, Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<Job>,
}

impl JobQueue {
    /// Creates the queue and the receiving half to hand to a [`JobWorker`].
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Job>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Enqueues a webhook job. Waits only for queue capacity, never for delivery.
    pub async fn add(&self, data: WebhookJob) -> Result<Uuid, QueueError> {
        let job = Job {
            id: Uuid::new_v4(),
            name: WEBHOOKS_API_JOB,
            data,
            enqueued_at: Utc::now(),
        };
        let job_id = job.id;
        self.sender.send(job).await.map_err(|_| QueueError::Closed)?;
        debug!(%job_id, job = WEBHOOKS_API_JOB, "Job enqueued.");
        Ok(job_id)
    }
}
