use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

use super::delivery::WebhookDelivery;
use super::Job;

/// Exponential backoff: attempt `n` (1-based) waits `base_delay * 2^(n-1)` before retrying.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Drains the queue. Every job is delivered in its own task, so a slow or
/// failing endpoint only delays its own retries.
pub struct JobWorker {
    receiver: mpsc::Receiver<Job>,
    delivery: Arc<dyn WebhookDelivery>,
    retry: RetryPolicy,
}

impl JobWorker {
    pub fn new(
        receiver: mpsc::Receiver<Job>,
        delivery: Arc<dyn WebhookDelivery>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            receiver,
            delivery,
            retry,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Processes jobs until every [`super::JobQueue`] handle is dropped, then
    /// waits for the deliveries still in flight.
    pub async fn run(mut self) {
        info!(max_attempts = self.retry.max_attempts, "Job worker started.");
        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                next = self.receiver.recv() => match next {
                    Some(job) => {
                        let delivery = self.delivery.clone();
                        let retry = self.retry;
                        in_flight.spawn(async move {
                            process(delivery.as_ref(), retry, &job).await;
                        });
                    }
                    None => break,
                },
                Some(finished) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_join_failure(finished);
                }
            }
        }
        while let Some(finished) = in_flight.join_next().await {
            log_join_failure(finished);
        }
        info!("Job queue closed. Job worker finished.");
    }
}

fn log_join_failure(finished: Result<(), tokio::task::JoinError>) {
    if let Err(e) = finished {
        error!(error = %e, "Job delivery task failed.");
    }
}

/// Returns whether the job was delivered.
async fn process(delivery: &dyn WebhookDelivery, retry: RetryPolicy, job: &Job) -> bool {
    let max_attempts = retry.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match delivery.deliver(&job.data).await {
            Ok(()) => {
                let queued_ms = (Utc::now() - job.enqueued_at).num_milliseconds();
                info!(
                    job_id = %job.id,
                    job = job.name,
                    url = %job.data.url,
                    attempt,
                    queued_ms,
                    "Job delivered."
                );
                return true;
            }
            Err(e) if attempt < max_attempts => {
                let delay = retry.delay_after(attempt);
                warn!(
                    job_id = %job.id,
                    url = %job.data.url,
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %e,
                    "Job delivery failed. Retrying."
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                error!(
                    job_id = %job.id,
                    url = %job.data.url,
                    attempts = attempt,
                    error = %e,
                    "Job delivery failed permanently. Dropping job."
                );
            }
        }
    }
    false
}

/// Waits up to `within` for a spawned worker to finish. Returns whether it
/// drained in time.
pub async fn wait_for_drain(handle: JoinHandle<()>, within: Duration) -> bool {
    match tokio::time::timeout(within, handle).await {
        Ok(Ok(())) => {
            info!("Job worker drained.");
            true
        }
        Ok(Err(e)) => {
            error!(error = %e, "Job worker task failed.");
            false
        }
        Err(_) => {
            warn!(
                timeout_ms = within.as_millis() as u64,
                "Job worker did not drain in time."
            );
            false
        }
    }
}
