use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{Semaphore, mpsc};
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::application::ports::notifier::AdmissionNotifier;

const QUEUE_CAPACITY: usize = 1024;
const HTTP_TIMEOUT_SECS: u64 = 10;
const BASE_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF_MS: u64 = 30_000;
const MAX_CONCURRENT_DELIVERIES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionNotice {
    pub user_id: Uuid,
    pub event_id: Uuid,
}

/// Where notices end up.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notice: &AdmissionNotice) -> Result<(), String>;
}

/// POSTs `{userId, eventId}` as JSON.
pub struct HttpNotificationSink {
    client: reqwest::Client,
    url: Url,
}

impl HttpNotificationSink {
    pub fn new(url: Url) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("failed to build reqwest client");
        Self { client, url }
    }
}

#[async_trait]
impl NotificationSink for HttpNotificationSink {
    async fn deliver(&self, notice: &AdmissionNotice) -> Result<(), String> {
        let response = self
            .client
            .post(self.url.clone())
            .json(notice)
            .send()
            .await
            .map_err(|e| format!("HTTP error: {e}"))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("notify endpoint returned {}", response.status()))
        }
    }
}

/// Used when no endpoint is configured.
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn deliver(&self, notice: &AdmissionNotice) -> Result<(), String> {
        info!(
            user_id = %notice.user_id,
            event_id = %notice.event_id,
            "Admission notification (no endpoint configured)"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff: Duration::from_millis(BASE_BACKOFF_MS),
            max_backoff: Duration::from_millis(MAX_BACKOFF_MS),
        }
    }

    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Fire-and-forget front of the notification queue.
///
/// Enqueueing never waits: when the queue is full the notice is dropped with a
/// warning, since admissions must not stall on a slow receiver.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<AdmissionNotice>,
}

impl NotificationDispatcher {
    /// Start the background worker. Must be called inside a tokio runtime.
    pub fn spawn(sink: Arc<dyn NotificationSink>, policy: RetryPolicy) -> Self {
        Self::spawn_with_capacity(sink, policy, QUEUE_CAPACITY)
    }

    pub fn spawn_with_capacity(
        sink: Arc<dyn NotificationSink>,
        policy: RetryPolicy,
        capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        tokio::spawn(run_notification_worker(receiver, sink, policy));
        Self { sender }
    }

    fn enqueue(&self, notice: AdmissionNotice) -> bool {
        match self.sender.try_send(notice) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(notice)) => {
                warn!(
                    user_id = %notice.user_id,
                    event_id = %notice.event_id,
                    "Notification queue full, dropping notice"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(notice)) => {
                error!(
                    user_id = %notice.user_id,
                    event_id = %notice.event_id,
                    "Notification worker stopped, dropping notice"
                );
                false
            }
        }
    }
}

impl AdmissionNotifier for NotificationDispatcher {
    fn notify_admitted(&self, user_id: Uuid, event_id: Uuid) {
        self.enqueue(AdmissionNotice { user_id, event_id });
    }
}

pub async fn run_notification_worker(
    mut receiver: mpsc::Receiver<AdmissionNotice>,
    sink: Arc<dyn NotificationSink>,
    policy: RetryPolicy,
) {
    info!(
        max_attempts = policy.max_attempts,
        max_concurrent = MAX_CONCURRENT_DELIVERIES,
        "Notification worker started"
    );

    // A notice stuck in backoff holds one permit, not the whole queue.
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_DELIVERIES));

    while let Some(notice) = receiver.recv().await {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let sink = Arc::clone(&sink);
        tokio::spawn(async move {
            let _permit = permit;
            deliver_with_retry(sink.as_ref(), &notice, policy).await;
        });
    }

    info!("Notification worker stopped");
}

/// Returns whether the notice was eventually delivered.
async fn deliver_with_retry(
    sink: &dyn NotificationSink,
    notice: &AdmissionNotice,
    policy: RetryPolicy,
) -> bool {
    for attempt in 1..=policy.max_attempts {
        match sink.deliver(notice).await {
            Ok(()) => return true,
            Err(reason) if attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    user_id = %notice.user_id,
                    event_id = %notice.event_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    reason = %reason,
                    "Notification delivery failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(reason) => {
                error!(
                    user_id = %notice.user_id,
                    event_id = %notice.event_id,
                    attempts = attempt,
                    reason = %reason,
                    "Giving up on notification"
                );
            }
        }
    }
    false
}
