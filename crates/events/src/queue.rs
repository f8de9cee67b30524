//! Bounded background queue for notification dispatch.
//!
//! The evaluation path hands alerts to [`NotificationQueue::enqueue`] and
//! moves on. A single [`QueueWorker`] pulls jobs off a bounded channel and
//! runs at most `workers` dispatches at a time. When the channel is full,
//! `enqueue` waits for capacity instead of spawning unbounded work.
//!
//! On shutdown the worker stops accepting new jobs, drains the ones already
//! queued, and waits for in-flight dispatches to finish.
//!
//! A job whose recipient lookup fails with a retryable storage error is
//! retried in place (0.5 s, 1 s, 2 s) before it is given up.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use aquamine_core::alert::{Alert, AlertEvent, NotificationRecipient};
use aquamine_core::message;
use aquamine_core::store::RecipientDirectory;

use crate::dispatcher::NotificationDispatcher;

const DEFAULT_CAPACITY: usize = 256;
const DEFAULT_WORKERS: usize = 4;

/// Waits between recipient lookups after a retryable failure.
const RECIPIENT_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_millis(500),
    Duration::from_secs(1),
    Duration::from_secs(2),
];

#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub capacity: usize,
    pub workers: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            workers: DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Notification queue is shut down")]
pub struct QueueClosed;

/// Producer handle. Cheap to clone.
#[derive(Clone)]
pub struct NotificationQueue {
    sender: mpsc::Sender<AlertEvent>,
}

impl NotificationQueue {
    /// Create the queue and its worker. The worker must be run (usually
    /// spawned) for jobs to make progress.
    pub fn new(
        config: QueueConfig,
        directory: Arc<dyn RecipientDirectory>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> (Self, QueueWorker) {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        let worker = QueueWorker {
            receiver,
            directory,
            dispatcher,
            permits: Arc::new(Semaphore::new(config.workers.max(1))),
            tracker: TaskTracker::new(),
        };
        (Self { sender }, worker)
    }

    /// Queue an alert for dispatch, waiting while the queue is full.
    pub async fn enqueue(&self, event: AlertEvent) -> Result<(), QueueClosed> {
        self.sender.send(event).await.map_err(|_| QueueClosed)
    }
}

pub struct QueueWorker {
    receiver: mpsc::Receiver<AlertEvent>,
    directory: Arc<dyn RecipientDirectory>,
    dispatcher: Arc<NotificationDispatcher>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl QueueWorker {
    /// Process jobs until cancelled (or every producer is dropped), then
    /// drain what is left.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut closing = false;
        loop {
            let job = tokio::select! {
                _ = cancel.cancelled(), if !closing => {
                    tracing::info!("Notification queue closing, draining pending jobs");
                    self.receiver.close();
                    closing = true;
                    continue;
                }
                job = self.receiver.recv() => job,
            };
            let Some(event) = job else { break };

            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                break;
            };
            let directory = Arc::clone(&self.directory);
            let dispatcher = Arc::clone(&self.dispatcher);
            self.tracker.spawn(async move {
                run_job(directory.as_ref(), &dispatcher, event).await;
                drop(permit);
            });
        }

        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("Notification queue drained");
    }
}

async fn run_job(
    directory: &dyn RecipientDirectory,
    dispatcher: &NotificationDispatcher,
    event: AlertEvent,
) {
    let alert = &event.alert;
    let Some(recipients) = load_recipients(directory, alert).await else {
        return;
    };

    let msg = message::build(
        &alert.sensor_id,
        alert.previous_state,
        alert.severity,
        &event.anomalies,
    );
    dispatcher.dispatch(alert, &msg, &recipients).await;
}

async fn load_recipients(
    directory: &dyn RecipientDirectory,
    alert: &Alert,
) -> Option<Vec<NotificationRecipient>> {
    let mut delays = RECIPIENT_RETRY_DELAYS.iter();
    let mut attempt = 1u32;
    loop {
        match directory.active_recipients(alert.severity).await {
            Ok(recipients) => return Some(recipients),
            Err(e) if e.is_retryable() => {
                let Some(delay) = delays.next() else {
                    tracing::error!(
                        alert_id = alert.id,
                        sensor_id = %alert.sensor_id,
                        attempt,
                        error = %e,
                        "Failed to load notification recipients after all retries"
                    );
                    return None;
                };
                tracing::warn!(
                    alert_id = alert.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Recipient lookup failed, retrying"
                );
                tokio::time::sleep(*delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(
                    alert_id = alert.id,
                    sensor_id = %alert.sensor_id,
                    error = %e,
                    "Failed to load notification recipients"
                );
                return None;
            }
        }
    }
}
