//! Notification consumer group.
//!
//! [`ConsumerGroupRuntime`] runs N workers that join one consumer group on one
//! topic. The broker assigns partitions; each worker polls, decodes, dispatches
//! and commits on its own, sharing nothing with the others.
//!
//! # Worker lifecycle
//!
//! ```text
//! Created ──► Subscribed ──► Polling ⇄ Dispatching
//!                               │
//!                               ▼
//!                            Stopped
//! ```
//!
//! - A poll timeout is not an error; the worker polls again.
//! - A message is committed after it is handled, whether handling succeeded
//!   or not. Failed messages are logged and, if a sink is configured,
//!   dead-lettered first.
//! - On shutdown a worker finishes its in-flight message, leaves the group and
//!   stops. Workers still busy after the grace period are aborted.
//!
//! Delivery is at-least-once: a message handled but not yet committed when a
//! worker dies is delivered again, and nothing deduplicates it.

use crate::dispatcher::NotificationDispatcher;
use crate::metrics::NotificationMetrics;
use crate::retry::{RetryPolicy, retry_with_backoff};
use hotel_booking_core::dead_letter::{DeadLetter, DeadLetterSink, FailureStage};
use hotel_booking_core::event::BookingCreatedEvent;
use hotel_booking_core::event_bus::{ConsumerGroup, Delivery, GroupMember};
use hotel_booking_core::notification::NotificationError;
use hotel_booking_core::BookingError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, warn};

/// Consumer group notification workers join unless configured otherwise.
pub const DEFAULT_GROUP_ID: &str = "notification-service-group";

/// Consumer runtime tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerSettings {
    /// Consumer group identifier
    pub group_id: String,
    /// Topic to consume
    pub topic: String,
    /// Number of parallel workers
    pub workers: usize,
    /// Bound on each poll
    pub poll_timeout: Duration,
    /// How long shutdown waits for in-flight work
    pub shutdown_grace: Duration,
    /// Pause before retrying a failed join or poll
    pub reconnect_delay: Duration,
    /// Retries around a failed dispatch
    pub retry: RetryPolicy,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            group_id: DEFAULT_GROUP_ID.to_string(),
            topic: crate::orchestrator::DEFAULT_TOPIC.to_string(),
            workers: 3,
            poll_timeout: Duration::from_millis(1000),
            shutdown_grace: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(1),
            retry: RetryPolicy::none(),
        }
    }
}

/// Where a worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// Spawned, not yet in the group
    #[default]
    Created,
    /// Joined the group; partitions assigned by the broker
    Subscribed,
    /// Waiting for the next message
    Polling,
    /// Handling a message
    Dispatching,
    /// Left the group
    Stopped,
}

impl WorkerState {
    /// Whether the lifecycle allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Subscribed | Self::Stopped)
                | (Self::Subscribed | Self::Dispatching, Self::Polling | Self::Stopped)
                | (Self::Polling, Self::Polling | Self::Dispatching | Self::Stopped)
        )
    }
}

/// What one worker did before it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Worker index within the runtime
    pub worker: usize,
    /// State the worker ended in
    pub state: WorkerState,
    /// Messages read
    pub consumed: u64,
    /// Notifications sent
    pub dispatched: u64,
    /// Payloads that did not decode
    pub decode_failures: u64,
    /// Notifications that could not be sent
    pub dispatch_failures: u64,
    /// Messages recorded in the dead-letter sink
    pub dead_lettered: u64,
    /// Commits the broker rejected
    pub commit_failures: u64,
}

/// Runs notification workers against a consumer group.
pub struct ConsumerGroupRuntime {
    group: Arc<dyn ConsumerGroup>,
    dispatcher: Arc<NotificationDispatcher>,
    dead_letters: Option<Arc<dyn DeadLetterSink>>,
    settings: ConsumerSettings,
}

impl ConsumerGroupRuntime {
    /// Create a runtime.
    #[must_use]
    pub fn new(
        group: Arc<dyn ConsumerGroup>,
        dispatcher: Arc<NotificationDispatcher>,
        settings: ConsumerSettings,
    ) -> Self {
        Self {
            group,
            dispatcher,
            dead_letters: None,
            settings,
        }
    }

    /// Record failed messages in `sink` before committing them.
    #[must_use]
    pub fn with_dead_letters(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.dead_letters = Some(sink);
        self
    }

    /// Spawn the workers.
    #[must_use]
    pub fn start(self) -> RunningConsumerGroup {
        let (shutdown_tx, _) = broadcast::channel(1);
        let workers = self.settings.workers.max(1);
        let grace = self.settings.shutdown_grace;

        info!(
            group_id = %self.settings.group_id,
            topic = %self.settings.topic,
            workers,
            "Starting notification consumers"
        );

        let context = Arc::new(self);
        let handles = (0..workers)
            .map(|index| {
                let worker = Worker::new(index, Arc::clone(&context));
                let span = tracing::info_span!("consumer_worker", worker = index);
                tokio::spawn(worker.run(shutdown_tx.subscribe()).instrument(span))
            })
            .collect();

        RunningConsumerGroup {
            shutdown_tx,
            handles,
            grace,
        }
    }
}

/// Handle to started workers.
pub struct RunningConsumerGroup {
    shutdown_tx: broadcast::Sender<()>,
    handles: Vec<JoinHandle<WorkerStats>>,
    grace: Duration,
}

impl RunningConsumerGroup {
    /// Number of workers started.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Signal every worker to stop and wait for them within the grace period.
    ///
    /// Workers still running at the deadline are aborted and missing from the
    /// returned stats.
    pub async fn shutdown(self) -> Vec<WorkerStats> {
        info!(workers = self.handles.len(), "Stopping notification consumers");
        let _ = self.shutdown_tx.send(());

        let deadline = tokio::time::Instant::now() + self.grace;
        let mut stats = Vec::with_capacity(self.handles.len());

        for (index, mut handle) in self.handles.into_iter().enumerate() {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(worker_stats)) => stats.push(worker_stats),
                Ok(Err(e)) => warn!(worker = index, error = %e, "Consumer task failed"),
                Err(_) => {
                    warn!(worker = index, "Consumer shutdown timed out, aborting");
                    handle.abort();
                }
            }
        }

        info!(stopped = stats.len(), "Notification consumers stopped");
        stats
    }
}

struct Worker {
    context: Arc<ConsumerGroupRuntime>,
    stats: WorkerStats,
}

impl Worker {
    fn new(index: usize, context: Arc<ConsumerGroupRuntime>) -> Self {
        Self {
            context,
            stats: WorkerStats {
                worker: index,
                ..WorkerStats::default()
            },
        }
    }

    fn advance(&mut self, next: WorkerState) {
        let current = self.stats.state;
        if !current.can_transition_to(next) {
            warn!(from = ?current, to = ?next, "Unexpected worker state transition");
        }
        self.stats.state = next;
    }

    async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> WorkerStats {
        let Some(mut member) = self.join(&mut shutdown).await else {
            self.advance(WorkerState::Stopped);
            return self.stats;
        };
        self.advance(WorkerState::Subscribed);
        info!("Worker joined consumer group");

        loop {
            self.advance(WorkerState::Polling);
            let polled = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                polled = member.poll(self.context.settings.poll_timeout) => polled,
            };

            match polled {
                Ok(None) => {}
                Ok(Some(delivery)) => {
                    self.advance(WorkerState::Dispatching);
                    self.handle(&delivery).await;
                    self.commit(member.as_mut(), &delivery);
                }
                Err(e) => {
                    warn!(error = %e, "Poll failed");
                    if pause(self.context.settings.reconnect_delay, &mut shutdown).await {
                        break;
                    }
                }
            }
        }

        member.leave();
        self.advance(WorkerState::Stopped);
        info!(
            consumed = self.stats.consumed,
            dispatched = self.stats.dispatched,
            "Worker left consumer group"
        );
        self.stats
    }

    /// Join the group, retrying until it works or shutdown arrives.
    async fn join(
        &self,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Option<Box<dyn GroupMember>> {
        let settings = &self.context.settings;
        loop {
            let joined = tokio::select! {
                biased;
                _ = shutdown.recv() => return None,
                joined = self.context.group.join(&settings.group_id, &settings.topic, self.stats.worker) => joined,
            };
            match joined {
                Ok(member) => return Some(member),
                Err(e) => {
                    error!(error = %e, "Failed to join consumer group, retrying");
                    if pause(settings.reconnect_delay, shutdown).await {
                        return None;
                    }
                }
            }
        }
    }

    async fn handle(&mut self, delivery: &Delivery) {
        NotificationMetrics::record_consumed();
        self.stats.consumed += 1;

        let event = match BookingCreatedEvent::from_payload(&delivery.payload) {
            Ok(event) => event,
            Err(e) => {
                let err = BookingError::DecodeFailed(e.to_string());
                warn!(
                    partition = delivery.partition,
                    offset = delivery.offset,
                    error = %err,
                    "Skipping undecodable booking event"
                );
                NotificationMetrics::record_decode_failure();
                self.stats.decode_failures += 1;
                self.dead_letter(delivery, FailureStage::Decode, &err).await;
                return;
            }
        };

        let dispatcher: &NotificationDispatcher = &self.context.dispatcher;
        let event_ref = &event;
        let result = retry_with_backoff(
            &self.context.settings.retry,
            move || dispatcher.dispatch(event_ref),
            |e| matches!(e, NotificationError::Transport(_)),
        )
        .await;

        match result {
            Ok(()) => {
                NotificationMetrics::record_dispatched();
                self.stats.dispatched += 1;
                info!(
                    booking_id = %event.booking_id,
                    partition = delivery.partition,
                    offset = delivery.offset,
                    "Booking confirmation sent"
                );
            }
            Err(e) => {
                let err = BookingError::DispatchFailed(e.to_string());
                error!(
                    booking_id = %event.booking_id,
                    partition = delivery.partition,
                    offset = delivery.offset,
                    error = %err,
                    "Booking confirmation not sent"
                );
                NotificationMetrics::record_dispatch_failure();
                self.stats.dispatch_failures += 1;
                self.dead_letter(delivery, FailureStage::Dispatch, &err).await;
            }
        }
    }

    async fn dead_letter(&mut self, delivery: &Delivery, stage: FailureStage, err: &BookingError) {
        let Some(sink) = &self.context.dead_letters else {
            return;
        };

        let letter = DeadLetter {
            topic: delivery.topic.clone(),
            partition: delivery.partition,
            offset: delivery.offset,
            payload: delivery.payload.clone(),
            stage,
            reason: err.to_string(),
        };

        match sink.record(letter).await {
            Ok(()) => {
                NotificationMetrics::record_dead_lettered();
                self.stats.dead_lettered += 1;
                debug!(offset = delivery.offset, %stage, "Message dead-lettered");
            }
            Err(e) => error!(
                partition = delivery.partition,
                offset = delivery.offset,
                error = %e,
                "Failed to record dead letter"
            ),
        }
    }

    fn commit(&mut self, member: &mut dyn GroupMember, delivery: &Delivery) {
        if let Err(e) = member.commit(delivery) {
            warn!(error = %e, "Commit failed; message may be delivered again");
            self.stats.commit_failures += 1;
        }
    }
}

/// Sleep for `delay` unless shutdown arrives first. Returns `true` on shutdown.
async fn pause(delay: Duration, shutdown: &mut broadcast::Receiver<()>) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.recv() => true,
        () = tokio::time::sleep(delay) => false,
    }
}
