//! Event listener for flight surety contract events

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ListenerConfig;
use crate::ledger::LedgerClient;
use crate::models::{EventKind, LedgerEvent};
use crate::services::backoff::Backoff;
use crate::services::subscription::Subscription;

const EVENT_BUFFER: usize = 256;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Receives every decoded contract event. Delivery is at-least-once.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: LedgerEvent);
}

/// Event listener service
pub struct EventListener {
    ledger: Arc<dyn LedgerClient>,
    handler: Arc<dyn EventHandler>,
    settings: ListenerConfig,
}

impl EventListener {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        handler: Arc<dyn EventHandler>,
        settings: ListenerConfig,
    ) -> Self {
        Self {
            ledger,
            handler,
            settings,
        }
    }

    /// Subscribe to every contract stream and hand events to the handler until
    /// `shutdown` fires or a subscription dies. Each event is handled on its own
    /// task, at most `max_in_flight` at a time; in-flight handlers get a bounded
    /// grace period on the way out.
    pub async fn run(&self, shutdown: CancellationToken) {
        let local = shutdown.child_token();
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);

        let mut subscriptions = JoinSet::new();
        for kind in EventKind::ALL {
            let subscription =
                Subscription::new(kind, Arc::clone(&self.ledger), &self.settings, tx.clone());
            subscriptions.spawn(subscription.run(local.clone()));
        }
        drop(tx);

        info!(from_ledger = self.settings.start_ledger, "event listener started");

        // While every slot is taken the channel fills up and the subscriptions stall.
        let slots = Arc::new(Semaphore::new(self.settings.max_in_flight.max(1)));
        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                _ = local.cancelled() => break,
                received = rx.recv(), if slots.available_permits() > 0 => match received {
                    Some(event) => {
                        let Ok(slot) = Arc::clone(&slots).acquire_owned().await else {
                            break;
                        };
                        let handler = Arc::clone(&self.handler);
                        in_flight.spawn(async move {
                            handler.handle(event).await;
                            drop(slot);
                        });
                    }
                    None => break,
                },
                Some(ended) = subscriptions.join_next() => {
                    match ended {
                        Err(join_error) if join_error.is_panic() => {
                            error!("event subscription panicked; stopping listener");
                        }
                        Err(join_error) => {
                            error!(error = %join_error, "event subscription task failed; stopping listener");
                        }
                        Ok(()) => warn!("event subscription ended unexpectedly; stopping listener"),
                    }
                    break;
                }
                Some(handled) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(join_error) = handled {
                        error!(error = %join_error, "event handler task failed");
                    }
                }
            }
        }

        // Stop taking events, then give in-flight fan-outs a chance to finish.
        local.cancel();
        drop(rx);
        while subscriptions.join_next().await.is_some() {}

        let pending = in_flight.len();
        if pending > 0 {
            info!(pending, "waiting for in-flight event handlers");
            let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
                while in_flight.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                warn!(
                    abandoned = in_flight.len(),
                    "in-flight event handlers did not finish in time"
                );
                in_flight.abort_all();
            }
        }

        info!("event listener stopped");
    }
}

/// Keep the listener running, restarting it with backoff whenever it stops
/// before `shutdown` fires. A restart replays each stream from the configured
/// start ledger.
pub async fn supervise(listener: Arc<EventListener>, shutdown: CancellationToken) {
    let mut backoff = Backoff::new(
        listener.settings.backoff_base,
        listener.settings.backoff_max,
    )
    .with_jitter(0.2);

    loop {
        let running = Arc::clone(&listener);
        let token = shutdown.clone();
        let handle = tokio::spawn(async move { running.run(token).await });

        if let Err(join_error) = handle.await {
            if join_error.is_panic() {
                error!("event listener panicked");
            } else {
                error!(error = %join_error, "event listener task failed");
            }
        }

        if shutdown.is_cancelled() {
            break;
        }

        let delay = backoff.next_delay();
        warn!(
            restart_count = backoff.attempts(),
            backoff_ms = delay.as_millis() as u64,
            "event listener restart backoff"
        );
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
