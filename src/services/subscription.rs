//! Resumable subscription to one contract event stream.
//!
//! A subscription pages through `getEvents` starting at the configured ledger
//! and keeps the returned cursor, so a failed poll is retried from the same
//! position after a backoff. Replays after a reconnect are possible; handlers
//! must tolerate seeing an event twice.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use crate::config::ListenerConfig;
use crate::error::LedgerError;
use crate::ledger::{parse, LedgerClient, StreamPosition};
use crate::models::{EventKind, LedgerEvent};

enum PollOutcome {
    /// Number of events the ledger returned (malformed ones included)
    Fetched(usize),
    /// The receiving side is gone
    Closed,
}

pub struct Subscription {
    kind: EventKind,
    ledger: Arc<dyn LedgerClient>,
    position: StreamPosition,
    poll_interval: Duration,
    page_limit: u32,
    backoff: Backoff,
    events: mpsc::Sender<LedgerEvent>,
}

impl Subscription {
    pub fn new(
        kind: EventKind,
        ledger: Arc<dyn LedgerClient>,
        settings: &ListenerConfig,
        events: mpsc::Sender<LedgerEvent>,
    ) -> Self {
        Self {
            kind,
            ledger,
            position: StreamPosition::FromLedger(settings.start_ledger),
            poll_interval: settings.poll_interval,
            page_limit: settings.page_limit.max(1),
            backoff: Backoff::new(settings.backoff_base, settings.backoff_max).with_jitter(0.2),
            events,
        }
    }

    /// Poll until `shutdown` fires or the receiver is dropped.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(stream = %self.kind, position = ?self.position, "subscribed to contract events");

        loop {
            let outcome = tokio::select! {
                _ = shutdown.cancelled() => break,
                outcome = self.poll_once() => outcome,
            };

            let pause = match outcome {
                Ok(PollOutcome::Fetched(fetched)) => {
                    if self.backoff.attempts() > 0 {
                        info!(stream = %self.kind, position = ?self.position, "event subscription resumed");
                    }
                    self.backoff.reset();
                    // a full page means more is waiting
                    if fetched >= self.page_limit as usize {
                        Duration::ZERO
                    } else {
                        self.poll_interval
                    }
                }
                Ok(PollOutcome::Closed) => {
                    debug!(stream = %self.kind, "event receiver dropped");
                    break;
                }
                Err(err) => {
                    let delay = self.backoff.next_delay();
                    warn!(
                        stream = %self.kind,
                        error = %err,
                        attempt = self.backoff.attempts(),
                        retry_in_ms = delay.as_millis() as u64,
                        "event subscription failed, resubscribing"
                    );
                    delay
                }
            };

            if !pause.is_zero() {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }

        info!(stream = %self.kind, "event subscription stopped");
    }

    async fn poll_once(&mut self) -> Result<PollOutcome, LedgerError> {
        let page = self
            .ledger
            .fetch_events(self.kind, &self.position, self.page_limit)
            .await?;

        for raw in &page.events {
            match parse::decode_event(self.kind, raw) {
                Ok(event) => {
                    if self.events.send(event).await.is_err() {
                        return Ok(PollOutcome::Closed);
                    }
                }
                Err(err) => {
                    warn!(
                        stream = %self.kind,
                        event_id = ?raw.id,
                        ledger = raw.ledger,
                        error = %err,
                        "dropping malformed event"
                    );
                }
            }
        }

        if let Some(cursor) = page.cursor {
            self.position = StreamPosition::After(cursor);
        } else if let Some(last) = page.events.iter().map(|event| event.ledger).max() {
            self.position = StreamPosition::FromLedger(last.saturating_add(1));
        }

        Ok(PollOutcome::Fetched(page.events.len()))
    }
}
