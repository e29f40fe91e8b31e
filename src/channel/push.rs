//! Event-stream subscription with explicit reconnect.
//!
//! One logical subscription to `GET /events`, run as a supervisor loop:
//! each iteration opens the stream, pumps it through the SSE parser, and
//! on any loss reports a failure and retries with capped exponential
//! backoff. Stalls count as losses: the firmware sends no keepalives, so
//! a silent socket longer than the stall timeout is treated as dead even
//! though the transport still looks open.

use crate::channel::sse::{SseEvent, SseParser};
use crate::channel::{ChannelKind, ChannelOutcome, EventSender, PanelEvent};
use crate::client::DeviceClient;
use crate::config::PushConfig;
use crate::error::{PanelError, Result};
use crate::protocol::{PushEnvelope, PushKind, RelayFields};
use crate::state::StatusSnapshot;
use futures_util::StreamExt;
use log::{debug, info, warn};
use rand::Rng;
use std::time::Duration;
use strum::Display;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lifecycle of the logical subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PushState {
    #[strum(serialize = "connecting")]
    Connecting,
    #[strum(serialize = "open")]
    Open,
    #[strum(serialize = "stalled")]
    Stalled,
    #[strum(serialize = "closed")]
    Closed,
}

pub struct PushChannel {
    client: DeviceClient,
    config: PushConfig,
    events: EventSender,
    cancel: CancellationToken,
    state: PushState,
    parse_failures: u64,
}

impl PushChannel {
    pub fn new(
        client: DeviceClient,
        config: &PushConfig,
        events: EventSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            config: config.clone(),
            events,
            cancel,
            state: PushState::Closed,
            parse_failures: 0,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        let mut attempt: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            self.set_state(PushState::Connecting);

            match self.run_subscription(&mut attempt).await {
                // Ok means we were told to stop mid-stream
                Ok(()) => break,
                Err(e) => {
                    self.set_state(PushState::Closed);
                    warn!("[Push] Subscription lost: {}", e);
                    self.report(ChannelOutcome::Failure).await;
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }
            attempt = attempt.saturating_add(1);
            let delay = self.backoff_delay(attempt);
            debug!("[Push] Reconnect attempt {} in {:?}", attempt, delay);

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        debug!("[Push] Subscription loop stopped");
    }

    /// Drive one subscription until it dies. Returns Ok only when asked
    /// to stop; every other exit is an error the supervisor retries.
    async fn run_subscription(&mut self, attempt: &mut u32) -> Result<()> {
        let resp = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(()),
            resp = self.client.subscribe_events() => resp?,
        };

        // Headers are in: the device is reachable even before its
        // `connected` acknowledgment arrives on the stream
        self.set_state(PushState::Open);
        *attempt = 0;
        info!("[Push] Event stream open");
        self.report(ChannelOutcome::Success).await;

        let mut stream = resp.bytes_stream();
        let mut parser = SseParser::new();

        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                next = tokio::time::timeout(self.config.stall_timeout(), stream.next()) => next,
            };

            let chunk = match next {
                Err(_elapsed) => {
                    self.set_state(PushState::Stalled);
                    return Err(PanelError::StreamStalled(self.config.stall_timeout_ms));
                }
                Ok(None) => return Err(PanelError::StreamClosed),
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(Some(Ok(chunk))) => chunk,
            };

            for event in parser.push(&chunk) {
                self.handle_event(event).await;
            }
        }
    }

    async fn handle_event(&mut self, event: SseEvent) {
        match PushKind::from(event.event.as_str()) {
            PushKind::Connected => {
                debug!("[Push] Liveness acknowledgment from device");
                self.report(ChannelOutcome::Success).await;
            }
            PushKind::RelayStatus => self.handle_relay_status(&event.data).await,
            PushKind::SystemStatus => {
                debug!("[Push] Ignoring system status event");
            }
            PushKind::Unknown(name) => {
                debug!("[Push] Ignoring unknown event kind: {}", name);
            }
        }
    }

    /// Parse and forward one relay status payload. Anything malformed or
    /// incomplete is discarded here: a partial update must never reach
    /// the store, and a bad payload must not cost the open stream its
    /// connected verdict.
    async fn handle_relay_status(&mut self, data: &str) {
        let envelope: PushEnvelope = match serde_json::from_str(data) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.parse_failures += 1;
                warn!(
                    "[Push] Discarding malformed payload ({} total): {}",
                    self.parse_failures, e
                );
                return;
            }
        };

        // The payload repeats the kind; trust the tag like the panel
        // page does and drop anything that disagrees with the event name
        match PushKind::from(envelope.kind.as_str()) {
            PushKind::RelayStatus => {}
            other => {
                debug!("[Push] Ignoring payload tagged {:?}", other);
                return;
            }
        }

        match serde_json::from_value::<RelayFields>(envelope.data) {
            Ok(fields) => {
                self.send(PanelEvent::Snapshot(StatusSnapshot::from_fields(
                    fields,
                    ChannelKind::Push,
                )))
                .await;
            }
            Err(e) => {
                self.parse_failures += 1;
                warn!(
                    "[Push] Discarding partial relay status ({} total): {}",
                    self.parse_failures, e
                );
            }
        }
    }

    async fn report(&self, outcome: ChannelOutcome) {
        self.send(PanelEvent::Channel {
            channel: ChannelKind::Push,
            outcome,
        })
        .await;
    }

    async fn send(&self, event: PanelEvent) {
        if self.events.send(event).await.is_err() {
            // Receiver gone: the session is tearing down
            self.cancel.cancel();
        }
    }

    fn set_state(&mut self, next: PushState) {
        if self.state != next {
            debug!("[Push] {} -> {}", self.state, next);
            self.state = next;
        }
    }

    /// Delay before reconnect `attempt` (1-based): exponential from the
    /// configured base, capped, with ±25% jitter so a fleet of panels
    /// does not hammer a rebooting device in lockstep.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = backoff_base_ms(&self.config, attempt);
        let jitter = base / 4;
        let low = base.saturating_sub(jitter);
        let high = base.saturating_add(jitter);
        Duration::from_millis(rand::thread_rng().gen_range(low..=high))
    }
}

fn backoff_base_ms(config: &PushConfig, attempt: u32) -> u64 {
    let exponent = attempt.saturating_sub(1).min(5);
    config
        .backoff_base_ms
        .saturating_mul(2_u64.saturating_pow(exponent))
        .min(config.backoff_max_ms)
}
