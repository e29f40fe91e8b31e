//! Periodic status polling.
//!
//! One request per tick, and the request shares the task with the ticker,
//! so a slow device delays the next poll instead of stacking requests on
//! it. Missed ticks are skipped outright.

use crate::channel::{ChannelKind, ChannelOutcome, EventSender, PanelEvent};
use crate::client::DeviceClient;
use crate::config::PollConfig;
use crate::protocol::StatusResponse;
use crate::state::StatusSnapshot;
use log::{debug, warn};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub struct PollChannel {
    client: DeviceClient,
    interval: Duration,
    events: EventSender,
    cancel: CancellationToken,
}

impl PollChannel {
    pub fn new(
        client: DeviceClient,
        config: &PollConfig,
        events: EventSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            interval: config.interval(),
            events,
            cancel,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.client.fetch_status_body() => result,
            };

            let event = match result {
                Ok(body) => match serde_json::from_str::<StatusResponse>(&body) {
                    Ok(status) => PanelEvent::Snapshot(StatusSnapshot::from_fields(
                        status.relays,
                        ChannelKind::Poll,
                    )),
                    Err(e) => {
                        warn!("[Poll] Discarding malformed status body: {}", e);
                        // The 2xx already proved the device reachable;
                        // only the payload is lost
                        PanelEvent::Channel {
                            channel: ChannelKind::Poll,
                            outcome: ChannelOutcome::Success,
                        }
                    }
                },
                Err(e) => {
                    debug!("[Poll] Status request failed: {}", e);
                    PanelEvent::Channel {
                        channel: ChannelKind::Poll,
                        outcome: ChannelOutcome::Failure,
                    }
                }
            };

            if self.events.send(event).await.is_err() {
                // Session is gone
                break;
            }
        }

        debug!("[Poll] Poll loop stopped");
    }
}
