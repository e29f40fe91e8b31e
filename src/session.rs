//! Session wiring: one device, two channels, one event loop.
//!
//! `PanelSession::start` spawns the poll loop, the push supervisor, and
//! the event loop that owns the reconciler. Renderers subscribe to the
//! watch feeds published here and never touch the state machines
//! themselves. Teardown cancels everything and waits; once `shutdown`
//! returns, late network completions have nowhere to land because the
//! event loop that would apply them is gone.

use crate::channel::{
    EventReceiver, PanelEvent, PollChannel, PushChannel, event_channel,
};
use crate::client::DeviceClient;
use crate::config::PanelConfig;
use crate::error::{PanelError, Result};
use crate::reconciler::{Reconciled, Reconciler};
use crate::state::{ConnectionState, RelayId, RelayState};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Renderer view of the relay map.
pub type RelayView = BTreeMap<RelayId, RelayState>;

pub struct PanelSession {
    cancel: CancellationToken,
    relay_rx: watch::Receiver<RelayView>,
    connection_rx: watch::Receiver<ConnectionState>,
    tasks: Vec<JoinHandle<()>>,
}

impl PanelSession {
    /// Build the client, spawn both channels and the event loop, and
    /// hand back the subscription surface. Everything mutable lives in
    /// the spawned event loop; this handle only carries feeds and the
    /// cancel token.
    pub fn start(config: PanelConfig) -> Result<Self> {
        let client = DeviceClient::new(&config.device)?;
        info!("[Panel] Session starting for {}", client.base_url());

        let cancel = CancellationToken::new();
        let (event_tx, event_rx) = event_channel();
        let (relay_tx, relay_rx) = watch::channel(RelayView::new());
        let (connection_tx, connection_rx) = watch::channel(ConnectionState::Disconnected);

        let poll = PollChannel::new(
            client.clone(),
            &config.poll,
            event_tx.clone(),
            cancel.clone(),
        );
        let push = PushChannel::new(client, &config.push, event_tx, cancel.clone());

        let reconciler = Reconciler::new(&config.liveness);
        let event_loop = tokio::spawn(run_event_loop(
            reconciler,
            event_rx,
            relay_tx,
            connection_tx,
            cancel.clone(),
            config.poll.interval(),
        ));

        Ok(Self {
            cancel,
            relay_rx,
            connection_rx,
            tasks: vec![poll.spawn(), push.spawn(), event_loop],
        })
    }

    /// Feed of the displayed relay states. Updated once per applied
    /// snapshot that changed something.
    pub fn relay_states(&self) -> watch::Receiver<RelayView> {
        self.relay_rx.clone()
    }

    /// Feed of the connection indicator.
    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.connection_rx.clone()
    }

    /// Stop the channels and the event loop and wait for them. Safe to
    /// call more than once; later calls find nothing left to stop.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        debug!("[Panel] Session shut down");
    }
}

async fn run_event_loop(
    mut reconciler: Reconciler,
    mut events: EventReceiver,
    relay_tx: watch::Sender<RelayView>,
    connection_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    check_period: Duration,
) {
    // Staleness is swept at the poll cadence; a finer timer would only
    // re-run a check that is idempotent anyway
    let mut sweep = tokio::time::interval(check_period);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let step = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => apply_event(&mut reconciler, event),
                None => break,
            },
            _ = sweep.tick() => {
                let now = Instant::now();
                let step = reconciler.on_staleness_check(now);
                if step.transition.is_some() {
                    let silent_ms = reconciler
                        .monitor()
                        .last_success()
                        .map(|at| now.duration_since(at).as_millis() as u64)
                        .unwrap_or(0);
                    warn!("[Monitor] {}", PanelError::StaleData(silent_ms));
                }
                step
            }
        };

        publish(&reconciler, &step, &relay_tx, &connection_tx);
    }

    debug!("[Panel] Event loop stopped");
}

fn apply_event(reconciler: &mut Reconciler, event: PanelEvent) -> Reconciled {
    match event {
        PanelEvent::Snapshot(snapshot) => reconciler.on_snapshot(&snapshot),
        PanelEvent::Channel { channel, outcome } => {
            reconciler.on_channel_event(channel, outcome, Instant::now())
        }
    }
}

fn publish(
    reconciler: &Reconciler,
    step: &Reconciled,
    relay_tx: &watch::Sender<RelayView>,
    connection_tx: &watch::Sender<ConnectionState>,
) {
    if !step.changed.is_empty() {
        let _ = relay_tx.send(reconciler.store().current());
    }

    if let Some(state) = step.transition {
        match state {
            ConnectionState::Connected => info!("[Monitor] Device connected"),
            ConnectionState::Disconnected => warn!("[Monitor] Device disconnected"),
        }
        let _ = connection_tx.send(state);
    }
}
