//! Merge policy between the two channels and the owned state.
//!
//! The reconciler is the only code that mutates the relay store and the
//! connection monitor. Channels never write shared state; they send
//! events, and the session task calls exactly one of the entry points
//! here per event. Neither channel outranks the other: whichever
//! snapshot arrives last wins, per relay id.

use crate::channel::{ChannelKind, ChannelOutcome};
use crate::config::LivenessConfig;
use crate::state::{ConnectionMonitor, ConnectionState, RelayId, RelayStateStore, StatusSnapshot};
use log::debug;
use std::collections::BTreeSet;
use std::time::Instant;

/// What one reconciliation step changed. The session publishes renderer
/// notifications from this: one relay notification per non-empty changed
/// set, one connection notification per transition.
#[derive(Debug, Default)]
pub struct Reconciled {
    pub changed: BTreeSet<RelayId>,
    pub transition: Option<ConnectionState>,
}

pub struct Reconciler {
    store: RelayStateStore,
    monitor: ConnectionMonitor,
}

impl Reconciler {
    pub fn new(liveness: &LivenessConfig) -> Self {
        Self {
            store: RelayStateStore::new(),
            monitor: ConnectionMonitor::new(liveness),
        }
    }

    pub fn store(&self) -> &RelayStateStore {
        &self.store
    }

    pub fn monitor(&self) -> &ConnectionMonitor {
        &self.monitor
    }

    /// A snapshot is data and proof of life in one: merge it into the
    /// store and credit its source channel with a success at the
    /// snapshot's arrival time.
    pub fn on_snapshot(&mut self, snapshot: &StatusSnapshot) -> Reconciled {
        let changed = self.store.apply(snapshot);
        let transition = self
            .monitor
            .record_success(snapshot.source, snapshot.received_at);

        for id in &changed {
            if let Some(state) = self.store.get(id) {
                debug!("[Reconcile] {} -> {} (via {})", id, state, snapshot.source);
            }
        }

        Reconciled { changed, transition }
    }

    /// Liveness-only observation from a channel.
    pub fn on_channel_event(
        &mut self,
        channel: ChannelKind,
        outcome: ChannelOutcome,
        now: Instant,
    ) -> Reconciled {
        let transition = match outcome {
            ChannelOutcome::Success => self.monitor.record_success(channel, now),
            ChannelOutcome::Failure => self.monitor.record_failure(channel, now),
        };

        Reconciled {
            changed: BTreeSet::new(),
            transition,
        }
    }

    /// Timer-driven staleness sweep.
    pub fn on_staleness_check(&mut self, now: Instant) -> Reconciled {
        Reconciled {
            changed: BTreeSet::new(),
            transition: self.monitor.check_staleness(now),
        }
    }
}
