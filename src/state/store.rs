//! Last-known relay state, the single source of truth for rendering.
//!
//! The store never talks to the network: channels parse status reads into
//! `StatusSnapshot`s and the session applies them here. A relay missing
//! from a snapshot keeps its previous value; there is no implicit reset.

use crate::channel::ChannelKind;
use crate::protocol::RelayFields;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use strum::Display;

/// Identifier of one relay output. Open set: today's firmware exposes
/// "door" and "light", but the store handles any name it is given.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelayId(String);

impl RelayId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn door() -> Self {
        Self::new("door")
    }

    pub fn light() -> Self {
        Self::new("light")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RelayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Binary state of a relay output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RelayState {
    #[strum(serialize = "ON")]
    On,
    #[strum(serialize = "OFF")]
    Off,
}

impl From<bool> for RelayState {
    fn from(on: bool) -> Self {
        if on { RelayState::On } else { RelayState::Off }
    }
}

impl RelayState {
    pub fn is_on(self) -> bool {
        matches!(self, RelayState::On)
    }
}

/// One consistent read of relay states from a single channel. Immutable
/// after construction.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub relays: BTreeMap<RelayId, RelayState>,
    pub source: ChannelKind,
    pub received_at: Instant,
}

impl StatusSnapshot {
    pub fn new(relays: BTreeMap<RelayId, RelayState>, source: ChannelKind) -> Self {
        Self {
            relays,
            source,
            received_at: Instant::now(),
        }
    }

    /// Snapshot from a wire-level relay map.
    pub fn from_fields(fields: RelayFields, source: ChannelKind) -> Self {
        let mut relays = BTreeMap::new();
        relays.insert(RelayId::door(), RelayState::from(fields.door));
        relays.insert(RelayId::light(), RelayState::from(fields.light));
        Self::new(relays, source)
    }
}

/// Stored value plus where and when it came from.
#[derive(Debug, Clone, Copy)]
pub struct RelayEntry {
    pub state: RelayState,
    pub source: ChannelKind,
    pub updated_at: Instant,
}

/// Holds the current value per relay. Applying a snapshot reports which
/// displayed values actually changed, so the session can notify renderers
/// once per apply and only when something moved.
#[derive(Debug, Default)]
pub struct RelayStateStore {
    relays: BTreeMap<RelayId, RelayEntry>,
}

impl RelayStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a snapshot: last write wins per relay id. Returns the ids
    /// whose displayed state changed. Ids absent from the snapshot are
    /// untouched; a re-confirmation of the same value refreshes the
    /// entry's source and timestamp without entering the changed set.
    pub fn apply(&mut self, snapshot: &StatusSnapshot) -> BTreeSet<RelayId> {
        let mut changed = BTreeSet::new();

        for (id, &state) in &snapshot.relays {
            let previous = self.relays.insert(
                id.clone(),
                RelayEntry {
                    state,
                    source: snapshot.source,
                    updated_at: snapshot.received_at,
                },
            );

            if previous.map(|e| e.state) != Some(state) {
                changed.insert(id.clone());
            }
        }

        changed
    }

    /// Read-only view of the displayed states.
    pub fn current(&self) -> BTreeMap<RelayId, RelayState> {
        self.relays
            .iter()
            .map(|(id, entry)| (id.clone(), entry.state))
            .collect()
    }

    pub fn get(&self, id: &RelayId) -> Option<RelayState> {
        self.relays.get(id).map(|entry| entry.state)
    }

    /// Full entries including source and update time, for renderers that
    /// show data age.
    pub fn entries(&self) -> &BTreeMap<RelayId, RelayEntry> {
        &self.relays
    }
}
