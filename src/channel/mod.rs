//! Input channels feeding the session's event loop.
//!
//! Both channels observe the device independently and forward what they
//! see as `PanelEvent`s over one mpsc pair; neither touches shared state
//! directly. Within a channel, events arrive in delivery order; across
//! channels no order is guaranteed.

pub mod poll;
pub mod push;
pub mod sse;

pub use poll::PollChannel;
pub use push::{PushChannel, PushState};

use crate::state::StatusSnapshot;
use strum::Display;
use tokio::sync::mpsc;

/// Which channel produced an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ChannelKind {
    #[strum(serialize = "push")]
    Push,
    #[strum(serialize = "poll")]
    Poll,
}

impl ChannelKind {
    /// The redundant counterpart.
    pub fn other(self) -> Self {
        match self {
            ChannelKind::Push => ChannelKind::Poll,
            ChannelKind::Poll => ChannelKind::Push,
        }
    }
}

/// Result of one attempt on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    Success,
    Failure,
}

/// What channels send to the session task. A `Snapshot` counts as a
/// success for its source channel on top of carrying data, so channels
/// send it alone; `Channel` events carry liveness with no data attached.
#[derive(Debug, Clone)]
pub enum PanelEvent {
    Snapshot(StatusSnapshot),
    Channel {
        channel: ChannelKind,
        outcome: ChannelOutcome,
    },
}

pub type EventSender = mpsc::Sender<PanelEvent>;
pub type EventReceiver = mpsc::Receiver<PanelEvent>;

/// Bounded event channel shared by both input channels.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_channel() {
        assert_eq!(ChannelKind::Push.other(), ChannelKind::Poll);
        assert_eq!(ChannelKind::Poll.other(), ChannelKind::Push);
    }

    #[test]
    fn test_channel_kind_display() {
        assert_eq!(ChannelKind::Push.to_string(), "push");
        assert_eq!(ChannelKind::Poll.to_string(), "poll");
    }
}
