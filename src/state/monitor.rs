//! Connection liveness from dual-channel evidence.
//!
//! The push stream and the poll loop are redundant liveness sources: one
//! failing while the other recently succeeded keeps the panel connected.
//! A transport can also sit open while silently dead, so a staleness
//! check runs on a timer and drops the state when neither channel has
//! produced anything for too long.

use crate::channel::ChannelKind;
use crate::config::LivenessConfig;
use std::time::{Duration, Instant};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConnectionState {
    #[strum(serialize = "connected")]
    Connected,
    #[strum(serialize = "disconnected")]
    Disconnected,
}

/// Attempt bookkeeping for one channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelHealth {
    pub last_attempt: Option<Instant>,
    pub last_success: Option<Instant>,
    pub consecutive_failures: u32,
}

impl ChannelHealth {
    fn success(&mut self, now: Instant) {
        self.last_attempt = Some(now);
        self.last_success = Some(now);
        self.consecutive_failures = 0;
    }

    fn failure(&mut self, now: Instant) {
        self.last_attempt = Some(now);
        self.consecutive_failures += 1;
    }

    /// Whether this channel succeeded within `window` of `now`.
    pub fn succeeded_within(&self, window: Duration, now: Instant) -> bool {
        self.last_success
            .is_some_and(|at| now.duration_since(at) <= window)
    }
}

/// State machine owning the connection indicator. All methods take `now`
/// explicitly; nothing here reads the clock or arms timers, so the
/// liveness rules are testable as plain calls.
///
/// Transition methods return `Some(new_state)` only when the state
/// actually changed, which is what makes every transition observable
/// exactly once.
#[derive(Debug)]
pub struct ConnectionMonitor {
    state: ConnectionState,
    push: ChannelHealth,
    poll: ChannelHealth,
    staleness_threshold: Duration,
    recency_window: Duration,
}

impl ConnectionMonitor {
    pub fn new(config: &LivenessConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            push: ChannelHealth::default(),
            poll: ChannelHealth::default(),
            staleness_threshold: config.staleness_threshold(),
            recency_window: config.recency_window(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn health(&self, channel: ChannelKind) -> &ChannelHealth {
        match channel {
            ChannelKind::Push => &self.push,
            ChannelKind::Poll => &self.poll,
        }
    }

    fn health_mut(&mut self, channel: ChannelKind) -> &mut ChannelHealth {
        match channel {
            ChannelKind::Push => &mut self.push,
            ChannelKind::Poll => &mut self.poll,
        }
    }

    /// Most recent success across both channels.
    pub fn last_success(&self) -> Option<Instant> {
        match (self.push.last_success, self.poll.last_success) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Any successful read from either channel means the device is
    /// reachable right now.
    pub fn record_success(
        &mut self,
        channel: ChannelKind,
        now: Instant,
    ) -> Option<ConnectionState> {
        self.health_mut(channel).success(now);
        self.transition(ConnectionState::Connected)
    }

    /// A failed attempt disconnects only when the other channel has no
    /// success inside the recency window; otherwise the redundant
    /// channel carries the liveness verdict.
    pub fn record_failure(
        &mut self,
        channel: ChannelKind,
        now: Instant,
    ) -> Option<ConnectionState> {
        self.health_mut(channel).failure(now);

        if self
            .health(channel.other())
            .succeeded_within(self.recency_window, now)
        {
            return None;
        }
        self.transition(ConnectionState::Disconnected)
    }

    /// Timer-driven guard against channels that stop emitting without
    /// signaling failure. A no-op unless currently connected, so
    /// repeated checks cannot re-fire the transition.
    pub fn check_staleness(&mut self, now: Instant) -> Option<ConnectionState> {
        if self.state == ConnectionState::Disconnected {
            return None;
        }

        let fresh = self.push.succeeded_within(self.staleness_threshold, now)
            || self.poll.succeeded_within(self.staleness_threshold, now);
        if fresh {
            return None;
        }
        self.transition(ConnectionState::Disconnected)
    }

    fn transition(&mut self, next: ConnectionState) -> Option<ConnectionState> {
        if self.state == next {
            return None;
        }
        self.state = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> ConnectionMonitor {
        ConnectionMonitor::new(&LivenessConfig {
            staleness_threshold_ms: 6000,
            recency_window_ms: 2000,
        })
    }

    #[test]
    fn test_initially_disconnected() {
        let monitor = monitor();
        assert_eq!(monitor.state(), ConnectionState::Disconnected);
        assert!(monitor.last_success().is_none());
    }

    #[test]
    fn test_first_success_connects_once() {
        let mut monitor = monitor();
        let t0 = Instant::now();

        assert_eq!(
            monitor.record_success(ChannelKind::Poll, t0),
            Some(ConnectionState::Connected)
        );
        // Further successes keep the state without re-firing
        assert_eq!(monitor.record_success(ChannelKind::Push, t0), None);
        assert_eq!(monitor.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_push_failure_with_recent_poll_stays_connected() {
        let mut monitor = monitor();
        let t0 = Instant::now();

        monitor.record_success(ChannelKind::Poll, t0);
        let verdict = monitor.record_failure(ChannelKind::Push, t0 + Duration::from_secs(1));

        assert_eq!(verdict, None);
        assert_eq!(monitor.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_push_failure_with_stale_poll_disconnects() {
        let mut monitor = monitor();
        let t0 = Instant::now();

        monitor.record_success(ChannelKind::Poll, t0);
        // Poll's last success is now outside the 2s recency window
        let verdict = monitor.record_failure(ChannelKind::Push, t0 + Duration::from_secs(3));

        assert_eq!(verdict, Some(ConnectionState::Disconnected));
    }

    #[test]
    fn test_poll_failure_with_recent_push_stays_connected() {
        let mut monitor = monitor();
        let t0 = Instant::now();

        monitor.record_success(ChannelKind::Push, t0);
        let verdict = monitor.record_failure(ChannelKind::Poll, t0 + Duration::from_secs(1));

        assert_eq!(verdict, None);
        assert_eq!(monitor.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_failure_before_any_success_stays_disconnected_quietly() {
        let mut monitor = monitor();
        let verdict = monitor.record_failure(ChannelKind::Poll, Instant::now());

        // Already disconnected: no transition to observe
        assert_eq!(verdict, None);
        assert_eq!(monitor.state(), ConnectionState::Disconnected);
        assert_eq!(monitor.health(ChannelKind::Poll).consecutive_failures, 1);
    }

    #[test]
    fn test_staleness_fires_exactly_once() {
        let mut monitor = monitor();
        let t0 = Instant::now();
        monitor.record_success(ChannelKind::Poll, t0);

        let late = t0 + Duration::from_secs(7);
        assert_eq!(
            monitor.check_staleness(late),
            Some(ConnectionState::Disconnected)
        );
        // Re-checking must not re-fire
        assert_eq!(monitor.check_staleness(late), None);
        assert_eq!(monitor.check_staleness(late + Duration::from_secs(60)), None);
    }

    #[test]
    fn test_staleness_spares_fresh_channels() {
        let mut monitor = monitor();
        let t0 = Instant::now();
        monitor.record_success(ChannelKind::Poll, t0);

        assert_eq!(monitor.check_staleness(t0 + Duration::from_secs(5)), None);
        assert_eq!(monitor.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_reconnect_after_staleness() {
        let mut monitor = monitor();
        let t0 = Instant::now();
        monitor.record_success(ChannelKind::Poll, t0);
        monitor.check_staleness(t0 + Duration::from_secs(10));
        assert_eq!(monitor.state(), ConnectionState::Disconnected);

        let verdict = monitor.record_success(ChannelKind::Push, t0 + Duration::from_secs(11));
        assert_eq!(verdict, Some(ConnectionState::Connected));
    }

    #[test]
    fn test_consecutive_failures_reset_on_success() {
        let mut monitor = monitor();
        let t0 = Instant::now();

        monitor.record_failure(ChannelKind::Push, t0);
        monitor.record_failure(ChannelKind::Push, t0 + Duration::from_secs(1));
        assert_eq!(monitor.health(ChannelKind::Push).consecutive_failures, 2);

        monitor.record_success(ChannelKind::Push, t0 + Duration::from_secs(2));
        assert_eq!(monitor.health(ChannelKind::Push).consecutive_failures, 0);
        assert_eq!(monitor.last_success(), Some(t0 + Duration::from_secs(2)));
    }
}
