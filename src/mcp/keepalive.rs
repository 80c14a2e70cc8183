//! Outbound keepalive ping bookkeeping.
//!
//! At most one ping is outstanding at a time. A timed-out ping only clears
//! the pending state and reports the failure; the connection is kept, since
//! some clients never answer server pings.

use std::time::{Duration, Instant};

use crate::mcp::protocol::RequestId;

/// Default time between pings.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(30);

/// Default time to wait for a pong.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(3);

/// What the server loop should do after a keepalive poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeepaliveAction {
    /// Nothing to do.
    Idle,
    /// The pending ping timed out; the failure callback must fire.
    TimedOut(RequestId),
    /// A new ping is due.
    SendPing,
}

#[derive(Debug, Clone)]
struct PendingPing {
    id: RequestId,
    sent_at: Instant,
}

/// Keepalive state owned by the server loop.
#[derive(Debug, Clone)]
pub struct Keepalive {
    enabled: bool,
    interval: Duration,
    timeout: Duration,
    last_ping_at: Instant,
    pending: Option<PendingPing>,
}

impl Keepalive {
    /// Disabled keepalive with the default interval and timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: false,
            interval: DEFAULT_PING_INTERVAL,
            timeout: DEFAULT_PING_TIMEOUT,
            last_ping_at: Instant::now(),
            pending: None,
        }
    }

    /// Reconfigures pinging. The interval restarts at `now` and any pending
    /// ping is forgotten.
    pub fn configure(&mut self, enabled: bool, interval: Duration, timeout: Duration, now: Instant) {
        self.enabled = enabled;
        self.interval = interval;
        self.timeout = timeout;
        self.last_ping_at = now;
        self.pending = None;
    }

    /// Whether periodic pings are enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Id of the outstanding ping, if any.
    #[must_use]
    pub fn pending_id(&self) -> Option<&RequestId> {
        self.pending.as_ref().map(|p| &p.id)
    }

    /// Advances the state machine.
    ///
    /// A timed-out ping is cleared and reported. Otherwise a ping is due
    /// when pinging is enabled, the session is initialised, nothing is
    /// pending and the interval has elapsed since the last send.
    pub fn poll(&mut self, now: Instant, initialized: bool) -> KeepaliveAction {
        if let Some(pending) = &self.pending {
            if now.saturating_duration_since(pending.sent_at) >= self.timeout {
                let id = pending.id.clone();
                self.pending = None;
                return KeepaliveAction::TimedOut(id);
            }
            return KeepaliveAction::Idle;
        }

        if self.enabled && initialized && now.saturating_duration_since(self.last_ping_at) >= self.interval {
            return KeepaliveAction::SendPing;
        }

        KeepaliveAction::Idle
    }

    /// Records a successfully written ping.
    pub fn record_sent(&mut self, id: RequestId, now: Instant) {
        self.last_ping_at = now;
        self.pending = Some(PendingPing { id, sent_at: now });
    }

    /// Consumes a pong. Returns `true` if `id` answers the pending ping.
    pub fn acknowledge(&mut self, id: &RequestId) -> bool {
        if self.pending_id() == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

impl Default for Keepalive {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping_id() -> RequestId {
        RequestId::String("ping-1".to_string())
    }

    #[test]
    fn disabled_never_sends() {
        let mut keepalive = Keepalive::new();
        let later = Instant::now() + Duration::from_secs(3600);
        assert_eq!(keepalive.poll(later, true), KeepaliveAction::Idle);
    }

    #[test]
    fn waits_for_initialization_and_interval() {
        let start = Instant::now();
        let mut keepalive = Keepalive::new();
        keepalive.configure(true, Duration::from_secs(10), Duration::from_secs(1), start);

        assert_eq!(keepalive.poll(start + Duration::from_secs(11), false), KeepaliveAction::Idle);
        assert_eq!(keepalive.poll(start + Duration::from_secs(5), true), KeepaliveAction::Idle);
        assert_eq!(
            keepalive.poll(start + Duration::from_secs(10), true),
            KeepaliveAction::SendPing
        );
    }

    #[test]
    fn only_one_ping_outstanding() {
        let start = Instant::now();
        let mut keepalive = Keepalive::new();
        keepalive.configure(true, Duration::ZERO, Duration::from_secs(60), start);

        keepalive.record_sent(ping_id(), start);
        assert_eq!(keepalive.pending_id(), Some(&ping_id()));
        assert_eq!(keepalive.poll(start + Duration::from_secs(1), true), KeepaliveAction::Idle);
    }

    #[test]
    fn timeout_clears_pending_once() {
        let start = Instant::now();
        let mut keepalive = Keepalive::new();
        keepalive.configure(true, Duration::ZERO, Duration::ZERO, start);
        keepalive.record_sent(ping_id(), start);

        assert_eq!(keepalive.poll(start, true), KeepaliveAction::TimedOut(ping_id()));
        assert!(keepalive.pending_id().is_none());
        assert_eq!(keepalive.poll(start, true), KeepaliveAction::SendPing);
    }

    #[test]
    fn pong_clears_pending() {
        let start = Instant::now();
        let mut keepalive = Keepalive::new();
        keepalive.configure(true, Duration::from_secs(30), Duration::from_secs(3), start);
        keepalive.record_sent(ping_id(), start);

        assert!(!keepalive.acknowledge(&RequestId::Number(7)));
        assert!(keepalive.pending_id().is_some());
        assert!(keepalive.acknowledge(&ping_id()));
        assert!(keepalive.pending_id().is_none());
    }

    #[test]
    fn reconfigure_forgets_pending() {
        let start = Instant::now();
        let mut keepalive = Keepalive::new();
        keepalive.record_sent(ping_id(), start);
        keepalive.configure(false, DEFAULT_PING_INTERVAL, DEFAULT_PING_TIMEOUT, start);
        assert!(keepalive.pending_id().is_none());
        assert!(!keepalive.is_enabled());
    }
}
