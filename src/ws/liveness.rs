//! Heartbeat bookkeeping for one connection.

use std::time::Instant;

/// Last ping sent and last pong received. A connection that has not answered
/// the previous ping by the next sweep is considered dead.
#[derive(Debug, Clone, Copy)]
pub struct Liveness {
    last_ping: Option<Instant>,
    last_ack: Instant,
}

impl Liveness {
    pub fn new(now: Instant) -> Self {
        Self { last_ping: None, last_ack: now }
    }

    pub fn ack(&mut self, now: Instant) {
        self.last_ack = now;
    }

    pub fn pinged(&mut self, now: Instant) {
        self.last_ping = Some(now);
    }

    /// True when a ping is outstanding with no pong after it.
    pub fn is_stale(&self) -> bool {
        matches!(self.last_ping, Some(ping) if self.last_ack < ping)
    }
}
