//! ID utilities (ULIDs).

use ulid::Ulid;

/// Process-unique identifier of one websocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Ulid);

impl ConnectionId {
    pub fn new() -> Self { Self(Ulid::new()) }
}

impl Default for ConnectionId {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // last 10 chars carry the random part, enough to tell connections apart in logs
        let s = self.0.to_string();
        f.write_str(&s[s.len() - 10..])
    }
}
