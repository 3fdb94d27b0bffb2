//! Binding statistics.

use std::fmt;

/// Live proxy counts, read from the pools' in-use counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BindingStats {
    /// Socket proxies.
    pub sockets: usize,
    /// Session proxies.
    pub sessions: usize,
    /// Channel proxies.
    pub channels: usize,
    /// Message proxies.
    pub messages: usize,
    /// Sends awaiting completion.
    pub completions: usize,
    /// Sockets in the running set.
    pub running: usize,
}

impl BindingStats {
    /// Total number of live proxies of all kinds.
    pub fn proxies(&self) -> usize {
        self.sockets + self.sessions + self.channels + self.messages
    }
}

impl fmt::Display for BindingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sockets={} sessions={} channels={} messages={} completions={} running={}",
            self.sockets, self.sessions, self.channels, self.messages, self.completions, self.running
        )
    }
}
