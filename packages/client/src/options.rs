//! Per-request option sets.
//!
//! Options are immutable values built with consuming setters. A default
//! instance requests nothing and contributes nothing to the wire request,
//! which is what [`QueryOptions::is_default`] and [`WriteOptions::is_default`]
//! check.

use std::time::Duration;

/// Read consistency requested from the servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsistencyMode {
    /// Leader-served reads that may be stale for a short window after a
    /// leadership change.
    #[default]
    Default,
    /// Leader-verified reads; one extra round trip.
    Consistent,
    /// Any server may answer.
    Stale,
}

/// Options for read operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryOptions {
    pub datacenter: Option<String>,
    pub consistency: ConsistencyMode,
    /// Last index seen. Setting it turns the read into a blocking query.
    pub wait_index: Option<u64>,
    /// Upper bound on how long a blocking query may be held.
    pub wait_time: Option<Duration>,
    /// Sort results by round-trip time from this node (`_agent` for the local one).
    pub near: Option<String>,
    pub token: Option<String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn datacenter(mut self, dc: impl Into<String>) -> Self {
        self.datacenter = Some(dc.into());
        self
    }

    pub fn consistency(mut self, mode: ConsistencyMode) -> Self {
        self.consistency = mode;
        self
    }

    pub fn wait_index(mut self, index: u64) -> Self {
        self.wait_index = Some(index);
        self
    }

    pub fn wait_time(mut self, wait: Duration) -> Self {
        self.wait_time = Some(wait);
        self
    }

    pub fn near(mut self, node: impl Into<String>) -> Self {
        self.near = Some(node.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// `true` when this read will be held open by the server.
    pub fn is_blocking(&self) -> bool {
        self.wait_index.is_some()
    }
}

/// Options for write operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WriteOptions {
    pub datacenter: Option<String>,
    pub token: Option<String>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn datacenter(mut self, dc: impl Into<String>) -> Self {
        self.datacenter = Some(dc.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_options_are_default() {
        assert!(QueryOptions::new().is_default());
        assert!(WriteOptions::new().is_default());
    }

    #[test]
    fn any_field_makes_options_non_default() {
        assert!(!QueryOptions::new().consistency(ConsistencyMode::Stale).is_default());
        assert!(!QueryOptions::new().wait_index(0).is_default());
        assert!(!QueryOptions::new().token("t").is_default());
        assert!(!WriteOptions::new().datacenter("dc2").is_default());
    }

    #[test]
    fn setters_leave_the_source_untouched() {
        let base = QueryOptions::new().datacenter("dc1");
        let blocking = base.clone().wait_index(7);
        assert_eq!(base.wait_index, None);
        assert!(blocking.is_blocking());
        assert_eq!(blocking.datacenter.as_deref(), Some("dc1"));
    }
}
