//! Replay statistics and driver state.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Driver lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverState {
    /// No replay started yet
    Idle,
    /// Consuming trace lines
    Reading,
    /// Every line consumed
    Finished,
    /// Stopped on a fatal error
    Aborted,
}

impl std::fmt::Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Reading => "reading",
            Self::Finished => "finished",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Outcome of routing one trace line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Delivery {
    /// Appended to the destination's history
    Delivered,
    /// Destination had no responders for the kind
    Dropped,
}

/// Counters over one or more replays
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayStats {
    /// Trace lines routed
    pub lines: u64,
    /// Messages delivered
    pub delivered: u64,
    /// Messages dropped
    pub dropped: u64,
    /// Dropped messages per message kind
    pub dropped_by_kind: IndexMap<String, u64>,
    /// Entities created lazily
    pub entities_created: u64,
}

impl ReplayStats {
    /// Create empty stats
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one routed line
    pub fn record(&mut self, delivery: Delivery, kind: &str) {
        self.lines += 1;
        match delivery {
            Delivery::Delivered => self.delivered += 1,
            Delivery::Dropped => {
                self.dropped += 1;
                *self.dropped_by_kind.entry(kind.to_string()).or_insert(0) += 1;
            }
        }
    }

    /// Add another set of counters into this one
    pub fn merge(&mut self, other: &ReplayStats) {
        self.lines += other.lines;
        self.delivered += other.delivered;
        self.dropped += other.dropped;
        self.entities_created += other.entities_created;
        for (kind, count) in &other.dropped_by_kind {
            *self.dropped_by_kind.entry(kind.clone()).or_insert(0) += count;
        }
    }
}

/// Result of a single `read_trace`/`replay` run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
    /// Where the lines came from
    pub source: String,
    /// Counters for this run only
    pub stats: ReplayStats,
    /// Entities known after the run
    pub entities: usize,
}

impl std::fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} lines, {} delivered, {} dropped, {} entities ({} new)",
            self.source,
            self.stats.lines,
            self.stats.delivered,
            self.stats.dropped,
            self.entities,
            self.stats.entities_created
        )
    }
}
