use serde::Serialize;
use std::time::Instant;

/// Delivery statistics for one output bridge.
pub struct BridgeStats {
    delivered_count: u64,
    drop_count: u64,
    start_time: Instant,
    last_event_time: Option<Instant>,
    warned_on_drop: bool,
}

/// Snapshot of bridge stats for serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeSnapshot {
    pub label: String,
    pub events_per_sec: f64,
    pub delivered_count: u64,
    pub drop_count: u64,
    pub drop_rate: f64,
    pub queued: usize,
    pub closed: bool,
}

impl BridgeStats {
    pub fn new() -> Self {
        Self {
            delivered_count: 0,
            drop_count: 0,
            start_time: Instant::now(),
            last_event_time: None,
            warned_on_drop: false,
        }
    }

    /// Record an event handed to the consumer.
    pub fn record_event(&mut self) {
        self.delivered_count += 1;
        self.last_event_time = Some(Instant::now());
    }

    /// Record an event discarded because the queue was full.
    ///
    /// Returns true only for the first drop since the last reset, so callers
    /// can warn once instead of per event.
    pub fn record_drop(&mut self) -> bool {
        self.drop_count += 1;
        let first = !self.warned_on_drop;
        self.warned_on_drop = true;
        first
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered_count
    }

    pub fn drop_count(&self) -> u64 {
        self.drop_count
    }

    /// Delivered events per second since the stats were created or reset.
    pub fn events_per_sec(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.delivered_count as f64 / elapsed
    }

    /// Drop rate as a percentage (0.0 - 100.0).
    pub fn drop_rate(&self) -> f64 {
        let total = self.delivered_count + self.drop_count;
        if total == 0 {
            return 0.0;
        }
        (self.drop_count as f64 / total as f64) * 100.0
    }

    /// Time since the last delivered event, if any.
    pub fn idle_for(&self) -> Option<std::time::Duration> {
        self.last_event_time.map(|t| t.elapsed())
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn snapshot(&self, label: &str, queued: usize, closed: bool) -> BridgeSnapshot {
        BridgeSnapshot {
            label: label.to_string(),
            events_per_sec: self.events_per_sec(),
            delivered_count: self.delivered_count,
            drop_count: self.drop_count,
            drop_rate: self.drop_rate(),
            queued,
            closed,
        }
    }
}

impl Default for BridgeStats {
    fn default() -> Self {
        Self::new()
    }
}
