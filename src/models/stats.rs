use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics for a relayed capture stream
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelayStats {
    /// Total bytes passed from the device to the consumer
    pub total_bytes: u64,

    /// Number of reads that returned data
    pub chunks: u64,

    /// Relay start time
    pub start_time: Option<DateTime<Utc>>,

    /// Relay end time (once stopped)
    pub end_time: Option<DateTime<Utc>>,

    /// Data rate (bytes per second)
    pub data_rate: f64,
}

impl RelayStats {
    /// Stats for a relay starting now
    pub fn started() -> Self {
        Self {
            start_time: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Account for one chunk of `len` bytes
    pub fn record(&mut self, len: usize) {
        self.total_bytes += len as u64;
        self.chunks += 1;
    }

    /// Stamp the end time and compute the average rate
    pub fn finish(&mut self) {
        let end = Utc::now();
        self.end_time = Some(end);
        if let Some(start_time) = self.start_time {
            let elapsed = end.signed_duration_since(start_time);
            let elapsed_secs = elapsed.num_milliseconds() as f64 / 1000.0;
            if elapsed_secs > 0.0 {
                self.data_rate = self.total_bytes as f64 / elapsed_secs;
            }
        }
    }
}
