use crate::convert::hour_of;
use serde::Serialize;

/// Request counts per hour of day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HourlySpread {
    buckets: [u64; 24],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlySnapshot {
    pub buckets: Vec<u64>,
    pub total: u64,
}

impl HourlySpread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the timestamp is not a valid date-time
    pub fn observe(&mut self, timestamp: u64) -> bool {
        match hour_of(timestamp) {
            Some(hour) => {
                self.buckets[hour as usize] += 1;
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> HourlySnapshot {
        HourlySnapshot {
            buckets: self.buckets.to_vec(),
            total: self.buckets.iter().sum(),
        }
    }
}
