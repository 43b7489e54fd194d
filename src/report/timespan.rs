use crate::convert::to_datetime;
use serde::Serialize;

/// Earliest and latest canonical timestamp seen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timespan {
    first: Option<u64>,
    last: Option<u64>,
    count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimespanSnapshot {
    pub first: Option<u64>,
    pub last: Option<u64>,
    pub count: u64,
    /// Seconds between first and last
    pub seconds: Option<i64>,
}

impl Timespan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, timestamp: u64) {
        self.count += 1;
        self.first = Some(self.first.map_or(timestamp, |f| f.min(timestamp)));
        self.last = Some(self.last.map_or(timestamp, |l| l.max(timestamp)));
    }

    pub fn snapshot(&self) -> TimespanSnapshot {
        let seconds = match (self.first.and_then(to_datetime), self.last.and_then(to_datetime)) {
            (Some(first), Some(last)) => Some((last - first).num_seconds()),
            _ => None,
        };
        TimespanSnapshot {
            first: self.first,
            last: self.last,
            count: self.count,
            seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_bounds_regardless_of_order() {
        let mut span = Timespan::new();
        span.observe(20150202133308);
        span.observe(20150202120000);
        span.observe(20150202140000);
        let snap = span.snapshot();
        assert_eq!(snap.first, Some(20150202120000));
        assert_eq!(snap.last, Some(20150202140000));
        assert_eq!(snap.count, 3);
        assert_eq!(snap.seconds, Some(7200));
    }
}
