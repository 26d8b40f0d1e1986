use std::collections::VecDeque;

/// Samples kept for the sparkline: about six minutes at a 2 s poll
pub const DELTA_CAPACITY: usize = 180;

/// One sparkline point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaPoint {
    /// Sample time in unix milliseconds
    pub t_ms: f64,
    /// Altitude change since the previous sample in km, `None` for the first
    pub delta: Option<f64>,
}

/// Capped FIFO of per-sample altitude changes.
///
/// A repeated timestamp is the same backend row polled twice and is
/// skipped, so the chart only moves when the backend does.
#[derive(Debug, Clone)]
pub struct DeltaBuffer {
    points: VecDeque<DeltaPoint>,
    capacity: usize,
    /// (altitude, timestamp) of the last accepted sample
    last: Option<(f64, f64)>,
}

impl DeltaBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.max(1) + 1),
            capacity: capacity.max(1),
            last: None,
        }
    }

    /// Record a sample. Returns false when it was ignored (non-finite input
    /// or duplicate timestamp).
    pub fn push(&mut self, altitude: f64, timestamp: f64) -> bool {
        if !altitude.is_finite() || !timestamp.is_finite() {
            return false;
        }

        let delta = match self.last {
            Some((_, last_ts)) if last_ts == timestamp => return false,
            Some((last_alt, _)) => Some(altitude - last_alt),
            None => None,
        };

        self.last = Some((altitude, timestamp));
        self.points.push_back(DeltaPoint {
            t_ms: timestamp * 1000.0,
            delta,
        });
        if self.points.len() > self.capacity {
            self.points.pop_front();
        }
        true
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Points oldest first
    pub fn iter(&self) -> impl Iterator<Item = &DeltaPoint> + '_ {
        self.points.iter()
    }

    /// Delta of the newest point
    pub fn latest_delta(&self) -> Option<f64> {
        self.points.back().and_then(|p| p.delta)
    }

    /// (min, max) over present deltas, the chart's y-domain
    pub fn domain(&self) -> Option<(f64, f64)> {
        self.points
            .iter()
            .filter_map(|p| p.delta)
            .fold(None, |acc, d| match acc {
                None => Some((d, d)),
                Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
            })
    }
}

impl Default for DeltaBuffer {
    fn default() -> Self {
        Self::new(DELTA_CAPACITY)
    }
}
