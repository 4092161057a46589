//! Circular buffer for time-based transform storage
//!
//! Keeps the most recent samples of a moving frame and interpolates
//! between them.

use nalgebra::Isometry3;

const SLERP_EPSILON: f64 = 1.0e-9;

/// A fixed-capacity circular buffer; pushing into a full buffer drops the oldest element
#[derive(Debug, Clone)]
pub struct CircularBuffer<T> {
    data: Vec<T>,
    capacity: usize,
    /// Next write position once the buffer has wrapped
    head: usize,
}

impl<T: Clone> CircularBuffer<T> {
    /// Create a new circular buffer with the given capacity (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.data.len() < self.capacity {
            self.data.push(item);
        } else {
            self.data[self.head] = item;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
    }

    /// Element at logical index (0 = oldest)
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.data.len() {
            return None;
        }
        self.data.get((self.head + index) % self.data.len())
    }

    pub fn oldest(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn newest(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|last| self.get(last))
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

/// Timestamped samples of one frame's parent-from-child transform
pub type TransformBuffer = CircularBuffer<(u64, Isometry3<f64>)>;

impl CircularBuffer<(u64, Isometry3<f64>)> {
    /// Newest sample and its timestamp
    pub fn latest(&self) -> Option<(u64, Isometry3<f64>)> {
        self.newest().copied()
    }

    /// `(oldest, newest)` timestamps
    pub fn time_range(&self) -> Option<(u64, u64)> {
        Some((self.oldest()?.0, self.newest()?.0))
    }

    pub fn contains_time(&self, timestamp: u64) -> bool {
        matches!(self.time_range(), Some((oldest, newest)) if timestamp >= oldest && timestamp <= newest)
    }

    /// Transform at `timestamp`, interpolated between bracketing samples
    ///
    /// Returns None outside the buffered time range; extrapolation is not
    /// supported.
    pub fn sample_at(&self, timestamp: u64) -> Option<Isometry3<f64>> {
        if !self.contains_time(timestamp) {
            return None;
        }

        let mut before: Option<&(u64, Isometry3<f64>)> = None;
        for sample in self.iter() {
            if sample.0 == timestamp {
                return Some(sample.1);
            }
            if sample.0 < timestamp {
                before = Some(sample);
                continue;
            }
            let b = before?;
            let t = (timestamp - b.0) as f64 / (sample.0 - b.0) as f64;
            // Slerp is undefined for opposite rotations; take the nearer sample
            let nearer = if t < 0.5 { b.1 } else { sample.1 };
            return Some(b.1.try_lerp_slerp(&sample.1, t, SLERP_EPSILON).unwrap_or(nearer));
        }
        before.map(|b| b.1)
    }

    /// Drop samples older than `timestamp`, always keeping the newest one
    pub fn prune_before(&mut self, timestamp: u64) {
        let newest = self.len().saturating_sub(1);
        let keep: Vec<_> = self
            .iter()
            .enumerate()
            .filter(|(i, (ts, _))| *ts >= timestamp || *i == newest)
            .map(|(_, sample)| *sample)
            .collect();
        self.clear();
        for item in keep {
            self.push(item);
        }
    }
}
