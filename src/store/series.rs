//! Fixed-capacity, insertion-ordered sample buffer

use std::collections::VecDeque;

use crate::types::{TimestampMs, Timestamped};

/// Ring buffer of timestamped samples. Oldest sample is evicted first.
#[derive(Debug, Clone)]
pub struct BoundedSeries<T> {
    capacity: usize,
    points: VecDeque<T>,
}

impl<T: Timestamped + Copy> BoundedSeries<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    /// Append at the tail, evicting from the head when full
    pub fn push(&mut self, point: T) {
        while self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn latest(&self) -> Option<T> {
        self.points.back().copied()
    }

    /// Most recent `count` points, most recent last
    pub fn recent(&self, count: usize) -> Vec<T> {
        let skip = self.points.len().saturating_sub(count);
        self.points.iter().skip(skip).copied().collect()
    }

    /// Points with `ts >= cutoff`, most recent last
    pub fn since(&self, cutoff: TimestampMs) -> Vec<T> {
        // Append order is chronological, so the matching points form a suffix.
        let start = self.points.partition_point(|p| p.ts() < cutoff);
        self.points.iter().skip(start).copied().collect()
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

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.points.iter()
    }
}
