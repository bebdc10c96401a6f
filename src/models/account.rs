//! Account equity history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of equity samples kept for display.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// A single point on the equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquitySample {
    pub timestamp: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::float")]
    pub equity: Decimal,
}

/// Sliding window of the most recent equity samples.
///
/// Holds at most `capacity` samples; pushing into a full window evicts the oldest.
#[derive(Debug, Clone)]
pub struct EquityHistory {
    samples: VecDeque<EquitySample>,
    capacity: usize,
}

impl EquityHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, timestamp: DateTime<Utc>, equity: Decimal) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(EquitySample { timestamp, equity });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &EquitySample> {
        self.samples.iter()
    }

    pub fn to_vec(&self) -> Vec<EquitySample> {
        self.samples.iter().copied().collect()
    }
}

impl Default for EquityHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}
