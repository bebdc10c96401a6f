//! Session performance metrics.

mod calculator;

pub use calculator::{MetricsCalculator, SessionMetrics};
