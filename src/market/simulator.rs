//! Stateless market simulator producing one independent quote per pair.
//!
//! Each snapshot is drawn fresh; prices do not follow a random walk and are
//! unrelated to the prices the ledger tracks for open trades.

use rand::Rng;
use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{InstrumentQuote, Trend};

/// Currency pairs quoted by default.
pub const DEFAULT_PAIRS: [&str; 7] = [
    "EUR/USD", "GBP/USD", "USD/JPY", "USD/CHF", "AUD/USD", "USD/CAD", "NZD/USD",
];

const BASE_PRICE: f64 = 1.0;
const PRICE_RANGE: f64 = 0.5;
const MAX_ABS_CHANGE: f64 = 0.01;
const MAX_VOLATILITY: f64 = 0.01;
const PRICE_DP: u32 = 5;

/// Generates market snapshots for a fixed set of pairs.
#[derive(Debug, Clone)]
pub struct MarketSimulator {
    pairs: Vec<String>,
}

impl MarketSimulator {
    pub fn new(pairs: Vec<String>) -> Self {
        Self { pairs }
    }

    pub fn pairs(&self) -> &[String] {
        &self.pairs
    }

    /// Snapshot using the thread-local RNG.
    pub fn generate_snapshot(&self) -> Vec<InstrumentQuote> {
        self.generate_snapshot_with(&mut rand::thread_rng())
    }

    pub fn generate_snapshot_with<R: Rng>(&self, rng: &mut R) -> Vec<InstrumentQuote> {
        let quotes: Vec<InstrumentQuote> = self
            .pairs
            .iter()
            .map(|pair| {
                let price = BASE_PRICE + rng.gen::<f64>() * PRICE_RANGE;
                InstrumentQuote {
                    pair: pair.clone(),
                    price: Decimal::try_from(price)
                        .unwrap_or(Decimal::ONE)
                        .round_dp(PRICE_DP),
                    change_24h: (rng.gen::<f64>() - 0.5) * 2.0 * MAX_ABS_CHANGE,
                    volatility: rng.gen::<f64>() * MAX_VOLATILITY,
                    trend: if rng.gen_bool(0.5) {
                        Trend::Bullish
                    } else {
                        Trend::Bearish
                    },
                }
            })
            .collect();

        debug!(count = quotes.len(), "Generated market snapshot");
        quotes
    }
}

impl Default for MarketSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_PAIRS.iter().map(|p| p.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rust_decimal_macros::dec;

    #[test]
    fn test_snapshot_covers_every_pair() {
        let sim = MarketSimulator::default();
        let snapshot = sim.generate_snapshot();

        let pairs: Vec<&str> = snapshot.iter().map(|q| q.pair.as_str()).collect();
        assert_eq!(pairs, DEFAULT_PAIRS.to_vec());
    }

    #[test]
    fn test_quotes_stay_in_range() {
        let sim = MarketSimulator::default();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..50 {
            for q in sim.generate_snapshot_with(&mut rng) {
                assert!(q.price >= dec!(1.0) && q.price <= dec!(1.5), "price {}", q.price);
                assert!(q.change_24h.abs() <= 0.01);
                assert!((0.0..=0.01).contains(&q.volatility));
            }
        }
    }

    #[test]
    fn test_both_trends_appear() {
        let sim = MarketSimulator::default();
        let mut rng = StdRng::seed_from_u64(3);
        let quotes: Vec<_> = (0..10).flat_map(|_| sim.generate_snapshot_with(&mut rng)).collect();

        assert!(quotes.iter().any(|q| q.trend == Trend::Bullish));
        assert!(quotes.iter().any(|q| q.trend == Trend::Bearish));
    }

    #[test]
    fn test_snapshots_are_independent() {
        let sim = MarketSimulator::new(vec!["EUR/USD".to_string()]);
        let mut rng = StdRng::seed_from_u64(99);

        let a = sim.generate_snapshot_with(&mut rng);
        let b = sim.generate_snapshot_with(&mut rng);
        assert_ne!(a[0].price, b[0].price);
    }
}
