//! Calculator for session metrics: win rate, drawdown, equity volatility.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use statrs::statistics::Statistics;

use crate::models::EquitySample;
use crate::trading::Ledger;

/// Performance of the current session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionMetrics {
    pub open_trades: usize,
    pub closed_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,

    /// Fraction of closed trades that realized a profit (0.0 to 1.0)
    pub win_rate: f64,

    pub avg_win: Decimal,

    /// Average loss as a positive amount
    pub avg_loss: Decimal,

    /// Gross profit over gross loss; 0 when there are no losses
    pub profit_factor: f64,

    /// Mean realized profit per closed trade
    pub expectancy: Decimal,

    pub unrealized_profit: Decimal,

    /// Largest peak-to-trough fall of the sampled equity, as a fraction of the peak
    pub max_drawdown: f64,

    /// Same fall in account currency
    pub max_drawdown_amount: Decimal,

    pub peak_equity: Decimal,

    /// Standard deviation of sample-to-sample equity changes
    pub equity_volatility: f64,
}

/// Computes [`SessionMetrics`] from ledger state.
pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn calculate(ledger: &Ledger) -> SessionMetrics {
        let realized: Vec<Decimal> = ledger.closed_trades().map(|t| t.profit).collect();
        let equity: Vec<EquitySample> = ledger.history().to_vec();

        let mut metrics = SessionMetrics {
            open_trades: ledger.open_trade_count(),
            unrealized_profit: ledger.unrealized_profit(),
            ..SessionMetrics::default()
        };

        Self::calculate_trade_metrics(&mut metrics, &realized);
        Self::calculate_drawdown(&mut metrics, &equity);
        Self::calculate_volatility(&mut metrics, &equity);

        metrics
    }

    fn calculate_trade_metrics(metrics: &mut SessionMetrics, pnls: &[Decimal]) {
        metrics.closed_trades = pnls.len();
        if pnls.is_empty() {
            return;
        }

        let (wins, losses): (Vec<Decimal>, Vec<Decimal>) = pnls
            .iter()
            .copied()
            .filter(|p| !p.is_zero())
            .partition(|p| *p > Decimal::ZERO);

        metrics.winning_trades = wins.len();
        metrics.losing_trades = losses.len();
        metrics.win_rate = wins.len() as f64 / pnls.len() as f64;

        let gross_profit: Decimal = wins.iter().sum();
        let gross_loss: Decimal = losses.iter().map(|l| l.abs()).sum();

        if !wins.is_empty() {
            metrics.avg_win = gross_profit / Decimal::from(wins.len());
        }
        if !losses.is_empty() {
            metrics.avg_loss = gross_loss / Decimal::from(losses.len());
        }
        if gross_loss > Decimal::ZERO {
            metrics.profit_factor =
                gross_profit.to_f64().unwrap_or(0.0) / gross_loss.to_f64().unwrap_or(1.0);
        }

        metrics.expectancy = pnls.iter().sum::<Decimal>() / Decimal::from(pnls.len());
    }

    fn calculate_drawdown(metrics: &mut SessionMetrics, samples: &[EquitySample]) {
        let mut peak = Decimal::ZERO;
        let mut max_dd = Decimal::ZERO;
        let mut max_dd_pct = 0.0f64;

        for sample in samples {
            if sample.equity > peak {
                peak = sample.equity;
            }

            if peak > Decimal::ZERO {
                let dd = peak - sample.equity;
                if dd > max_dd {
                    max_dd = dd;
                }

                let dd_pct = (dd / peak).to_f64().unwrap_or(0.0);
                if dd_pct > max_dd_pct {
                    max_dd_pct = dd_pct;
                }
            }
        }

        metrics.peak_equity = peak;
        metrics.max_drawdown = max_dd_pct;
        metrics.max_drawdown_amount = max_dd;
    }

    fn calculate_volatility(metrics: &mut SessionMetrics, samples: &[EquitySample]) {
        if samples.len() < 3 {
            return;
        }

        let changes: Vec<f64> = samples
            .windows(2)
            .filter_map(|w| (w[1].equity - w[0].equity).to_f64())
            .collect();

        let std_dev = changes.std_dev();
        if std_dev.is_finite() {
            metrics.equity_volatility = std_dev;
        }
    }
}
