//! Bot runner: the trading cycle and the scheduler that repeats it.
//!
//! One cycle:
//! - draws a market snapshot
//! - asks the decision service what to do
//! - applies the decision to the ledger
//! - revalues open trades and samples equity

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::{CompletionTransport, DecisionClient, DecisionError, DEFAULT_DECISION_TIMEOUT};
use crate::config::Credentials;
use crate::market::MarketSimulator;
use crate::metrics::{MetricsCalculator, SessionMetrics};
use crate::models::{DecisionAction, EquitySample, Trade};
use crate::trading::{Ledger, LedgerConfig, TradingConfig};

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Seconds between cycle starts
    pub cycle_interval_secs: u64,

    /// Upper bound on one decision request
    pub decision_timeout: Duration,

    /// Simulated account constants
    pub ledger_config: LedgerConfig,

    /// Rules handed to the decision service
    pub trading_config: TradingConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: 5,
            decision_timeout: DEFAULT_DECISION_TIMEOUT,
            ledger_config: LedgerConfig::default(),
            trading_config: TradingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BotStatus {
    Stopped,
    Running,
}

/// Why a cycle did not run to completion.
#[derive(Debug, Error, PartialEq)]
pub enum CycleError {
    #[error("a trading cycle is already in flight")]
    InFlight,

    #[error(transparent)]
    Decision(#[from] DecisionError),
}

/// What a cycle did to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Opened(Trade),
    Closed { trade_id: String, realized: Decimal },
    /// CLOSE_TRADE named a trade that is not open.
    CloseIgnored { trade_id: String },
    Held,
}

/// Summary of one completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub outcome: CycleOutcome,
    pub analysis: String,
    pub balance: Decimal,
    pub equity: Decimal,
    pub open_trades: usize,
    pub completed_at: DateTime<Utc>,
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let action = match &self.outcome {
            CycleOutcome::Opened(t) => {
                format!("OPEN {} {} {} @ {}", t.side.as_str(), t.volume, t.pair, t.entry_price)
            }
            CycleOutcome::Closed { trade_id, realized } => {
                format!("CLOSE {} ({:+.2})", trade_id, realized)
            }
            CycleOutcome::CloseIgnored { trade_id } => format!("CLOSE {} (not open)", trade_id),
            CycleOutcome::Held => "HOLD".to_string(),
        };
        write!(
            f,
            "[{}] #{} {} | balance ${:.2} | equity ${:.2} | open {}",
            self.completed_at.format("%H:%M:%S"),
            self.cycle,
            action,
            self.balance,
            self.equity,
            self.open_trades
        )
    }
}

/// Read-only view of the bot for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardState {
    pub status: BotStatus,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub equity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_profit: Decimal,
    pub open_trades: Vec<Trade>,
    pub closed_trades: Vec<Trade>,
    pub history: Vec<EquitySample>,
    pub last_analysis: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub cycles_skipped: u64,
}

/// State written by the cycle body.
struct SessionState {
    ledger: Ledger,
    last_analysis: Option<String>,
    last_update: Option<DateTime<Utc>>,
}

/// Cycle counters, kept outside the session state so failed cycles leave it untouched.
#[derive(Default)]
struct CycleCounters {
    completed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

/// Clears the in-flight flag when a cycle finishes, however it finishes.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Trading bot: owns the simulated account and drives the decision loop.
pub struct TradingBot<T> {
    config: BotConfig,
    simulator: MarketSimulator,
    client: DecisionClient<T>,
    credentials: Credentials,
    state: Arc<RwLock<SessionState>>,
    counters: CycleCounters,

    // Scheduler
    cancel: Mutex<Option<Arc<AtomicBool>>>,
    in_flight: Arc<AtomicBool>,
}

impl<T: CompletionTransport + 'static> TradingBot<T> {
    pub fn new(config: BotConfig, transport: T, credentials: Credentials) -> Self {
        let client = DecisionClient::new(
            transport,
            config.trading_config.clone(),
            config.decision_timeout,
        );
        let state = SessionState {
            ledger: Ledger::new(config.ledger_config.clone()),
            last_analysis: None,
            last_update: None,
        };

        Self {
            config,
            simulator: MarketSimulator::default(),
            client,
            credentials,
            state: Arc::new(RwLock::new(state)),
            counters: CycleCounters::default(),
            cancel: Mutex::new(None),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        self.client.transport()
    }

    /// Run one trading cycle.
    ///
    /// Fails with [`CycleError::InFlight`] while another cycle, scheduled or
    /// direct, is still running. Decision errors abort the cycle before
    /// anything in the session changes.
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let _guard = self.try_begin_cycle().ok_or(CycleError::InFlight)?;
        Ok(self.execute_cycle().await?)
    }

    /// Claim the single-flight slot, counting a skip if it is taken.
    fn try_begin_cycle(&self) -> Option<InFlightGuard> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.counters.skipped.fetch_add(1, Ordering::SeqCst);
            return None;
        }
        Some(InFlightGuard(self.in_flight.clone()))
    }

    async fn execute_cycle(&self) -> Result<CycleReport, DecisionError> {
        let snapshot = self.simulator.generate_snapshot();

        let (open_trades, balance) = {
            let state = self.state.read().await;
            let open: Vec<Trade> = state.ledger.open_trades().cloned().collect();
            (open, state.ledger.balance())
        };
        let decision = match self
            .client
            .request_decision(&snapshot, &open_trades, balance, &self.credentials)
            .await
        {
            Ok(decision) => decision,
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::SeqCst);
                return Err(e);
            }
        };

        let mut state = self.state.write().await;

        let outcome = match &decision.action {
            DecisionAction::OpenTrade(proposal) => CycleOutcome::Opened(state.ledger.apply_open(proposal)),
            DecisionAction::CloseTrade { trade_id } => match state.ledger.apply_close(trade_id) {
                Some(realized) => CycleOutcome::Closed {
                    trade_id: trade_id.clone(),
                    realized,
                },
                None => {
                    debug!(trade_id = %trade_id, "Close requested for a trade that is not open");
                    CycleOutcome::CloseIgnored {
                        trade_id: trade_id.clone(),
                    }
                }
            },
            DecisionAction::Hold => CycleOutcome::Held,
        };

        state.ledger.revaluate(&mut rand::thread_rng());

        let now = Utc::now();
        let equity = state.ledger.equity();
        state.ledger.append_history_sample(now, equity);
        state.last_update = Some(now);
        if !decision.analysis.trim().is_empty() {
            state.last_analysis = Some(decision.analysis.clone());
        }

        let cycle = self.counters.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let report = CycleReport {
            cycle,
            outcome,
            analysis: decision.analysis,
            balance: state.ledger.balance(),
            equity,
            open_trades: state.ledger.open_trade_count(),
            completed_at: now,
        };

        info!(
            cycle = cycle,
            action = decision.action.as_str(),
            balance = %report.balance,
            equity = %report.equity,
            open_trades = report.open_trades,
            history = state.ledger.history().len(),
            "Cycle complete"
        );

        Ok(report)
    }

    pub fn status(&self) -> BotStatus {
        if self.is_running() {
            BotStatus::Running
        } else {
            BotStatus::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.cancel
            .lock()
            .map(|c| c.as_ref().is_some_and(|flag| !flag.load(Ordering::SeqCst)))
            .unwrap_or(false)
    }

    /// Start the scheduler. Returns `false` if it was already running.
    ///
    /// The first cycle starts immediately, then one per interval. A tick that
    /// arrives while a cycle is still in flight is dropped.
    pub fn start(self: &Arc<Self>) -> bool {
        let cancel = {
            let Ok(mut slot) = self.cancel.lock() else {
                error!("Scheduler state poisoned");
                return false;
            };
            if slot.as_ref().is_some_and(|flag| !flag.load(Ordering::SeqCst)) {
                return false;
            }
            let flag = Arc::new(AtomicBool::new(false));
            *slot = Some(flag.clone());
            flag
        };

        info!(interval_secs = self.config.cycle_interval_secs, "Starting trading bot");

        let bot = Arc::clone(self);
        tokio::spawn(async move { bot.schedule(cancel).await });
        true
    }

    /// Stop scheduling new cycles. A cycle already in flight runs to completion.
    pub fn stop(&self) -> bool {
        let Ok(mut slot) = self.cancel.lock() else {
            return false;
        };
        match slot.take() {
            Some(flag) if !flag.load(Ordering::SeqCst) => {
                flag.store(true, Ordering::SeqCst);
                info!("Stopping trading bot");
                true
            }
            _ => false,
        }
    }

    /// Start when stopped, stop when running. Returns the new status.
    pub fn toggle(self: &Arc<Self>) -> BotStatus {
        if self.is_running() {
            self.stop();
        } else {
            self.start();
        }
        self.status()
    }

    /// Whether a cycle is executing right now.
    pub fn cycle_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    async fn schedule(self: Arc<Self>, cancel: Arc<AtomicBool>) {
        let mut ticker = interval(Duration::from_secs(self.config.cycle_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if cancel.load(Ordering::SeqCst) {
                break;
            }

            let Some(guard) = self.try_begin_cycle() else {
                debug!("Previous cycle still running, skipping tick");
                continue;
            };

            let bot = Arc::clone(&self);
            tokio::spawn(async move {
                let _guard = guard;
                match bot.execute_cycle().await {
                    Ok(report) => debug!(cycle = report.cycle, "Scheduled cycle finished"),
                    Err(e) if e.is_client_input() => warn!(error = %e, "Cycle skipped"),
                    Err(e) => error!(error = %e, "Error in trading cycle"),
                }
            });
        }

        info!("Scheduler stopped");
    }

    /// Snapshot of everything the presentation layer shows.
    pub async fn snapshot(&self) -> DashboardState {
        let state = self.state.read().await;
        let ledger = &state.ledger;

        DashboardState {
            status: self.status(),
            balance: ledger.balance(),
            equity: ledger.equity(),
            total_profit: ledger.total_profit(),
            open_trades: ledger.open_trades().cloned().collect(),
            closed_trades: ledger.closed_trades().cloned().collect(),
            history: ledger.history().to_vec(),
            last_analysis: state.last_analysis.clone(),
            last_update: state.last_update,
            cycles_completed: self.counters.completed.load(Ordering::SeqCst),
            cycles_failed: self.counters.failed.load(Ordering::SeqCst),
            cycles_skipped: self.counters.skipped.load(Ordering::SeqCst),
        }
    }

    /// Current stats.
    pub async fn stats(&self) -> BotStats {
        let state = self.state.read().await;
        let ledger = &state.ledger;

        BotStats {
            status: self.status(),
            initial_balance: ledger.config().initial_balance,
            balance: ledger.balance(),
            equity: ledger.equity(),
            total_profit: ledger.total_profit(),
            metrics: MetricsCalculator::calculate(ledger),
            cycles_completed: self.counters.completed.load(Ordering::SeqCst),
            cycles_failed: self.counters.failed.load(Ordering::SeqCst),
            cycles_skipped: self.counters.skipped.load(Ordering::SeqCst),
        }
    }
}

/// Bot statistics.
#[derive(Debug, Clone)]
pub struct BotStats {
    pub status: BotStatus,
    pub initial_balance: Decimal,
    pub balance: Decimal,
    pub equity: Decimal,
    pub total_profit: Decimal,
    pub metrics: SessionMetrics,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub cycles_skipped: u64,
}

impl BotStats {
    /// Equity change since the start of the session, as a percentage.
    pub fn return_pct(&self) -> Decimal {
        if self.initial_balance.is_zero() {
            return Decimal::ZERO;
        }
        (self.equity - self.initial_balance) / self.initial_balance * dec!(100)
    }
}

impl std::fmt::Display for BotStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = &self.metrics;
        writeln!(f, "=== Bot Statistics ===")?;
        writeln!(f, "Balance:         ${:.2}", self.balance)?;
        writeln!(f, "Equity:          ${:.2} ({:+.2}%)", self.equity, self.return_pct())?;
        writeln!(f, "Realized P&L:    ${:.2}", self.total_profit)?;
        writeln!(f, "Unrealized P&L:  ${:.2}", m.unrealized_profit)?;
        writeln!(f, "Max Drawdown:    {:.2}% (${:.2})", m.max_drawdown * 100.0, m.max_drawdown_amount)?;
        writeln!(f, "Open Trades:     {}", m.open_trades)?;
        writeln!(f, "Closed Trades:   {} (Won: {}, Lost: {}, Win Rate: {:.1}%)",
            m.closed_trades, m.winning_trades, m.losing_trades, m.win_rate * 100.0)?;
        writeln!(f, "Avg Win/Loss:    ${:.2} / ${:.2}", m.avg_win, m.avg_loss)?;
        writeln!(f, "Cycles:          {} (Failed: {}, Skipped: {})",
            self.cycles_completed, self.cycles_failed, self.cycles_skipped)?;
        writeln!(f, "Status:          {}",
            match self.status { BotStatus::Running => "Running", BotStatus::Stopped => "Stopped" })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockTransport, Reply};
    use crate::models::{TradeStatus, EMPTY_ANALYSIS_PLACEHOLDER};
    use tokio_test::assert_ok;

    const OPEN_EUR_USD: &str = r#"{
        "action": "OPEN_TRADE",
        "analysis": "EUR/USD bullish with low volatility",
        "trade": {"pair": "EUR/USD", "type": "BUY", "volume": 0.5, "entryPrice": 1.1, "reasoning": "Trend continuation"}
    }"#;

    fn credentials() -> Credentials {
        Credentials {
            gemini_api_key: "test-key".to_string(),
            ..Credentials::default()
        }
    }

    fn bot(transport: MockTransport) -> TradingBot<MockTransport> {
        TradingBot::new(BotConfig::default(), transport, credentials())
    }

    fn close_reply(trade_id: &str) -> Reply {
        Reply::Text(format!(
            r#"{{"action": "CLOSE_TRADE", "analysis": "Taking profit", "tradeId": "{}"}}"#,
            trade_id
        ))
    }

    #[tokio::test]
    async fn test_open_trade_cycle() {
        let bot = bot(MockTransport::replying(OPEN_EUR_USD));

        let report = assert_ok!(bot.run_cycle().await);
        assert!(matches!(report.outcome, CycleOutcome::Opened(_)));
        assert_eq!(report.cycle, 1);

        let state = bot.snapshot().await;
        assert_eq!(state.open_trades.len(), 1);
        assert_eq!(state.open_trades[0].pair, "EUR/USD");
        assert_eq!(state.open_trades[0].ai_reasoning, "Trend continuation");
        // Revalued in the same cycle it was opened
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].equity, state.equity);
        assert_eq!(state.balance, dec!(10000));
        assert_eq!(state.last_analysis.as_deref(), Some("EUR/USD bullish with low volatility"));
        assert!(state.last_update.is_some());
        assert_eq!(state.cycles_completed, 1);
    }

    #[tokio::test]
    async fn test_close_trade_cycle() {
        let bot = bot(MockTransport::sequence(vec![Reply::Text(OPEN_EUR_USD.to_string())]));
        bot.run_cycle().await.unwrap();

        let trade_id = bot.snapshot().await.open_trades[0].id.clone();
        bot.transport().push(close_reply(&trade_id));

        let report = assert_ok!(bot.run_cycle().await);
        let realized = match report.outcome {
            CycleOutcome::Closed { realized, .. } => realized,
            other => panic!("expected a close, got {:?}", other),
        };

        let state = bot.snapshot().await;
        assert!(state.open_trades.is_empty());
        assert_eq!(state.closed_trades[0].status, TradeStatus::Closed);
        assert_eq!(state.closed_trades[0].profit, realized);
        assert_eq!(state.balance, dec!(10000) + realized);
        assert_eq!(state.total_profit, realized);
        assert_eq!(state.equity, state.balance);
    }

    #[tokio::test]
    async fn test_close_unknown_trade_is_ignored() {
        let bot = bot(MockTransport::sequence(vec![
            Reply::Text(OPEN_EUR_USD.to_string()),
            close_reply("no-such-trade"),
        ]));
        bot.run_cycle().await.unwrap();

        let report = assert_ok!(bot.run_cycle().await);
        assert_eq!(
            report.outcome,
            CycleOutcome::CloseIgnored {
                trade_id: "no-such-trade".to_string()
            }
        );

        let state = bot.snapshot().await;
        assert_eq!(state.open_trades.len(), 1);
        assert!(state.closed_trades.is_empty());
        assert_eq!(state.balance, dec!(10000));
        assert_eq!(state.total_profit, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_missing_key_aborts_cycle() {
        let bot = TradingBot::new(
            BotConfig::default(),
            MockTransport::replying(OPEN_EUR_USD),
            Credentials::default(),
        );

        assert_eq!(
            bot.run_cycle().await.unwrap_err(),
            CycleError::Decision(DecisionError::MissingApiKey)
        );
        assert_eq!(bot.transport().calls(), 0);

        let state = bot.snapshot().await;
        assert!(state.history.is_empty());
        assert!(state.last_update.is_none());
        assert_eq!(state.cycles_failed, 1);
        assert!(!bot.cycle_in_flight());
    }

    #[tokio::test]
    async fn test_transport_error_leaves_state_untouched() {
        let bot = bot(MockTransport::sequence(vec![
            Reply::Text(OPEN_EUR_USD.to_string()),
            Reply::NetworkError,
        ]));
        bot.run_cycle().await.unwrap();
        let before = bot.snapshot().await;

        assert!(matches!(
            bot.run_cycle().await,
            Err(CycleError::Decision(DecisionError::Transport(_)))
        ));

        let after = bot.snapshot().await;
        assert_eq!(after.open_trades, before.open_trades);
        assert_eq!(after.history, before.history);
        assert_eq!(after.last_update, before.last_update);
        assert_eq!(after.cycles_completed, 1);
        assert_eq!(after.cycles_failed, 1);
    }

    #[tokio::test]
    async fn test_oversized_trade_is_held_without_panic() {
        let reply = r#"{
            "action": "OPEN_TRADE",
            "analysis": "All in",
            "trade": {"pair": "EUR/USD", "type": "BUY", "volume": 1e6, "entryPrice": 1e25}
        }"#;
        let bot = Arc::new(bot(MockTransport::replying(reply)));

        let handle = tokio::spawn({
            let bot = Arc::clone(&bot);
            async move { bot.run_cycle().await }
        });
        let report = assert_ok!(assert_ok!(handle.await));
        assert_eq!(report.outcome, CycleOutcome::Held);

        let state = bot.snapshot().await;
        assert!(state.open_trades.is_empty());
        assert_eq!(state.balance, dec!(10000));
        assert_eq!(state.equity, dec!(10000));
        assert_eq!(state.cycles_completed, 1);
    }

    #[tokio::test]
    async fn test_report_display() {
        let bot = bot(MockTransport::replying(r#"{"action": "HOLD", "analysis": "Waiting"}"#));
        let report = assert_ok!(bot.run_cycle().await);

        assert_eq!(report.analysis, "Waiting");
        let text = report.to_string();
        assert!(text.starts_with(&format!("[{}] #1 HOLD", report.completed_at.format("%H:%M:%S"))));
        assert!(text.ends_with("| balance $10000.00 | equity $10000.00 | open 0"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_holds() {
        let bot = bot(MockTransport::replying(""));

        let report = assert_ok!(bot.run_cycle().await);
        assert_eq!(report.outcome, CycleOutcome::Held);

        let state = bot.snapshot().await;
        assert_eq!(state.last_analysis.as_deref(), Some(EMPTY_ANALYSIS_PLACEHOLDER));
        assert_eq!(state.history.len(), 1);
    }

    #[tokio::test]
    async fn test_history_capped() {
        let bot = bot(MockTransport::replying(r#"{"action": "HOLD", "analysis": "Waiting"}"#));

        for _ in 0..25 {
            bot.run_cycle().await.unwrap();
        }

        let state = bot.snapshot().await;
        assert_eq!(state.history.len(), 20);
        assert_eq!(state.cycles_completed, 25);
    }

    #[tokio::test]
    async fn test_stats_display() {
        let bot = bot(MockTransport::replying(OPEN_EUR_USD));
        bot.run_cycle().await.unwrap();

        let stats = bot.stats().await;
        assert_eq!(stats.metrics.open_trades, 1);
        assert_eq!(stats.status, BotStatus::Stopped);

        let text = stats.to_string();
        assert!(text.contains("Open Trades:     1"));
        assert!(text.contains("Status:          Stopped"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_ticks_are_dropped() {
        // Each decision takes 12s against a 5s interval
        let transport = MockTransport::replying(r#"{"action": "HOLD"}"#).with_delay(Duration::from_secs(12));
        let config = BotConfig {
            decision_timeout: Duration::from_secs(30),
            ..BotConfig::default()
        };
        let bot = Arc::new(TradingBot::new(config, transport, credentials()));

        assert!(bot.start());
        assert!(!bot.start());
        assert_eq!(bot.status(), BotStatus::Running);

        tokio::time::sleep(Duration::from_secs(14)).await;

        assert_eq!(bot.transport().calls(), 1);
        let state = bot.snapshot().await;
        assert_eq!(state.cycles_completed, 1);
        assert_eq!(state.cycles_skipped, 2);

        assert!(bot.stop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lets_in_flight_cycle_finish() {
        let transport = MockTransport::replying(OPEN_EUR_USD).with_delay(Duration::from_secs(3));
        let bot = Arc::new(TradingBot::new(BotConfig::default(), transport, credentials()));

        bot.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(bot.cycle_in_flight());

        assert!(bot.stop());
        assert!(!bot.stop());
        assert_eq!(bot.status(), BotStatus::Stopped);

        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(!bot.cycle_in_flight());
        assert_eq!(bot.transport().calls(), 1);
        let state = bot.snapshot().await;
        assert_eq!(state.cycles_completed, 1);
        assert_eq!(state.open_trades.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_cycle_rejected_while_scheduled_cycle_in_flight() {
        let transport = MockTransport::replying(OPEN_EUR_USD).with_delay(Duration::from_secs(12));
        let config = BotConfig {
            decision_timeout: Duration::from_secs(30),
            ..BotConfig::default()
        };
        let bot = Arc::new(TradingBot::new(config, transport, credentials()));

        bot.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(bot.cycle_in_flight());

        assert_eq!(bot.run_cycle().await.unwrap_err(), CycleError::InFlight);
        assert_eq!(bot.transport().calls(), 1);
        bot.stop();

        tokio::time::sleep(Duration::from_secs(30)).await;
        let state = bot.snapshot().await;
        assert_eq!(state.cycles_completed, 1);
        assert_eq!(state.cycles_skipped, 1);
        assert_eq!(state.open_trades.len(), 1);

        // Slot is free again once the scheduled cycle commits
        assert_ok!(bot.run_cycle().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle() {
        let bot = Arc::new(bot(MockTransport::replying(r#"{"action": "HOLD"}"#)));

        assert_eq!(bot.toggle(), BotStatus::Running);
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(bot.toggle(), BotStatus::Stopped);

        // Ticks at 0, 5 and 10
        assert_eq!(bot.snapshot().await.cycles_completed, 3);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(bot.snapshot().await.cycles_completed, 3);
    }
}
