//! Per-symbol simulation loop.
//!
//! Replays one series in date order through a [`SignalSource`], moving
//! between Flat and Long and recording trades. Each run owns its position,
//! cash and trade log; nothing is shared with other symbols.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::error::SymbolError;
use super::evaluator::{self, Signal};
use super::execution::{self, EntryResult};
use super::position::{Position, TradeLog};
use super::price_bar::PriceBar;
use super::rolling::RollingState;
use super::series::PriceSeries;
use super::strategy::StrategyConfig;

/// Produces the signal for bar `index` of the series being simulated.
///
/// Called once per bar, in order, after the bar passed validation.
pub trait SignalSource {
    fn signal(&mut self, index: usize, bar: &PriceBar) -> Signal;
}

/// Drives the incremental evaluator.
pub struct IncrementalSignals<'a> {
    state: RollingState,
    config: &'a StrategyConfig,
}

impl<'a> IncrementalSignals<'a> {
    pub fn new(config: &'a StrategyConfig) -> Self {
        IncrementalSignals {
            state: RollingState::new(config.lookback_window),
            config,
        }
    }
}

impl SignalSource for IncrementalSignals<'_> {
    fn signal(&mut self, _index: usize, bar: &PriceBar) -> Signal {
        evaluator::evaluate(bar, &mut self.state, self.config)
    }
}

/// Reads signals computed ahead of time by the batched kernel.
pub struct PrecomputedSignals<'a> {
    signals: &'a [Signal],
}

impl<'a> PrecomputedSignals<'a> {
    pub fn new(signals: &'a [Signal]) -> Self {
        PrecomputedSignals { signals }
    }
}

impl SignalSource for PrecomputedSignals<'_> {
    fn signal(&mut self, index: usize, _bar: &PriceBar) -> Signal {
        self.signals.get(index).copied().unwrap_or(Signal::Hold)
    }
}

/// An Enter signal downgraded to Hold because the sized quantity was zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub date: NaiveDate,
    pub price: Decimal,
    pub budget: Decimal,
}

/// Everything one completed simulation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRun {
    pub symbol: String,
    pub trades: TradeLog,
    pub skipped_entries: Vec<SkippedEntry>,
    pub bars_processed: usize,
    pub final_cash: Decimal,
}

/// Simulate one series with the incremental evaluator.
pub fn run_symbol(series: &PriceSeries, config: &StrategyConfig) -> Result<SymbolRun, SymbolError> {
    simulate(series, config, &mut IncrementalSignals::new(config))
}

/// Simulate one series, reading signals from `source`.
///
/// Fails with [`SymbolError::InvalidBar`] at the first bar that breaks the
/// OHLC invariants; trades made before it are discarded with the run.
pub fn simulate<S: SignalSource>(
    series: &PriceSeries,
    config: &StrategyConfig,
    source: &mut S,
) -> Result<SymbolRun, SymbolError> {
    let ticker = series.symbol().as_str();
    let bars = series.bars();
    let mut position = Position::flat();
    let mut cash = config.capital_per_symbol;
    let mut trades = TradeLog::new();
    let mut skipped_entries = Vec::new();

    for (index, bar) in bars.iter().enumerate() {
        bar.check().map_err(|reason| SymbolError::InvalidBar {
            symbol: ticker.to_string(),
            date: bar.trade_date,
            reason,
        })?;

        let signal = source.signal(index, bar);
        let is_last = index + 1 == bars.len();

        match signal {
            // Entering on the last bar would be liquidated at the same close.
            Signal::Enter if !position.is_open() && !is_last => {
                match execution::enter_long(
                    &mut position,
                    &mut cash,
                    bar.close,
                    bar.trade_date,
                    config.position_sizing,
                    &config.fee_model,
                ) {
                    EntryResult::Entered { quantity, fee, .. } => {
                        debug!(symbol = ticker, date = %bar.trade_date, quantity, %fee, "enter");
                    }
                    EntryResult::InsufficientCapital { budget } => {
                        debug!(
                            symbol = ticker,
                            date = %bar.trade_date,
                            price = %bar.close,
                            %budget,
                            "insufficient capital, entry skipped"
                        );
                        skipped_entries.push(SkippedEntry {
                            date: bar.trade_date,
                            price: bar.close,
                            budget,
                        });
                    }
                }
            }
            Signal::Exit if position.is_open() => {
                if let Some(trade) = execution::exit_long(
                    &mut position,
                    &mut cash,
                    ticker,
                    bar.close,
                    bar.trade_date,
                    &config.fee_model,
                    false,
                ) {
                    debug!(symbol = ticker, date = %bar.trade_date, pnl = %trade.realized_pnl, "exit");
                    trades.push(trade);
                }
            }
            _ => {}
        }
    }

    if let Some(last) = bars.last() {
        if let Some(trade) = execution::exit_long(
            &mut position,
            &mut cash,
            ticker,
            last.close,
            last.trade_date,
            &config.fee_model,
            true,
        ) {
            debug!(symbol = ticker, date = %last.trade_date, pnl = %trade.realized_pnl, "forced close");
            trades.push(trade);
        }
    }

    Ok(SymbolRun {
        symbol: ticker.to_string(),
        trades,
        skipped_entries,
        bars_processed: bars.len(),
        final_cash: cash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::kernel::BarColumns;
    use crate::domain::strategy::{FeeModel, SignalKind};
    use crate::domain::symbol::Symbol;
    use rust_decimal_macros::dec;

    fn series(closes: &[Decimal]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                PriceBar::new(
                    NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32).unwrap(),
                    c,
                    c,
                    c,
                    c,
                    1000,
                )
            })
            .collect();
        PriceSeries::new(Symbol::new("AAA", 0), bars).unwrap()
    }

    fn config() -> StrategyConfig {
        StrategyConfig {
            signal: SignalKind::SmaDeviation,
            lookback_window: 2,
            buy_threshold: dec!(0.1),
            sell_threshold: dec!(0.2),
            position_sizing: dec!(0.5),
            capital_per_symbol: dec!(10000),
            ..Default::default()
        }
    }

    fn reference() -> PriceSeries {
        series(&[dec!(10), dec!(12), dec!(9), dec!(15), dec!(11)])
    }

    #[test]
    fn reference_series_yields_one_trade() {
        let run = run_symbol(&reference(), &config()).unwrap();
        assert_eq!(run.trades.len(), 1);
        let trade = &run.trades[0];
        assert_eq!(trade.entry_price, dec!(12));
        assert_eq!(trade.exit_price, dec!(15));
        assert_eq!(trade.quantity, 416);
        assert_eq!(trade.realized_pnl, dec!(1248));
        assert!(!trade.forced_close);
        assert_eq!(run.final_cash, dec!(11248));
        assert_eq!(run.bars_processed, 5);
    }

    #[test]
    fn final_bar_entry_is_suppressed() {
        let run = run_symbol(&reference(), &config()).unwrap();
        assert!(run.trades.iter().all(|t| !t.forced_close));
        assert!(run.skipped_entries.is_empty());
    }

    #[test]
    fn open_position_is_liquidated_at_end() {
        // Enters at bar 2 and never reaches the sell threshold.
        let run = run_symbol(&series(&[dec!(10), dec!(10), dec!(10.5)]), &StrategyConfig {
            buy_threshold: dec!(0),
            sell_threshold: dec!(0.5),
            ..config()
        })
        .unwrap();
        assert_eq!(run.trades.len(), 1);
        let trade = &run.trades[0];
        assert!(trade.forced_close);
        assert_eq!(trade.exit_price, dec!(10.5));
        assert_eq!(trade.exit_date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn fees_reduce_pnl_by_fee_amount() {
        let free = run_symbol(&reference(), &config()).unwrap();
        let charged = run_symbol(&reference(), &StrategyConfig {
            fee_model: FeeModel::Proportional(dec!(0.001)),
            ..config()
        })
        .unwrap();
        let diff = free.trades[0].realized_pnl - charged.trades[0].realized_pnl;
        assert_eq!(diff, dec!(11.232));
        assert_eq!(diff, charged.trades[0].fees);
    }

    #[test]
    fn fees_do_not_change_quantity_bought() {
        // Budget 1200 at close 12: a fee-inclusive budget would buy 99.
        let sized = StrategyConfig {
            capital_per_symbol: dec!(2000),
            position_sizing: dec!(0.6),
            ..config()
        };
        let free = run_symbol(&reference(), &sized).unwrap();
        let charged = run_symbol(&reference(), &StrategyConfig {
            fee_model: FeeModel::Proportional(dec!(0.001)),
            ..sized
        })
        .unwrap();
        assert_eq!(free.trades[0].quantity, 100);
        assert_eq!(charged.trades[0].quantity, 100);
        assert_eq!(free.trades[0].realized_pnl, dec!(300));
        let diff = free.trades[0].realized_pnl - charged.trades[0].realized_pnl;
        assert_eq!(charged.trades[0].fees, dec!(2.7));
        assert_eq!(diff, charged.trades[0].fees);
        assert_eq!(free.final_cash - charged.final_cash, diff);
    }

    #[test]
    fn entry_fee_beyond_cash_is_skipped() {
        // Full sizing spends all 1200 on 100 shares at 12, leaving nothing
        // for the 1.2 entry fee. At 9 the 133 shares leave 3 for a 1.197 fee.
        let run = run_symbol(&reference(), &StrategyConfig {
            capital_per_symbol: dec!(1200),
            position_sizing: dec!(1),
            fee_model: FeeModel::Proportional(dec!(0.001)),
            ..config()
        })
        .unwrap();
        assert_eq!(run.skipped_entries.len(), 1);
        assert_eq!(run.skipped_entries[0].price, dec!(12));
        assert_eq!(run.trades.len(), 1);
        assert_eq!(run.trades[0].entry_price, dec!(9));
        assert_eq!(run.trades[0].quantity, 133);
    }

    #[test]
    fn insufficient_capital_is_skipped_not_fatal() {
        let run = run_symbol(&reference(), &StrategyConfig {
            capital_per_symbol: dec!(15),
            ..config()
        })
        .unwrap();
        assert!(run.trades.is_empty());
        // Enter at bar 2 (close 12) and bar 3 (close 9) cannot buy one share
        // with 7.5.
        assert_eq!(run.skipped_entries.len(), 2);
        assert_eq!(run.skipped_entries[0].budget, dec!(7.5));
        assert_eq!(run.final_cash, dec!(15));
    }

    #[test]
    fn invalid_bar_aborts_symbol() {
        let mut bars = reference().bars().to_vec();
        bars[2].high = dec!(5);
        let bad = PriceSeries::new(Symbol::new("BAD", 0), bars).unwrap();
        let err = run_symbol(&bad, &config()).unwrap_err();
        match err {
            SymbolError::InvalidBar { symbol, date, reason } => {
                assert_eq!(symbol, "BAD");
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
                assert!(reason.starts_with("high 5 below low 9"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn precomputed_signals_match_incremental() {
        let s = series(&[
            dec!(10),
            dec!(12),
            dec!(9),
            dec!(15),
            dec!(11),
            dec!(8),
            dec!(14),
            dec!(13),
        ]);
        let config = config();
        let columns = BarColumns::from_series(&[&s]);
        let signals = columns.signals(&config);
        let batched = simulate(&s, &config, &mut PrecomputedSignals::new(&signals)).unwrap();
        let cpu = run_symbol(&s, &config).unwrap();
        assert_eq!(batched, cpu);
    }

    #[test]
    fn positions_never_overlap() {
        let s = series(&[
            dec!(10),
            dec!(12),
            dec!(9),
            dec!(15),
            dec!(11),
            dec!(8),
            dec!(14),
            dec!(13),
        ]);
        let run = run_symbol(&s, &config()).unwrap();
        for pair in run.trades.windows(2) {
            assert!(pair[0].exit_date < pair[1].entry_date);
        }
        assert!(run.trades.iter().filter(|t| t.forced_close).count() <= 1);
    }
}
