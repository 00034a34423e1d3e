//! Aggregation of per-symbol outcomes into a portfolio report.
//!
//! Money stays in exact `Decimal` until the final ratios. Trades from all
//! symbols are merged by exit date, ties broken by ticker, before the
//! equity curve is walked.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeMap;
use tracing::info;

use super::position::Trade;
use super::report::{PortfolioReport, RunReport, StatusCounts, SymbolReport, SymbolStatus};
use super::scheduler::UnitOutcome;
use super::simulation::SymbolRun;
use super::summation::NeumaierSum;

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Run-wide inputs the aggregator cannot derive from trade logs.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateParams {
    pub strategy: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub capital_per_symbol: Decimal,
    /// Distinct trade dates across completed series.
    pub trading_days: usize,
}

fn ratio(numerator: Decimal, denominator: Decimal) -> f64 {
    if denominator.is_zero() {
        return 0.0;
    }
    numerator
        .checked_div(denominator)
        .and_then(|r| r.to_f64())
        .unwrap_or(0.0)
}

fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

fn symbol_report(run: SymbolRun, capital: Decimal) -> SymbolReport {
    let realized_pnl: Decimal = run.trades.iter().map(|t| t.realized_pnl).sum();
    let fees: Decimal = run.trades.iter().map(|t| t.fees).sum();
    SymbolReport {
        symbol: run.symbol,
        status: SymbolStatus::Completed,
        bars: run.bars_processed,
        trade_count: run.trades.len(),
        realized_pnl,
        total_return: ratio(realized_pnl, capital),
        win_rate: win_rate(&run.trades),
        fees,
        skipped_entries: run.skipped_entries,
        trades: run.trades,
    }
}

/// Largest peak-to-trough decline of the realized equity curve, as a
/// fraction of the peak.
pub fn max_drawdown(capital: Decimal, trades: &[&Trade]) -> f64 {
    let mut ordered: Vec<&Trade> = trades.to_vec();
    ordered.sort_by(|a, b| {
        a.exit_date
            .cmp(&b.exit_date)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    let mut equity = capital;
    let mut peak = capital;
    let mut worst = Decimal::ZERO;
    for trade in ordered {
        equity += trade.realized_pnl;
        if equity > peak {
            peak = equity;
        }
        if peak > Decimal::ZERO {
            let drawdown = (peak - equity) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst.to_f64().unwrap_or(0.0)
}

/// `(1 + total_return)^(1 / years) - 1`, or 0 when undefined.
pub fn annualize(total_return: f64, trading_days: usize) -> f64 {
    let years = trading_days as f64 / TRADING_DAYS_PER_YEAR;
    let growth = 1.0 + total_return;
    if years <= 0.0 || growth <= 0.0 {
        return 0.0;
    }
    growth.powf(1.0 / years) - 1.0
}

/// Build the portfolio report. Takes ownership of every trade log.
pub fn aggregate(
    outcomes: BTreeMap<String, UnitOutcome>,
    params: &AggregateParams,
) -> PortfolioReport {
    let mut counts = StatusCounts::default();
    let mut per_symbol = BTreeMap::new();

    for (symbol, outcome) in outcomes {
        let report = match outcome {
            UnitOutcome::Completed(run) => {
                counts.completed += 1;
                symbol_report(run, params.capital_per_symbol)
            }
            UnitOutcome::Skipped(reason) => {
                counts.skipped += 1;
                SymbolReport::not_run(&symbol, SymbolStatus::Skipped { reason })
            }
            UnitOutcome::Failed(error) => {
                counts.failed += 1;
                SymbolReport::not_run(&symbol, SymbolStatus::Failed { error })
            }
            UnitOutcome::Cancelled => {
                counts.cancelled += 1;
                SymbolReport::not_run(&symbol, SymbolStatus::Cancelled)
            }
        };
        per_symbol.insert(symbol, report);
    }

    let capital = params.capital_per_symbol * Decimal::from(counts.completed);
    let trades: Vec<&Trade> = per_symbol.values().flat_map(|r| r.trades.iter()).collect();

    let total_pnl: Decimal = per_symbol.values().map(|r| r.realized_pnl).sum();
    let total_fees: Decimal = per_symbol.values().map(|r| r.fees).sum();
    let total_return = ratio(total_pnl, capital);

    let mut returns = NeumaierSum::new();
    for trade in &trades {
        returns.add(ratio(trade.realized_pnl, trade.entry_notional()));
    }
    let mean_trade_return = if trades.is_empty() {
        0.0
    } else {
        returns.total() / trades.len() as f64
    };

    let winners = trades.iter().filter(|t| t.is_winner()).count();
    let win_rate = if trades.is_empty() {
        0.0
    } else {
        winners as f64 / trades.len() as f64
    };

    let report = PortfolioReport {
        strategy: params.strategy.clone(),
        start_date: params.start_date,
        end_date: params.end_date,
        capital,
        total_pnl,
        total_return,
        annualized_return: annualize(total_return, params.trading_days),
        max_drawdown: max_drawdown(capital, &trades),
        win_rate,
        trade_count: trades.len(),
        forced_close_count: trades.iter().filter(|t| t.forced_close).count(),
        skipped_entry_count: per_symbol.values().map(|r| r.skipped_entries.len()).sum(),
        total_fees,
        mean_trade_return,
        trading_days: params.trading_days,
        symbols: counts,
        per_symbol,
    };

    info!(
        completed = report.symbols.completed,
        skipped = report.symbols.skipped,
        failed = report.symbols.failed,
        cancelled = report.symbols.cancelled,
        trades = report.trade_count,
        total_pnl = %report.total_pnl,
        "aggregated report"
    );
    report
}

/// Aggregate and mark the report partial if any unit was cancelled.
pub fn aggregate_run(
    outcomes: BTreeMap<String, UnitOutcome>,
    params: &AggregateParams,
) -> RunReport {
    let report = aggregate(outcomes, params);
    if report.symbols.cancelled > 0 {
        RunReport::Partial(report)
    } else {
        RunReport::Complete(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::SymbolError;
    use approx::assert_relative_eq;
    use rust_decimal_macros::dec;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn trade(symbol: &str, exit: NaiveDate, pnl: Decimal) -> Trade {
        Trade {
            symbol: symbol.into(),
            entry_date: date(1, 1),
            exit_date: exit,
            entry_price: dec!(10),
            exit_price: dec!(10),
            quantity: 100,
            fees: dec!(0),
            realized_pnl: pnl,
            forced_close: false,
        }
    }

    fn run(symbol: &str, trades: Vec<Trade>) -> UnitOutcome {
        let pnl: Decimal = trades.iter().map(|t| t.realized_pnl).sum();
        UnitOutcome::Completed(SymbolRun {
            symbol: symbol.into(),
            trades,
            skipped_entries: vec![],
            bars_processed: 10,
            final_cash: dec!(1000) + pnl,
        })
    }

    fn params() -> AggregateParams {
        AggregateParams {
            strategy: "test".into(),
            start_date: date(1, 1),
            end_date: date(12, 31),
            capital_per_symbol: dec!(1000),
            trading_days: 252,
        }
    }

    #[test]
    fn totals_and_capital() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert("AAA".into(), run("AAA", vec![trade("AAA", date(2, 1), dec!(100))]));
        outcomes.insert("BBB".into(), run("BBB", vec![trade("BBB", date(3, 1), dec!(-50))]));
        let report = aggregate(outcomes, &params());
        assert_eq!(report.capital, dec!(2000));
        assert_eq!(report.total_pnl, dec!(50));
        assert_relative_eq!(report.total_return, 0.025);
        assert_relative_eq!(report.annualized_return, 0.025, epsilon = 1e-12);
        assert_relative_eq!(report.win_rate, 0.5);
        assert_eq!(report.trade_count, 2);
        assert_eq!(report.symbols.completed, 2);
        // (0.1 + -0.05) / 2
        assert_relative_eq!(report.mean_trade_return, 0.025, epsilon = 1e-12);
    }

    #[test]
    fn total_pnl_equals_per_symbol_sum() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            "AAA".into(),
            run(
                "AAA",
                vec![
                    trade("AAA", date(2, 1), dec!(10.000001)),
                    trade("AAA", date(3, 1), dec!(-3.333333)),
                ],
            ),
        );
        outcomes.insert("BBB".into(), run("BBB", vec![trade("BBB", date(2, 1), dec!(0.1))]));
        let report = aggregate(outcomes, &params());
        let per_symbol: Decimal = report.per_symbol.values().map(|r| r.realized_pnl).sum();
        assert_eq!(report.total_pnl, per_symbol);
        assert_eq!(report.total_pnl, dec!(6.766668));
    }

    #[test]
    fn drawdown_orders_by_exit_then_symbol() {
        // Same exit date: AAA (+100) applies before BBB (-300).
        let a = trade("AAA", date(2, 1), dec!(100));
        let b = trade("BBB", date(2, 1), dec!(-300));
        let c = trade("CCC", date(3, 1), dec!(50));
        let dd = max_drawdown(dec!(1000), &[&c, &b, &a]);
        // peak 1100, trough 800
        assert_relative_eq!(dd, 300.0 / 1100.0, epsilon = 1e-12);
    }

    #[test]
    fn no_losses_no_drawdown() {
        let a = trade("AAA", date(2, 1), dec!(100));
        assert_eq!(max_drawdown(dec!(1000), &[&a]), 0.0);
        assert_eq!(max_drawdown(dec!(1000), &[]), 0.0);
    }

    #[test]
    fn annualize_edges() {
        assert_eq!(annualize(0.5, 0), 0.0);
        assert_eq!(annualize(-1.5, 252), 0.0);
        assert_relative_eq!(annualize(0.21, 504), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn statuses_are_counted_and_kept() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert("AAA".into(), run("AAA", vec![]));
        outcomes.insert("BBB".into(), UnitOutcome::Skipped("excluded by filter".into()));
        outcomes.insert(
            "CCC".into(),
            UnitOutcome::Failed(SymbolError::InvalidBar {
                symbol: "CCC".into(),
                date: date(1, 3),
                reason: "high 1 below low 2".into(),
            }),
        );
        outcomes.insert("DDD".into(), UnitOutcome::Cancelled);
        let report = aggregate(outcomes.clone(), &params());
        assert_eq!(
            report.symbols,
            StatusCounts {
                completed: 1,
                skipped: 1,
                failed: 1,
                cancelled: 1
            }
        );
        assert_eq!(report.capital, dec!(1000));
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.skipped().count(), 1);
        assert!(aggregate_run(outcomes, &params()).is_partial());
    }

    #[test]
    fn empty_run_is_all_zero() {
        let report = aggregate(BTreeMap::new(), &params());
        assert_eq!(report.capital, dec!(0));
        assert_eq!(report.total_return, 0.0);
        assert_eq!(report.win_rate, 0.0);
        assert_eq!(report.mean_trade_return, 0.0);
    }
}
