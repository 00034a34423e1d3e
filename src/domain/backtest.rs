//! Backtest pipeline: load, select, schedule, aggregate.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::aggregator::{self, AggregateParams};
use super::error::EngineError;
use super::report::RunReport;
use super::scheduler::{Scheduler, SchedulerConfig, UnitOutcome};
use super::series::{DateRange, PriceSeries, build_unified_timeline};
use super::store::PriceSeriesStore;
use super::strategy::StrategyConfig;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Requested tickers; empty means every symbol the source knows.
    pub symbols: Vec<String>,
    pub strategy: StrategyConfig,
    pub scheduler: SchedulerConfig,
}

impl BacktestConfig {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.start_date > self.end_date {
            return Err(EngineError::invalid(
                "backtest",
                "start_date",
                format!("{} is after end_date {}", self.start_date, self.end_date),
            ));
        }
        if self.scheduler.batch_size == 0 {
            return Err(EngineError::invalid(
                "backtest",
                "batch_size",
                "must be positive",
            ));
        }
        self.strategy.validate()
    }
}

/// Tickers the run will request, in sorted order.
pub fn resolve_symbols(
    port: &dyn DataPort,
    config: &BacktestConfig,
) -> Result<Vec<String>, EngineError> {
    let mut symbols = if config.symbols.is_empty() {
        port.list_symbols()?
    } else {
        config.symbols.clone()
    };
    symbols.sort();
    symbols.dedup();
    if symbols.is_empty() {
        return Err(EngineError::NoSymbols);
    }
    Ok(symbols)
}

/// Run a backtest with a scheduler built from `config.scheduler`.
pub fn run_backtest(port: &dyn DataPort, config: &BacktestConfig) -> Result<RunReport, EngineError> {
    let scheduler = Scheduler::new(config.scheduler.clone());
    run_backtest_with(port, config, &scheduler)
}

/// Run a backtest on a caller-supplied scheduler, which carries the
/// cancellation token and completion hook.
pub fn run_backtest_with(
    port: &dyn DataPort,
    config: &BacktestConfig,
    scheduler: &Scheduler,
) -> Result<RunReport, EngineError> {
    config.validate()?;
    let requested = resolve_symbols(port, config)?;
    let filter = &config.strategy.symbol_filter;

    let mut outcomes: BTreeMap<String, UnitOutcome> = BTreeMap::new();
    let mut to_load = Vec::with_capacity(requested.len());
    for ticker in requested {
        if filter.admits_ticker(&ticker) {
            to_load.push(ticker);
        } else {
            outcomes.insert(
                ticker,
                UnitOutcome::Skipped("excluded by symbol filter".into()),
            );
        }
    }

    let loaded = PriceSeriesStore::load(port, &to_load, config.range())?;
    for (ticker, error) in loaded.failures {
        outcomes.insert(ticker, UnitOutcome::Failed(error));
    }
    let store = loaded.store;

    // Selection happens once, here, against the loaded series.
    let mut selected: Vec<&PriceSeries> = Vec::with_capacity(store.len());
    for series in store.iter() {
        match filter.evaluate(series) {
            Ok(()) => selected.push(series),
            Err(reason) => {
                info!(symbol = %series.symbol(), %reason, "symbol not selected");
                outcomes.insert(series.symbol().ticker.clone(), UnitOutcome::Skipped(reason));
            }
        }
    }
    info!(
        requested = outcomes.len() + selected.len(),
        selected = selected.len(),
        "symbol selection complete"
    );

    let results = scheduler.run(&selected, &config.strategy)?;
    let completed_series = selected
        .iter()
        .copied()
        .filter(|s| results.get(s.symbol().as_str()).is_some_and(UnitOutcome::is_completed));
    let trading_days = build_unified_timeline(completed_series).len();

    outcomes.extend(results);

    let params = AggregateParams {
        strategy: config.strategy.name.clone(),
        start_date: config.start_date,
        end_date: config.end_date,
        capital_per_symbol: config.strategy.capital_per_symbol,
        trading_days,
    };
    let report = aggregator::aggregate_run(outcomes, &params);
    if report.is_partial() {
        warn!(
            cancelled = report.portfolio().symbols.cancelled,
            "run cancelled, report is partial"
        );
    }
    Ok(report)
}
