//! Configuration validation.
//!
//! Reads every backtest and strategy key from a [`ConfigPort`], rejecting
//! bad values before any data is loaded or simulation started.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::EngineError;
use crate::domain::filter::SymbolFilter;
use crate::domain::scheduler::{DEFAULT_BATCH_SIZE, ExecutionPath, SchedulerConfig};
use crate::domain::strategy::{FeeModel, SignalKind, StrategyConfig};
use crate::domain::symbol::parse_symbols;
use crate::ports::config_port::ConfigPort;

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, EngineError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;
    if start_date > end_date {
        return Err(EngineError::invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }

    let symbols = match config.get_trimmed("backtest", "symbols") {
        Some(list) => parse_symbols(&list)
            .map_err(|e| EngineError::invalid("backtest", "symbols", e.to_string()))?,
        None => Vec::new(),
    };

    let backtest = BacktestConfig {
        start_date,
        end_date,
        symbols,
        strategy: build_strategy(config)?,
        scheduler: build_scheduler_config(config)?,
    };
    backtest.validate()?;
    Ok(backtest)
}

pub fn build_strategy(config: &dyn ConfigPort) -> Result<StrategyConfig, EngineError> {
    let defaults = StrategyConfig::default();

    let signal = match config.get_trimmed("strategy", "signal") {
        Some(raw) => SignalKind::parse(&raw).ok_or_else(|| {
            EngineError::invalid(
                "strategy",
                "signal",
                format!("unknown signal '{raw}' (expected sma_deviation, momentum, zscore or close)"),
            )
        })?,
        None => defaults.signal,
    };

    let lookback = config
        .get_integer("strategy", "lookback_window")?
        .unwrap_or(defaults.lookback_window as i64);
    if lookback <= 0 {
        return Err(EngineError::invalid(
            "strategy",
            "lookback_window",
            "lookback_window must be positive",
        ));
    }

    let buy_threshold = config
        .get_decimal("strategy", "buy_threshold")?
        .ok_or_else(|| EngineError::missing("strategy", "buy_threshold"))?;
    let sell_threshold = config
        .get_decimal("strategy", "sell_threshold")?
        .ok_or_else(|| EngineError::missing("strategy", "sell_threshold"))?;

    let fee_rate = config
        .get_decimal("strategy", "fee_rate")?
        .unwrap_or(Decimal::ZERO);
    let fee_model = match config.get_trimmed("strategy", "fee_model") {
        Some(raw) => FeeModel::parse(&raw, fee_rate).ok_or_else(|| {
            EngineError::invalid(
                "strategy",
                "fee_model",
                format!("unknown fee model '{raw}' (expected none, flat or proportional)"),
            )
        })?,
        None if fee_rate.is_zero() => FeeModel::None,
        None => FeeModel::Proportional(fee_rate),
    };

    let strategy = StrategyConfig {
        name: config
            .get_trimmed("strategy", "name")
            .unwrap_or(defaults.name),
        signal,
        buy_threshold,
        sell_threshold,
        lookback_window: lookback as usize,
        symbol_filter: build_filter(config)?,
        position_sizing: config
            .get_decimal("strategy", "position_sizing")?
            .unwrap_or(defaults.position_sizing),
        capital_per_symbol: config
            .get_decimal("strategy", "capital_per_symbol")?
            .unwrap_or(defaults.capital_per_symbol),
        fee_model,
    };
    strategy.validate()?;
    Ok(strategy)
}

pub fn build_filter(config: &dyn ConfigPort) -> Result<SymbolFilter, EngineError> {
    let upper = |key: &str| -> Vec<String> {
        config
            .get_list("filter", key)
            .into_iter()
            .map(|s| s.to_uppercase())
            .collect()
    };
    let min_bars = config.get_integer("filter", "min_bars")?.unwrap_or(0);
    if min_bars < 0 {
        return Err(EngineError::invalid(
            "filter",
            "min_bars",
            "min_bars must be non-negative",
        ));
    }
    let filter = SymbolFilter {
        include: upper("include"),
        exclude: upper("exclude"),
        min_bars: min_bars as usize,
        min_average_volume: config.get_decimal("filter", "min_average_volume")?,
        min_close: config.get_decimal("filter", "min_close")?,
    };
    filter.validate()?;
    Ok(filter)
}

pub fn build_scheduler_config(config: &dyn ConfigPort) -> Result<SchedulerConfig, EngineError> {
    let workers = config.get_integer("backtest", "workers")?.unwrap_or(0);
    if workers < 0 {
        return Err(EngineError::invalid(
            "backtest",
            "workers",
            "workers must be non-negative",
        ));
    }
    let batch_size = config
        .get_integer("backtest", "batch_size")?
        .unwrap_or(DEFAULT_BATCH_SIZE as i64);
    if batch_size <= 0 {
        return Err(EngineError::invalid(
            "backtest",
            "batch_size",
            "batch_size must be positive",
        ));
    }
    let path = match config.get_trimmed("backtest", "execution_path") {
        Some(raw) => ExecutionPath::parse(&raw).ok_or_else(|| {
            EngineError::invalid(
                "backtest",
                "execution_path",
                format!("unknown execution path '{raw}' (expected cpu or batched)"),
            )
        })?,
        None => ExecutionPath::Cpu,
    };
    Ok(SchedulerConfig {
        workers: workers as usize,
        path,
        batch_size: batch_size as usize,
        parallel: config.get_bool("backtest", "parallel", true),
    })
}

fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDate, EngineError> {
    let raw = config
        .get_trimmed("backtest", field)
        .ok_or_else(|| EngineError::missing("backtest", field))?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
        EngineError::invalid(
            "backtest",
            field,
            format!("invalid {field} format, expected YYYY-MM-DD"),
        )
    })
}
