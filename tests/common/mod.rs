#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use market_insight::domain::backtest::BacktestConfig;
use market_insight::domain::error::EngineError;
use market_insight::domain::scheduler::SchedulerConfig;
use market_insight::domain::series::DateRange;
use market_insight::domain::strategy::{SignalKind, StrategyConfig};
pub use market_insight::ports::data_port::{DataPort, PriceRow};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

pub struct MockDataPort {
    pub data: BTreeMap<String, Vec<PriceRow>>,
    pub fetch_error: Option<String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            fetch_error: None,
        }
    }

    pub fn with_rows(mut self, symbol: &str, rows: Vec<PriceRow>) -> Self {
        self.data.insert(symbol.to_string(), rows);
        self
    }

    pub fn with_closes(self, symbol: &str, closes: &[Decimal]) -> Self {
        let rows = rows_from_closes(symbol, date(2024, 1, 1), closes);
        self.with_rows(symbol, rows)
    }

    pub fn with_fetch_error(mut self, reason: &str) -> Self {
        self.fetch_error = Some(reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch(&self, symbols: &[String], range: DateRange) -> Result<Vec<PriceRow>, EngineError> {
        if let Some(reason) = &self.fetch_error {
            return Err(EngineError::Database {
                reason: reason.clone(),
            });
        }
        Ok(symbols
            .iter()
            .filter_map(|s| self.data.get(s))
            .flatten()
            .filter(|r| range.contains(r.trade_date))
            .cloned()
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.data.keys().cloned().collect())
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, EngineError> {
        match self.data.get(symbol) {
            Some(rows) if !rows.is_empty() => {
                let min = rows.iter().map(|r| r.trade_date).min().unwrap();
                let max = rows.iter().map(|r| r.trade_date).max().unwrap();
                Ok(Some((min, max, rows.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_row(symbol: &str, trade_date: NaiveDate, close: Decimal) -> PriceRow {
    PriceRow {
        symbol: symbol.to_string(),
        trade_date,
        open: close,
        high: close,
        low: close,
        close,
        volume: 10_000,
    }
}

/// One row per consecutive calendar day starting at `start`.
pub fn rows_from_closes(symbol: &str, start: NaiveDate, closes: &[Decimal]) -> Vec<PriceRow> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_row(symbol, start + Duration::days(i as i64), c))
        .collect()
}

/// The hand-checked series: one trade, 416 shares bought at 12, sold at 15.
pub fn reference_closes() -> Vec<Decimal> {
    vec![dec!(10), dec!(12), dec!(9), dec!(15), dec!(11)]
}

pub fn sample_strategy() -> StrategyConfig {
    StrategyConfig {
        name: "Reference".into(),
        signal: SignalKind::SmaDeviation,
        lookback_window: 2,
        buy_threshold: dec!(0.1),
        sell_threshold: dec!(0.2),
        position_sizing: dec!(0.5),
        capital_per_symbol: dec!(10000),
        ..Default::default()
    }
}

pub fn sample_config(symbols: &[&str]) -> BacktestConfig {
    BacktestConfig {
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        strategy: sample_strategy(),
        scheduler: SchedulerConfig::default(),
    }
}
