//! In-memory price series store.
//!
//! Loaded once from a [`DataPort`], immutable afterwards. Reads need no
//! locking: workers share `&PriceSeriesStore`.

use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use super::error::{EngineError, SymbolError};
use super::price_bar::PriceBar;
use super::series::{DateRange, PriceSeries};
use super::symbol::Symbol;
use crate::ports::data_port::{DataPort, PriceRow};

#[derive(Debug, Default)]
pub struct PriceSeriesStore {
    series: Vec<PriceSeries>,
    index: HashMap<String, usize>,
}

/// Result of a load: the usable store plus symbols that failed to load.
#[derive(Debug)]
pub struct LoadOutcome {
    pub store: PriceSeriesStore,
    pub failures: BTreeMap<String, SymbolError>,
}

impl PriceSeriesStore {
    /// Fetch `symbols` over `range` and group the rows into series.
    ///
    /// Source failures abort the load; per-symbol problems (no rows, rows
    /// out of order) are collected in [`LoadOutcome::failures`].
    pub fn load(
        port: &dyn DataPort,
        symbols: &[String],
        range: DateRange,
    ) -> Result<LoadOutcome, EngineError> {
        let rows = port.fetch(symbols, range)?;
        info!(
            symbols = symbols.len(),
            rows = rows.len(),
            start = %range.start,
            end = %range.end,
            "fetched price rows"
        );
        Ok(Self::from_rows(symbols, range, rows))
    }

    /// Group rows by symbol, preserving the row order the source produced.
    pub fn from_rows(symbols: &[String], range: DateRange, rows: Vec<PriceRow>) -> LoadOutcome {
        let mut requested: Vec<String> = symbols.to_vec();
        requested.sort();
        requested.dedup();

        let mut grouped: BTreeMap<String, Vec<PriceBar>> = requested
            .iter()
            .map(|s| (s.clone(), Vec::new()))
            .collect();

        for row in rows {
            if !range.contains(row.trade_date) {
                continue;
            }
            if let Some(bars) = grouped.get_mut(&row.symbol) {
                bars.push(PriceBar::new(
                    row.trade_date,
                    row.open,
                    row.high,
                    row.low,
                    row.close,
                    row.volume,
                ));
            }
        }

        let mut store = PriceSeriesStore::default();
        let mut failures = BTreeMap::new();

        for (ticker, bars) in grouped {
            if bars.is_empty() {
                warn!(symbol = %ticker, "no rows in range");
                failures.insert(
                    ticker.clone(),
                    SymbolError::DataGap {
                        symbol: ticker,
                        start: range.start,
                        end: range.end,
                    },
                );
                continue;
            }

            let handle = store.series.len();
            match PriceSeries::new(Symbol::new(ticker.clone(), handle), bars) {
                Ok(series) => {
                    store.index.insert(ticker, handle);
                    store.series.push(series);
                }
                Err(e) => {
                    warn!(symbol = %ticker, error = %e, "rejecting series");
                    failures.insert(ticker, e);
                }
            }
        }

        LoadOutcome { store, failures }
    }

    /// Build a store from already-constructed series. Handles are reassigned
    /// in ticker order.
    pub fn from_series(mut series: Vec<PriceSeries>) -> Self {
        series.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        let mut store = PriceSeriesStore::default();
        for s in series {
            let handle = store.series.len();
            let symbol = Symbol::new(s.symbol().ticker.clone(), handle);
            let ticker = symbol.ticker.clone();
            // Already ordered, so this cannot fail.
            if let Ok(rebuilt) = PriceSeries::new(symbol, s.bars().to_vec()) {
                store.index.insert(ticker, handle);
                store.series.push(rebuilt);
            }
        }
        store
    }

    pub fn get(&self, ticker: &str) -> Option<&PriceSeries> {
        self.index.get(ticker).map(|&h| &self.series[h])
    }

    pub fn by_handle(&self, handle: usize) -> Option<&PriceSeries> {
        self.series.get(handle)
    }

    /// Series in ticker order.
    pub fn iter(&self) -> impl Iterator<Item = &PriceSeries> {
        self.series.iter()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.series.iter().map(|s| s.symbol())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn total_bars(&self) -> usize {
        self.series.iter().map(|s| s.len()).sum()
    }
}
