//! Per-symbol ordered price series and the unified trading timeline.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use super::error::SymbolError;
use super::price_bar::PriceBar;
use super::symbol::Symbol;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Bars for one symbol, strictly increasing by trade date.
///
/// Construction is the only way to obtain one, and it enforces ordering; OHLC
/// invariants are checked later by the simulation so that a single bad bar
/// fails only its own run.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    symbol: Symbol,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: Symbol, bars: Vec<PriceBar>) -> Result<Self, SymbolError> {
        for pair in bars.windows(2) {
            if pair[1].trade_date <= pair[0].trade_date {
                return Err(SymbolError::DataOrder {
                    symbol: symbol.ticker.clone(),
                    previous: pair[0].trade_date,
                    current: pair[1].trade_date,
                });
            }
        }
        Ok(PriceSeries { symbol, bars })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.trade_date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.trade_date)
    }

    /// Binary search by trade date.
    pub fn get_bar(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.bars
            .binary_search_by_key(&date, |b| b.trade_date)
            .ok()
            .map(|i| &self.bars[i])
    }
}

/// Sorted union of all trade dates across the given series.
pub fn build_unified_timeline<'a>(
    series: impl IntoIterator<Item = &'a PriceSeries>,
) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = series
        .into_iter()
        .flat_map(|s| s.bars.iter().map(|bar| bar.trade_date))
        .collect();
    unique_dates.into_iter().collect()
}
