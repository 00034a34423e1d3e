//! Data access port trait.
//!
//! The engine only reads: a bulk fetch of raw rows, the symbol list and
//! per-symbol coverage. Persistence is the source's business.

use crate::domain::error::EngineError;
use crate::domain::series::DateRange;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// One row as delivered by a data source, before grouping into series.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub symbol: String,
    pub trade_date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

pub trait DataPort {
    /// Rows for the requested symbols within `range`. Order is whatever the
    /// source yields; the store checks it.
    fn fetch(&self, symbols: &[String], range: DateRange) -> Result<Vec<PriceRow>, EngineError>;

    /// All symbols known to the source, sorted.
    fn list_symbols(&self) -> Result<Vec<String>, EngineError>;

    /// First date, last date and row count for one symbol.
    fn data_range(&self, symbol: &str)
    -> Result<Option<(NaiveDate, NaiveDate, usize)>, EngineError>;
}
