//! CSV directory data adapter.
//!
//! One `<SYMBOL>.csv` per ticker in the raw download layout
//! `Date,Symbol,Open,High,Low,Close,Volume`, where `Date` may carry a time
//! and UTC offset (`1980-12-12 00:00:00-05:00`); only the calendar date is
//! kept. Rows that fail the import sanity check are dropped with a warning.

use crate::domain::error::EngineError;
use crate::domain::price_bar::MAX_PRICE;
use crate::domain::series::DateRange;
use crate::ports::data_port::{DataPort, PriceRow};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

pub const HEADER: [&str; 7] = ["Date", "Symbol", "Open", "High", "Low", "Close", "Volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// File holding `symbol`. An exact `<SYMBOL>.csv` wins; otherwise the
    /// stem is matched case-insensitively, since tickers are uppercased.
    fn csv_path(&self, symbol: &str) -> Option<PathBuf> {
        let exact = self.base_path.join(format!("{symbol}.csv"));
        if exact.is_file() {
            return Some(exact);
        }
        fs::read_dir(&self.base_path)
            .ok()?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_csv(path))
            .find(|path| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| stem.eq_ignore_ascii_case(symbol))
            })
    }

    /// Every row of one file that passes the sanity check, in file order.
    fn read_rows(&self, symbol: &str) -> Result<Vec<PriceRow>, EngineError> {
        let Some(path) = self.csv_path(symbol) else {
            debug!(symbol, dir = %self.base_path.display(), "no csv file");
            return Ok(Vec::new());
        };
        let content = fs::read_to_string(&path).map_err(|e| EngineError::Database {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| EngineError::Database {
            reason: format!("CSV header error in {}: {}", path.display(), e),
        })?;
        let found: Vec<&str> = headers.iter().map(str::trim).collect();
        if found != HEADER {
            return Err(EngineError::Database {
                reason: format!(
                    "unexpected header in {}: {} (expected {})",
                    path.display(),
                    found.join(","),
                    HEADER.join(",")
                ),
            });
        }

        let mut rows = Vec::new();
        let mut dropped = 0usize;
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| EngineError::Database {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
            match parse_record(&record, symbol) {
                Ok(row) => rows.push(row),
                Err(reason) => {
                    dropped += 1;
                    warn!(symbol, line = line + 2, %reason, "dropping csv row");
                }
            }
        }
        if dropped > 0 {
            warn!(symbol, dropped, kept = rows.len(), "rows failed the sanity check");
        }
        Ok(rows)
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("csv")
}

fn field<'a>(record: &'a csv::StringRecord, index: usize) -> Result<&'a str, String> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| format!("missing {} column", HEADER[index]))
}

fn parse_price(record: &csv::StringRecord, index: usize) -> Result<Decimal, String> {
    let raw = field(record, index)?;
    let value = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| format!("invalid {} value '{}'", HEADER[index], raw))?;
    if value < Decimal::ZERO || value >= MAX_PRICE {
        return Err(format!("{} {} out of range", HEADER[index], value));
    }
    Ok(value)
}

/// Parse the leading `YYYY-MM-DD` of a date or timestamp.
pub fn parse_trade_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_record(record: &csv::StringRecord, symbol: &str) -> Result<PriceRow, String> {
    let raw_date = field(record, 0)?;
    let trade_date =
        parse_trade_date(raw_date).ok_or_else(|| format!("invalid Date value '{raw_date}'"))?;
    let row_symbol = field(record, 1)?;
    if !row_symbol.eq_ignore_ascii_case(symbol) {
        return Err(format!("symbol {row_symbol} in file for {symbol}"));
    }
    let raw_volume = field(record, 6)?;
    // Volumes sometimes arrive as floats ("1234.0").
    let volume = raw_volume
        .parse::<i64>()
        .ok()
        .or_else(|| {
            Decimal::from_str(raw_volume)
                .ok()
                .filter(|v| v.fract().is_zero())
                .and_then(|v| i64::try_from(v).ok())
        })
        .ok_or_else(|| format!("invalid Volume value '{raw_volume}'"))?;
    if volume < 0 {
        return Err(format!("negative volume {volume}"));
    }
    Ok(PriceRow {
        symbol: symbol.to_string(),
        trade_date,
        open: parse_price(record, 2)?,
        high: parse_price(record, 3)?,
        low: parse_price(record, 4)?,
        close: parse_price(record, 5)?,
        volume,
    })
}

impl DataPort for CsvAdapter {
    fn fetch(&self, symbols: &[String], range: DateRange) -> Result<Vec<PriceRow>, EngineError> {
        let mut rows = Vec::new();
        for symbol in symbols {
            // A broken file only loses its own symbol; the store reports it
            // as a gap.
            match self.read_rows(symbol) {
                Ok(found) => rows.extend(
                    found
                        .into_iter()
                        .filter(|r| range.contains(r.trade_date)),
                ),
                Err(e) => warn!(symbol = %symbol, error = %e, "skipping unreadable csv"),
            }
        }
        Ok(rows)
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| EngineError::Database {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::Database {
                reason: format!("failed to read directory entry: {}", e),
            })?;
            let path = entry.path();
            if !is_csv(&path) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                symbols.push(stem.to_uppercase());
            }
        }
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, EngineError> {
        let rows = self.read_rows(symbol)?;
        let first = rows.iter().map(|r| r.trade_date).min();
        let last = rows.iter().map(|r| r.trade_date).max();
        Ok(first.zip(last).map(|(f, l)| (f, l, rows.len())))
    }
}
