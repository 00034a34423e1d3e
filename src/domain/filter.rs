//! Symbol selection, applied once per run to the loaded series.

use rust_decimal::Decimal;
use serde::Serialize;

use super::error::EngineError;
use super::series::PriceSeries;

/// Predicate deciding which symbols participate in a run.
///
/// Empty `include` admits every symbol. Thresholds of `None` or zero are
/// not checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SymbolFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub min_bars: usize,
    pub min_average_volume: Option<Decimal>,
    pub min_close: Option<Decimal>,
}

impl SymbolFilter {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.min_average_volume.is_some_and(|v| v < Decimal::ZERO) {
            return Err(EngineError::invalid(
                "filter",
                "min_average_volume",
                "must be non-negative",
            ));
        }
        if self.min_close.is_some_and(|c| c < Decimal::ZERO) {
            return Err(EngineError::invalid(
                "filter",
                "min_close",
                "must be non-negative",
            ));
        }
        if let Some(both) = self.include.iter().find(|s| self.exclude.contains(s)) {
            return Err(EngineError::invalid(
                "filter",
                "exclude",
                format!("{both} is also included"),
            ));
        }
        Ok(())
    }

    /// Whether a ticker can pass at all, before any data is loaded.
    pub fn admits_ticker(&self, ticker: &str) -> bool {
        if self.exclude.iter().any(|s| s == ticker) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|s| s == ticker)
    }

    /// Evaluate the filter against a loaded series. `Err` carries the reason
    /// the symbol was left out.
    pub fn evaluate(&self, series: &PriceSeries) -> Result<(), String> {
        let ticker = series.symbol().as_str();
        if self.exclude.iter().any(|s| s == ticker) {
            return Err("excluded by filter".into());
        }
        if !self.include.is_empty() && !self.include.iter().any(|s| s == ticker) {
            return Err("not in include list".into());
        }
        if series.len() < self.min_bars {
            return Err(format!(
                "{} bars, fewer than min_bars {}",
                series.len(),
                self.min_bars
            ));
        }
        if let Some(min_volume) = self.min_average_volume.filter(|_| !series.is_empty()) {
            let total: i128 = series.bars().iter().map(|b| b.volume as i128).sum();
            let average = Decimal::from_i128_with_scale(total, 0) / Decimal::from(series.len());
            if average < min_volume {
                return Err(format!(
                    "average volume {} below {}",
                    average.round_dp(2),
                    min_volume
                ));
            }
        }
        if let (Some(min_close), Some(last)) = (self.min_close, series.bars().last()) {
            if last.close < min_close {
                return Err(format!("final close {} below {}", last.close, min_close));
            }
        }
        Ok(())
    }
}
