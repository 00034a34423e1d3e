//! Report types produced by the aggregator.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use super::error::SymbolError;
use super::position::Trade;
use super::simulation::SkippedEntry;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolStatus {
    Completed,
    Skipped { reason: String },
    Failed { error: SymbolError },
    Cancelled,
}

impl SymbolStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SymbolStatus::Completed => "completed",
            SymbolStatus::Skipped { .. } => "skipped",
            SymbolStatus::Failed { .. } => "failed",
            SymbolStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolReport {
    pub symbol: String,
    #[serde(flatten)]
    pub status: SymbolStatus,
    pub bars: usize,
    pub trade_count: usize,
    pub realized_pnl: Decimal,
    pub total_return: f64,
    pub win_rate: f64,
    pub fees: Decimal,
    pub skipped_entries: Vec<SkippedEntry>,
    pub trades: Vec<Trade>,
}

impl SymbolReport {
    pub fn not_run(symbol: &str, status: SymbolStatus) -> Self {
        SymbolReport {
            symbol: symbol.to_string(),
            status,
            bars: 0,
            trade_count: 0,
            realized_pnl: Decimal::ZERO,
            total_return: 0.0,
            win_rate: 0.0,
            fees: Decimal::ZERO,
            skipped_entries: Vec::new(),
            trades: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Portfolio-level statistics over every completed symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioReport {
    pub strategy: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub symbols: StatusCounts,
    pub capital: Decimal,
    pub total_pnl: Decimal,
    pub total_return: f64,
    pub annualized_return: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub trade_count: usize,
    pub forced_close_count: usize,
    pub skipped_entry_count: usize,
    pub total_fees: Decimal,
    pub mean_trade_return: f64,
    pub trading_days: usize,
    pub per_symbol: BTreeMap<String, SymbolReport>,
}

impl PortfolioReport {
    pub fn completed(&self) -> impl Iterator<Item = &SymbolReport> {
        self.per_symbol
            .values()
            .filter(|r| r.status == SymbolStatus::Completed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &SymbolReport> {
        self.per_symbol
            .values()
            .filter(|r| matches!(r.status, SymbolStatus::Failed { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SymbolReport> {
        self.per_symbol
            .values()
            .filter(|r| matches!(r.status, SymbolStatus::Skipped { .. }))
    }

    pub fn all_trades(&self) -> impl Iterator<Item = &Trade> {
        self.per_symbol.values().flat_map(|r| r.trades.iter())
    }
}

/// Full report, or a partial one built only from units that completed
/// before cancellation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "report", rename_all = "snake_case")]
pub enum RunReport {
    Complete(PortfolioReport),
    Partial(PortfolioReport),
}

impl RunReport {
    pub fn portfolio(&self) -> &PortfolioReport {
        match self {
            RunReport::Complete(r) | RunReport::Partial(r) => r,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, RunReport::Partial(_))
    }
}
