//! Plain-text report adapter: a portfolio summary followed by a per-symbol
//! table and the reasons behind every skipped or failed symbol.

use std::fmt::Write;

use crate::domain::error::EngineError;
use crate::domain::report::{PortfolioReport, RunReport, SymbolReport, SymbolStatus};
use crate::ports::report_port::ReportPort;

pub struct TextReportAdapter;

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn fmt_err(e: std::fmt::Error) -> EngineError {
    EngineError::Report {
        reason: e.to_string(),
    }
}

fn render_summary(out: &mut String, report: &PortfolioReport, partial: bool) -> std::fmt::Result {
    writeln!(out, "Strategy:          {}", report.strategy)?;
    writeln!(
        out,
        "Period:            {} to {} ({} trading days)",
        report.start_date, report.end_date, report.trading_days
    )?;
    if partial {
        writeln!(out, "Status:            PARTIAL (run cancelled)")?;
    }
    writeln!(
        out,
        "Symbols:           {} completed, {} skipped, {} failed, {} cancelled",
        report.symbols.completed,
        report.symbols.skipped,
        report.symbols.failed,
        report.symbols.cancelled
    )?;
    writeln!(out, "Capital:           {}", report.capital)?;
    writeln!(out, "Total P&L:         {}", report.total_pnl)?;
    writeln!(out, "Total return:      {}", pct(report.total_return))?;
    writeln!(out, "Annualized return: {}", pct(report.annualized_return))?;
    writeln!(out, "Max drawdown:      {}", pct(report.max_drawdown))?;
    writeln!(
        out,
        "Trades:            {} ({} forced close, {} entries skipped)",
        report.trade_count, report.forced_close_count, report.skipped_entry_count
    )?;
    writeln!(out, "Win rate:          {}", pct(report.win_rate))?;
    writeln!(out, "Mean trade return: {}", pct(report.mean_trade_return))?;
    writeln!(out, "Total fees:        {}", report.total_fees)
}

fn render_row(out: &mut String, row: &SymbolReport) -> std::fmt::Result {
    writeln!(
        out,
        "{:<10} {:<10} {:>7} {:>7} {:>16} {:>9} {:>9}",
        row.symbol,
        row.status.label(),
        row.bars,
        row.trade_count,
        row.realized_pnl.round_dp(2),
        pct(row.total_return),
        pct(row.win_rate)
    )
}

fn render_notes(out: &mut String, report: &PortfolioReport) -> std::fmt::Result {
    let mut header = false;
    for row in report.per_symbol.values() {
        let note = match &row.status {
            SymbolStatus::Skipped { reason } => reason.clone(),
            SymbolStatus::Failed { error } => error.to_string(),
            SymbolStatus::Completed | SymbolStatus::Cancelled => continue,
        };
        if !header {
            writeln!(out)?;
            writeln!(out, "Not run:")?;
            header = true;
        }
        writeln!(out, "  {:<10} {:<8} {}", row.symbol, row.status.label(), note)?;
    }
    Ok(())
}

impl ReportPort for TextReportAdapter {
    fn render(&self, report: &RunReport) -> Result<String, EngineError> {
        let portfolio = report.portfolio();
        let mut out = String::new();

        render_summary(&mut out, portfolio, report.is_partial()).map_err(fmt_err)?;

        if !portfolio.per_symbol.is_empty() {
            writeln!(out).map_err(fmt_err)?;
            writeln!(
                out,
                "{:<10} {:<10} {:>7} {:>7} {:>16} {:>9} {:>9}",
                "Symbol", "Status", "Bars", "Trades", "P&L", "Return", "Win"
            )
            .map_err(fmt_err)?;
            for row in portfolio.per_symbol.values() {
                render_row(&mut out, row).map_err(fmt_err)?;
            }
        }

        render_notes(&mut out, portfolio).map_err(fmt_err)?;
        Ok(out)
    }
}
