//! Trade log CSV adapter: one row per closed trade, ordered by exit date
//! then symbol.

use crate::domain::error::EngineError;
use crate::domain::position::Trade;
use crate::domain::report::RunReport;
use crate::ports::report_port::ReportPort;

pub struct TradeCsvAdapter;

fn csv_err(e: impl std::fmt::Display) -> EngineError {
    EngineError::Report {
        reason: format!("trade csv: {e}"),
    }
}

impl ReportPort for TradeCsvAdapter {
    fn render(&self, report: &RunReport) -> Result<String, EngineError> {
        let mut trades: Vec<&Trade> = report.portfolio().all_trades().collect();
        trades.sort_by(|a, b| {
            a.exit_date
                .cmp(&b.exit_date)
                .then_with(|| a.symbol.cmp(&b.symbol))
                .then_with(|| a.entry_date.cmp(&b.entry_date))
        });

        let mut wtr = csv::Writer::from_writer(Vec::new());
        if trades.is_empty() {
            wtr.write_record([
                "symbol",
                "entry_date",
                "exit_date",
                "entry_price",
                "exit_price",
                "quantity",
                "fees",
                "realized_pnl",
                "forced_close",
            ])
            .map_err(csv_err)?;
        }
        for trade in trades {
            wtr.serialize(trade).map_err(csv_err)?;
        }
        let bytes = wtr.into_inner().map_err(csv_err)?;
        String::from_utf8(bytes).map_err(csv_err)
    }
}
