//! Report output port trait.

use std::fs;
use std::path::Path;

use crate::domain::error::EngineError;
use crate::domain::report::RunReport;

/// Port for rendering and writing backtest reports.
pub trait ReportPort {
    /// Render the whole report in this sink's encoding.
    fn render(&self, report: &RunReport) -> Result<String, EngineError>;

    /// Default implementation: render, then write the result to `output_path`.
    fn write(&self, report: &RunReport, output_path: &Path) -> Result<(), EngineError> {
        let content = self.render(report)?;
        fs::write(output_path, content).map_err(|e| EngineError::Report {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        })
    }
}
