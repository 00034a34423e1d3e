//! JSON report adapter.
//!
//! Pretty-printed `serde_json`. Maps are `BTreeMap`s and money is emitted as
//! decimal strings, so equal reports always encode to equal bytes.

use crate::domain::error::EngineError;
use crate::domain::report::RunReport;
use crate::ports::report_port::ReportPort;

pub struct JsonReportAdapter;

impl ReportPort for JsonReportAdapter {
    fn render(&self, report: &RunReport) -> Result<String, EngineError> {
        let mut json = serde_json::to_string_pretty(report).map_err(|e| EngineError::Report {
            reason: e.to_string(),
        })?;
        json.push('\n');
        Ok(json)
    }
}
