//! Domain error types.
//!
//! Two tiers: [`EngineError`] aborts a whole run (configuration, data source,
//! report sink), [`SymbolError`] isolates one symbol and never escapes its
//! unit of work.

use chrono::NaiveDate;
use serde::Serialize;

/// Run-level error for market-insight.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no symbols to backtest")]
    NoSymbols,

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error("worker pool error: {reason}")]
    WorkerPool { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        EngineError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        EngineError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) | EngineError::Report { .. } | EngineError::WorkerPool { .. } => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::Database { .. } | EngineError::DatabaseQuery { .. } => 3,
            EngineError::NoSymbols => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Failure confined to a single symbol's series or simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolError {
    /// The data source returned no rows for the requested range.
    #[error("no rows for {symbol} between {start} and {end}")]
    DataGap {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Rows are not strictly increasing by trade date.
    #[error("rows for {symbol} out of order: {current} follows {previous}")]
    DataOrder {
        symbol: String,
        previous: NaiveDate,
        current: NaiveDate,
    },

    /// A bar violates the OHLC invariants.
    #[error("invalid bar for {symbol} on {date}: {reason}")]
    InvalidBar {
        symbol: String,
        date: NaiveDate,
        reason: String,
    },
}

impl SymbolError {
    pub fn symbol(&self) -> &str {
        match self {
            SymbolError::DataGap { symbol, .. }
            | SymbolError::DataOrder { symbol, .. }
            | SymbolError::InvalidBar { symbol, .. } => symbol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::ExitCode;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn exit_code(err: &EngineError) -> String {
        format!("{:?}", ExitCode::from(err))
    }

    fn code(n: u8) -> String {
        format!("{:?}", ExitCode::from(n))
    }

    #[test]
    fn config_errors_exit_with_two() {
        let err = EngineError::invalid("strategy", "lookback_window", "must be positive");
        assert_eq!(exit_code(&err), code(2));
        let err = EngineError::missing("backtest", "start_date");
        assert_eq!(exit_code(&err), code(2));
    }

    #[test]
    fn database_errors_exit_with_three() {
        let err = EngineError::Database {
            reason: "refused".into(),
        };
        assert_eq!(exit_code(&err), code(3));
    }

    #[test]
    fn no_symbols_exit_with_five() {
        assert_eq!(exit_code(&EngineError::NoSymbols), code(5));
    }

    #[test]
    fn config_invalid_message() {
        let err = EngineError::invalid("strategy", "fee_rate", "must be non-negative");
        assert_eq!(
            err.to_string(),
            "invalid config value [strategy] fee_rate: must be non-negative"
        );
    }

    #[test]
    fn symbol_error_reports_owner() {
        let err = SymbolError::InvalidBar {
            symbol: "AAA".into(),
            date: date(2024, 1, 3),
            reason: "high below low".into(),
        };
        assert_eq!(err.symbol(), "AAA");
        assert_eq!(
            err.to_string(),
            "invalid bar for AAA on 2024-01-03: high below low"
        );
    }

    #[test]
    fn data_order_message() {
        let err = SymbolError::DataOrder {
            symbol: "BBB".into(),
            previous: date(2024, 1, 5),
            current: date(2024, 1, 4),
        };
        assert_eq!(
            err.to_string(),
            "rows for BBB out of order: 2024-01-04 follows 2024-01-05"
        );
    }

    #[test]
    fn symbol_error_serializes_with_kind_tag() {
        let err = SymbolError::DataGap {
            symbol: "CCC".into(),
            start: date(2020, 1, 1),
            end: date(2020, 12, 31),
        };
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"kind\":\"data_gap\""));
        assert!(json.contains("\"symbol\":\"CCC\""));
    }
}
