//! Configuration access port trait.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::domain::error::EngineError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Trimmed value, with empty values treated as absent.
    fn get_trimmed(&self, section: &str, key: &str) -> Option<String> {
        self.get_string(section, key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Decimal value. A value that does not parse is an
    /// error, never a silent default.
    fn get_decimal(&self, section: &str, key: &str) -> Result<Option<Decimal>, EngineError> {
        match self.get_trimmed(section, key) {
            None => Ok(None),
            Some(raw) => Decimal::from_str(&raw)
                .or_else(|_| Decimal::from_scientific(&raw))
                .map(Some)
                .map_err(|_| EngineError::invalid(section, key, format!("not a number: {raw}"))),
        }
    }

    /// Integer value. Like [`ConfigPort::get_decimal`], a value that does not
    /// parse is an error.
    fn get_integer(&self, section: &str, key: &str) -> Result<Option<i64>, EngineError> {
        match self.get_trimmed(section, key) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|_| EngineError::invalid(section, key, format!("not an integer: {raw}"))),
        }
    }

    /// Comma-separated list; blank entries are dropped.
    fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        self.get_string(section, key)
            .map(|s| {
                s.split(',')
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
