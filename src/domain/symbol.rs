//! Symbol identity and symbol-list parsing.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

/// A ticker plus the dense integer handle used to index store arrays.
///
/// Ordering and equality use the ticker only, so lexicographic tie-breaks do
/// not depend on how handles were assigned.
#[derive(Debug, Clone, Serialize)]
pub struct Symbol {
    pub ticker: String,
    #[serde(skip)]
    pub handle: usize,
}

impl Symbol {
    pub fn new(ticker: impl Into<String>, handle: usize) -> Self {
        Symbol {
            ticker: ticker.into(),
            handle,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.ticker
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.ticker == other.ticker
    }
}

impl Eq for Symbol {}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ticker.cmp(&other.ticker)
    }
}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ticker.hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ticker)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolListError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Parse a comma-separated ticker list, uppercasing and rejecting duplicates.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, SymbolListError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(SymbolListError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(SymbolListError::DuplicateSymbol(ticker));
        }
        symbols.push(ticker);
    }

    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic() {
        let result = parse_symbols("AAPL,MSFT,NVDA").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "NVDA"]);
    }

    #[test]
    fn parse_trims_and_uppercases() {
        let result = parse_symbols("  aapl , msft ,Nvda").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "NVDA"]);
    }

    #[test]
    fn parse_empty_token() {
        assert_eq!(parse_symbols("AAPL,,MSFT"), Err(SymbolListError::EmptyToken));
    }

    #[test]
    fn parse_duplicate_after_case_folding() {
        assert_eq!(
            parse_symbols("AAPL,msft,aapl"),
            Err(SymbolListError::DuplicateSymbol("AAPL".into()))
        );
    }

    #[test]
    fn ordering_ignores_handle() {
        let a = Symbol::new("AAA", 7);
        let b = Symbol::new("BBB", 0);
        assert!(a < b);
        assert_eq!(Symbol::new("AAA", 1), Symbol::new("AAA", 2));
    }

    #[test]
    fn display_is_ticker() {
        assert_eq!(Symbol::new("QQQ", 3).to_string(), "QQQ");
    }
}
