//! Strategy parameters: signal, thresholds, sizing and fees.
//!
//! A `StrategyConfig` is validated once before any simulation starts and is
//! never mutated during a run.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use super::error::EngineError;
use super::filter::SymbolFilter;
use super::fixed;
use super::price_bar::MAX_PRICE;

/// Largest accepted lookback window, about ten years of trading days.
pub const MAX_LOOKBACK: usize = 2520;

/// Largest accepted `capital_per_symbol`. Keeps share counts and notionals
/// well inside `i64` and `Decimal` range at the smallest price tick.
pub const MAX_CAPITAL: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Indicator whose value is compared against the thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// `close / SMA(n) - 1`
    SmaDeviation,
    /// `close / close[t-n] - 1`
    Momentum,
    /// `(close - SMA(n)) / stddev(n)`, population standard deviation.
    ZScore,
    /// The close price itself.
    Close,
}

impl SignalKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sma_deviation" => Some(SignalKind::SmaDeviation),
            "momentum" => Some(SignalKind::Momentum),
            "zscore" => Some(SignalKind::ZScore),
            "close" => Some(SignalKind::Close),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::SmaDeviation => "sma_deviation",
            SignalKind::Momentum => "momentum",
            SignalKind::ZScore => "zscore",
            SignalKind::Close => "close",
        }
    }

    /// Number of closes the indicator must have seen before it emits a value.
    pub fn bars_required(&self, lookback: usize) -> usize {
        match self {
            SignalKind::SmaDeviation | SignalKind::ZScore => lookback,
            SignalKind::Momentum => lookback + 1,
            SignalKind::Close => 1,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fee charged on every fill, entry and exit alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "model", content = "rate", rename_all = "snake_case")]
pub enum FeeModel {
    None,
    /// Fixed amount per fill.
    Flat(Decimal),
    /// Fraction of the fill's notional.
    Proportional(Decimal),
}

impl FeeModel {
    /// Parse a `fee_model` name together with its `fee_rate`.
    pub fn parse(model: &str, rate: Decimal) -> Option<Self> {
        match model.trim().to_lowercase().as_str() {
            "none" => Some(FeeModel::None),
            "flat" => Some(FeeModel::Flat(rate)),
            "proportional" => Some(FeeModel::Proportional(rate)),
            _ => None,
        }
    }

    /// Fee for a fill of the given notional, rounded to 6 digits.
    pub fn fee(&self, notional: Decimal) -> Decimal {
        match self {
            FeeModel::None => Decimal::ZERO,
            FeeModel::Flat(amount) => *amount,
            FeeModel::Proportional(rate) => fixed::round_price(notional * rate),
        }
    }

    pub fn rate(&self) -> Decimal {
        match self {
            FeeModel::None => Decimal::ZERO,
            FeeModel::Flat(r) | FeeModel::Proportional(r) => *r,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FeeModel::None => "none",
            FeeModel::Flat(_) => "flat",
            FeeModel::Proportional(_) => "proportional",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyConfig {
    pub name: String,
    pub signal: SignalKind,
    pub buy_threshold: Decimal,
    pub sell_threshold: Decimal,
    pub lookback_window: usize,
    pub symbol_filter: SymbolFilter,
    pub position_sizing: Decimal,
    pub capital_per_symbol: Decimal,
    pub fee_model: FeeModel,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            name: "default".into(),
            signal: SignalKind::SmaDeviation,
            buy_threshold: Decimal::new(-5, 2),
            sell_threshold: Decimal::new(5, 2),
            lookback_window: 20,
            symbol_filter: SymbolFilter::default(),
            position_sizing: Decimal::ONE,
            capital_per_symbol: Decimal::from(10_000),
            fee_model: FeeModel::None,
        }
    }
}

impl StrategyConfig {
    /// Reject configurations that could not run. Called before any
    /// simulation starts.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.lookback_window == 0 {
            return Err(EngineError::invalid(
                "strategy",
                "lookback_window",
                "must be positive",
            ));
        }
        if self.lookback_window > MAX_LOOKBACK {
            return Err(EngineError::invalid(
                "strategy",
                "lookback_window",
                format!("must be at most {MAX_LOOKBACK}"),
            ));
        }
        for (key, value) in [
            ("buy_threshold", self.buy_threshold),
            ("sell_threshold", self.sell_threshold),
        ] {
            if value.abs() >= MAX_PRICE {
                return Err(EngineError::invalid("strategy", key, "magnitude too large"));
            }
        }
        let (buy, sell) = self.threshold_micros();
        if buy >= sell {
            return Err(EngineError::invalid(
                "strategy",
                "buy_threshold",
                format!(
                    "must be below sell_threshold ({} >= {})",
                    self.buy_threshold, self.sell_threshold
                ),
            ));
        }
        if self.position_sizing <= Decimal::ZERO || self.position_sizing > Decimal::ONE {
            return Err(EngineError::invalid(
                "strategy",
                "position_sizing",
                "must be in (0, 1]",
            ));
        }
        if self.capital_per_symbol <= Decimal::ZERO {
            return Err(EngineError::invalid(
                "strategy",
                "capital_per_symbol",
                "must be positive",
            ));
        }
        if self.capital_per_symbol > MAX_CAPITAL {
            return Err(EngineError::invalid(
                "strategy",
                "capital_per_symbol",
                format!("must be at most {MAX_CAPITAL}"),
            ));
        }
        if self.fee_model.rate() < Decimal::ZERO {
            return Err(EngineError::invalid(
                "strategy",
                "fee_rate",
                "must be non-negative",
            ));
        }
        self.symbol_filter.validate()
    }

    /// Buy and sell thresholds in micro-units, rounded to 6 digits.
    pub fn threshold_micros(&self) -> (i64, i64) {
        (
            fixed::to_micros(self.buy_threshold).unwrap_or(i64::MIN),
            fixed::to_micros(self.sell_threshold).unwrap_or(i64::MAX),
        )
    }
}
