//! Strategy evaluator: bar + rolling state + parameters -> signal.

use serde::Serialize;

use super::price_bar::PriceBar;
use super::rolling::{self, RollingState};
use super::strategy::StrategyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Signal {
    Hold,
    Enter,
    Exit,
}

/// Map an indicator value to a signal. Both thresholds are inclusive.
pub fn classify(value: Option<i64>, buy: i64, sell: i64) -> Signal {
    match value {
        Some(v) if v <= buy => Signal::Enter,
        Some(v) if v >= sell => Signal::Exit,
        _ => Signal::Hold,
    }
}

/// Advance `state` with `bar` and return the signal for that bar.
///
/// Only `bar` and what `state` already holds are visible, so the result at
/// bar `t` depends on bars up to and including `t`.
pub fn evaluate(bar: &PriceBar, state: &mut RollingState, config: &StrategyConfig) -> Signal {
    let Some(close) = bar.close_micros() else {
        return Signal::Hold;
    };
    state.push(close);
    let value = rolling::signal_value(
        config.signal,
        config.lookback_window,
        state.seen(),
        close,
        &state.stats(),
    );
    let (buy, sell) = config.threshold_micros();
    classify(value, buy, sell)
}
