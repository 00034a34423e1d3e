//! Rolling indicator state and the shared signal formulas.
//!
//! Closes are `i64` micro-units. Window sums are exact `i128`, so the
//! incremental state here and the fixed-window kernel produce the same
//! [`WindowStats`] and therefore the same signal for every bar.

use std::collections::VecDeque;

use super::fixed;
use super::strategy::SignalKind;

/// Aggregates over the last `n` closes, plus the close `n` bars back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowStats {
    pub sum: i128,
    pub sum_sq: i128,
    pub lagged: Option<i64>,
}

/// Per-symbol indicator state, updated in O(1) per bar.
///
/// Holds up to `n + 1` closes; `sum` and `sum_sq` cover the newest `n`.
#[derive(Debug, Clone)]
pub struct RollingState {
    lookback: usize,
    closes: VecDeque<i64>,
    sum: i128,
    sum_sq: i128,
    seen: usize,
}

impl RollingState {
    pub fn new(lookback: usize) -> Self {
        RollingState {
            lookback,
            closes: VecDeque::with_capacity(lookback + 1),
            sum: 0,
            sum_sq: 0,
            seen: 0,
        }
    }

    pub fn push(&mut self, close: i64) {
        let c = close as i128;
        self.closes.push_back(close);
        self.sum += c;
        self.sum_sq += c * c;
        self.seen += 1;

        if self.closes.len() > self.lookback {
            let leaving = self.closes[self.closes.len() - 1 - self.lookback] as i128;
            self.sum -= leaving;
            self.sum_sq -= leaving * leaving;
        }
        if self.closes.len() > self.lookback + 1 {
            self.closes.pop_front();
        }
    }

    pub fn seen(&self) -> usize {
        self.seen
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn stats(&self) -> WindowStats {
        let lagged = if self.closes.len() == self.lookback + 1 {
            self.closes.front().copied()
        } else {
            None
        };
        WindowStats {
            sum: self.sum,
            sum_sq: self.sum_sq,
            lagged,
        }
    }

    pub fn reset(&mut self) {
        self.closes.clear();
        self.sum = 0;
        self.sum_sq = 0;
        self.seen = 0;
    }
}

/// Signal value in micro-units for the newest `close`, or `None` during
/// warmup or when a denominator is zero.
pub fn signal_value(
    kind: SignalKind,
    lookback: usize,
    seen: usize,
    close: i64,
    stats: &WindowStats,
) -> Option<i64> {
    if seen < kind.bars_required(lookback) {
        return None;
    }
    let n = lookback as i128;
    let c = close as i128;
    match kind {
        SignalKind::Close => Some(close),
        SignalKind::SmaDeviation => {
            if stats.sum == 0 {
                return None;
            }
            fixed::ratio_micros(c * n - stats.sum, stats.sum)
        }
        SignalKind::Momentum => {
            let past = stats.lagged? as i128;
            if past == 0 {
                return None;
            }
            fixed::ratio_micros(c - past, past)
        }
        SignalKind::ZScore => {
            let spread = n * stats.sum_sq - stats.sum * stats.sum;
            if spread <= 0 {
                return None;
            }
            let root = (spread as u128).isqrt() as i128;
            if root == 0 {
                return None;
            }
            fixed::ratio_micros(c * n - stats.sum, root)
        }
    }
}
