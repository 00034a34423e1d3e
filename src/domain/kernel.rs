//! Batched signal kernel over a structure-of-arrays bar layout.
//!
//! Each output element depends only on a fixed-length backward window of its
//! own series, so every bar can be computed independently. This is the
//! device-kernel shape; here it runs on the rayon pool. Window sums are
//! recomputed exactly and fed through the same formula as the incremental
//! evaluator.

use rayon::prelude::*;

use super::evaluator::{self, Signal};
use super::rolling::{self, WindowStats};
use super::series::PriceSeries;
use super::strategy::{SignalKind, StrategyConfig};

/// Closes of several series laid out back to back.
#[derive(Debug, Clone, Default)]
pub struct BarColumns {
    closes: Vec<i64>,
    /// Start offset of each series; `offsets[k]..offsets[k + 1]` is series `k`.
    offsets: Vec<usize>,
}

impl BarColumns {
    pub fn from_series(series: &[&PriceSeries]) -> Self {
        let total: usize = series.iter().map(|s| s.len()).sum();
        let mut closes = Vec::with_capacity(total);
        let mut offsets = Vec::with_capacity(series.len() + 1);
        for s in series {
            offsets.push(closes.len());
            // Closes that do not fit belong to bars the simulation rejects
            // before reading their signal.
            closes.extend(s.bars().iter().map(|b| b.close_micros().unwrap_or(0)));
        }
        offsets.push(closes.len());
        BarColumns { closes, offsets }
    }

    pub fn series_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Range of element indices belonging to series `k`.
    pub fn span(&self, k: usize) -> std::ops::Range<usize> {
        self.offsets[k]..self.offsets[k + 1]
    }

    fn owner(&self, index: usize) -> usize {
        // offsets is sorted; find the last start <= index.
        self.offsets.partition_point(|&start| start <= index) - 1
    }

    fn value_at(&self, index: usize, kind: SignalKind, lookback: usize) -> Option<i64> {
        let start = self.offsets[self.owner(index)];
        let position = index - start;
        let seen = position + 1;
        if seen < kind.bars_required(lookback) {
            return None;
        }
        let window_start = (index + 1).saturating_sub(lookback).max(start);
        let mut sum: i128 = 0;
        let mut sum_sq: i128 = 0;
        for &c in &self.closes[window_start..=index] {
            let c = c as i128;
            sum += c;
            sum_sq += c * c;
        }
        let lagged = if position >= lookback {
            Some(self.closes[index - lookback])
        } else {
            None
        };
        let stats = WindowStats {
            sum,
            sum_sq,
            lagged,
        };
        rolling::signal_value(kind, lookback, seen, self.closes[index], &stats)
    }

    /// Signals for every element, computed in parallel.
    pub fn par_signals(&self, config: &StrategyConfig) -> Vec<Signal> {
        let (buy, sell) = config.threshold_micros();
        (0..self.closes.len())
            .into_par_iter()
            .map(|i| {
                let value = self.value_at(i, config.signal, config.lookback_window);
                evaluator::classify(value, buy, sell)
            })
            .collect()
    }

    /// Sequential variant of [`BarColumns::par_signals`].
    pub fn signals(&self, config: &StrategyConfig) -> Vec<Signal> {
        let (buy, sell) = config.threshold_micros();
        (0..self.closes.len())
            .map(|i| {
                let value = self.value_at(i, config.signal, config.lookback_window);
                evaluator::classify(value, buy, sell)
            })
            .collect()
    }
}
