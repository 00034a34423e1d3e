//! Parallel scheduler: fans symbol simulations out over a worker pool.
//!
//! One unit of work is one symbol. Units share only the read-only series
//! and strategy; results are gathered and merged into an ordered map once
//! the pool has drained.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{Level, debug, info, span, warn};

use super::error::{EngineError, SymbolError};
use super::kernel::BarColumns;
use super::series::PriceSeries;
use super::simulation::{self, PrecomputedSignals, SymbolRun};
use super::strategy::StrategyConfig;

/// Default number of symbols laid out per kernel batch.
pub const DEFAULT_BATCH_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPath {
    /// Each unit drives the incremental evaluator.
    Cpu,
    /// Signals for a batch of symbols come from the window kernel.
    Batched,
}

impl ExecutionPath {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cpu" => Some(ExecutionPath::Cpu),
            "batched" | "gpu" => Some(ExecutionPath::Batched),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPath::Cpu => "cpu",
            ExecutionPath::Batched => "batched",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerConfig {
    /// Worker threads; 0 uses every available core.
    pub workers: usize,
    pub path: ExecutionPath,
    pub batch_size: usize,
    /// When false, units run one after another in symbol order.
    pub parallel: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            workers: 0,
            path: ExecutionPath::Cpu,
            batch_size: DEFAULT_BATCH_SIZE,
            parallel: true,
        }
    }
}

/// Run-level stop flag, checked before each unit is started.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What became of one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Completed(SymbolRun),
    /// Left out before simulation, e.g. by the symbol filter.
    Skipped(String),
    Failed(SymbolError),
    Cancelled,
}

impl UnitOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, UnitOutcome::Completed(_))
    }
}

type CompletionHook = Box<dyn Fn(&str, &UnitOutcome) + Send + Sync>;

pub struct Scheduler {
    config: SchedulerConfig,
    token: CancellationToken,
    on_complete: Option<CompletionHook>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Scheduler {
            config,
            token: CancellationToken::new(),
            on_complete: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Called after every unit that ran, from the worker that ran it.
    pub fn on_unit_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &UnitOutcome) + Send + Sync + 'static,
    {
        self.on_complete = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Simulate every series and return one outcome per symbol.
    ///
    /// Each symbol is simulated at most once. Units not started before
    /// cancellation are reported as [`UnitOutcome::Cancelled`].
    pub fn run(
        &self,
        series: &[&PriceSeries],
        strategy: &StrategyConfig,
    ) -> Result<BTreeMap<String, UnitOutcome>, EngineError> {
        let mut units: Vec<&PriceSeries> = series.to_vec();
        units.sort_by(|a, b| a.symbol().cmp(b.symbol()));
        units.dedup_by(|a, b| a.symbol() == b.symbol());

        let started = Instant::now();
        info!(
            units = units.len(),
            path = self.config.path.as_str(),
            parallel = self.config.parallel,
            workers = self.config.workers,
            "dispatching simulations"
        );

        let results: Vec<(String, UnitOutcome)> = if self.config.parallel {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.workers)
                .thread_name(|i| format!("sim-worker-{i}"))
                .build()
                .map_err(|e| EngineError::WorkerPool {
                    reason: e.to_string(),
                })?;
            pool.install(|| self.dispatch(&units, strategy))
        } else {
            self.dispatch(&units, strategy)
        };

        let merged: BTreeMap<String, UnitOutcome> = results.into_iter().collect();
        let completed = merged.values().filter(|o| o.is_completed()).count();
        let cancelled = merged
            .values()
            .filter(|o| matches!(o, UnitOutcome::Cancelled))
            .count();
        info!(
            completed,
            cancelled,
            failed = merged.len() - completed - cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "simulations finished"
        );
        Ok(merged)
    }

    fn dispatch(
        &self,
        units: &[&PriceSeries],
        strategy: &StrategyConfig,
    ) -> Vec<(String, UnitOutcome)> {
        match self.config.path {
            ExecutionPath::Cpu => self.map_units(units, |s| simulation::run_symbol(s, strategy)),
            ExecutionPath::Batched => {
                let batch_size = self.config.batch_size.max(1);
                let mut results = Vec::with_capacity(units.len());
                for batch in units.chunks(batch_size) {
                    if self.token.is_cancelled() {
                        results.extend(
                            batch
                                .iter()
                                .map(|s| (s.symbol().ticker.clone(), UnitOutcome::Cancelled)),
                        );
                        continue;
                    }
                    let columns = BarColumns::from_series(batch);
                    let signals = if self.config.parallel {
                        columns.par_signals(strategy)
                    } else {
                        columns.signals(strategy)
                    };
                    debug!(symbols = batch.len(), bars = columns.len(), "kernel batch");
                    let indexed: Vec<(usize, &PriceSeries)> =
                        batch.iter().copied().enumerate().collect();
                    let batch_results = self.map_units(&indexed, |(k, s)| {
                        let slice = &signals[columns.span(*k)];
                        simulation::simulate(s, strategy, &mut PrecomputedSignals::new(slice))
                    });
                    results.extend(batch_results);
                }
                results
            }
        }
    }

    fn map_units<T, F>(&self, units: &[T], simulate: F) -> Vec<(String, UnitOutcome)>
    where
        T: Sync + UnitSymbol,
        F: Fn(&T) -> Result<SymbolRun, SymbolError> + Sync,
    {
        let execute = |unit: &T| {
            let ticker = unit.ticker().to_string();
            if self.token.is_cancelled() {
                return (ticker, UnitOutcome::Cancelled);
            }
            let outcome = self.execute(&ticker, || simulate(unit));
            (ticker, outcome)
        };
        if self.config.parallel {
            units.par_iter().map(execute).collect()
        } else {
            units.iter().map(execute).collect()
        }
    }

    fn execute<F>(&self, ticker: &str, simulate: F) -> UnitOutcome
    where
        F: FnOnce() -> Result<SymbolRun, SymbolError>,
    {
        let span = span!(Level::DEBUG, "simulate", symbol = ticker);
        let _guard = span.enter();
        let started = Instant::now();

        let outcome = match simulate() {
            Ok(run) => {
                debug!(
                    trades = run.trades.len(),
                    skipped_entries = run.skipped_entries.len(),
                    elapsed_us = started.elapsed().as_micros() as u64,
                    "unit complete"
                );
                UnitOutcome::Completed(run)
            }
            Err(e) => {
                warn!(error = %e, "symbol failed");
                UnitOutcome::Failed(e)
            }
        };
        if let Some(hook) = &self.on_complete {
            hook(ticker, &outcome);
        }
        outcome
    }
}

/// Anything that identifies the symbol a unit simulates.
trait UnitSymbol {
    fn ticker(&self) -> &str;
}

impl UnitSymbol for &PriceSeries {
    fn ticker(&self) -> &str {
        self.symbol().as_str()
    }
}

impl UnitSymbol for (usize, &PriceSeries) {
    fn ticker(&self) -> &str {
        self.1.symbol().as_str()
    }
}
