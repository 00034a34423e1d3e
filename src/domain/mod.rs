//! Core domain types and the backtesting engine.

pub mod fixed;
pub mod price_bar;
pub mod symbol;
pub mod series;
pub mod store;
pub mod filter;
pub mod strategy;
pub mod rolling;
pub mod evaluator;
pub mod kernel;
pub mod position;
pub mod execution;
pub mod simulation;
pub mod scheduler;
pub mod summation;
pub mod report;
pub mod aggregator;
pub mod backtest;
pub mod config_validation;
pub mod error;
