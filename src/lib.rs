//! market-insight: deterministic daily-bar backtesting engine.
//!
//! Hexagonal architecture: the engine lives in [`domain`], port traits in
//! [`ports`], concrete data sources, config reader and report sinks in
//! [`adapters`]. The binary front end is [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
pub mod telemetry;
