//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::text_report_adapter::TextReportAdapter;
use crate::adapters::trade_csv_adapter::TradeCsvAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig};
use crate::domain::config_validation::build_backtest_config;
use crate::domain::error::EngineError;
use crate::domain::symbol::parse_symbols;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;
use crate::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "market-insight",
    about = "Deterministic daily-bar strategy backtester"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Report destination; stdout when neither this nor [report] output is set
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Comma-separated symbols, replacing [backtest] symbols
        #[arg(long)]
        symbols: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available from the configured data source
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data coverage for symbol(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbols: Option<String>,
    },
}

impl Command {
    fn config_path(&self) -> &Path {
        match self {
            Command::Backtest { config, .. }
            | Command::Validate { config }
            | Command::ListSymbols { config }
            | Command::Info { config, .. } => config,
        }
    }
}

/// Report encodings selectable with `[report] format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Text,
}

impl ReportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(ReportFormat::Json),
            "text" | "txt" => Some(ReportFormat::Text),
            _ => None,
        }
    }

    pub fn sink(self) -> Box<dyn ReportPort> {
        match self {
            ReportFormat::Json => Box::new(JsonReportAdapter),
            ReportFormat::Text => Box::new(TextReportAdapter),
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(cli.command.config_path()) {
        Ok(c) => c,
        Err(code) => return code,
    };
    telemetry::init(&telemetry::configured_level(Some(&config)));

    match cli.command {
        Command::Backtest {
            output,
            symbols,
            dry_run,
            ..
        } => {
            if dry_run {
                run_dry_run(&config, symbols.as_deref())
            } else {
                run_backtest(&config, output.as_deref(), symbols.as_deref())
            }
        }
        Command::Validate { .. } => run_validate(&config),
        Command::ListSymbols { .. } => run_list_symbols(&config),
        Command::Info { symbols, .. } => run_info(&config, symbols.as_deref()),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: EngineError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

/// Open the data source named by `[data] source`. Without the key, SQLite
/// is used when compiled in and the CSV directory otherwise.
pub fn open_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, EngineError> {
    let default_source = if cfg!(feature = "sqlite") {
        "sqlite"
    } else {
        "csv"
    };
    let source = config
        .get_trimmed("data", "source")
        .unwrap_or_else(|| default_source.to_string())
        .to_lowercase();

    match source.as_str() {
        "csv" => {
            let dir = config
                .get_trimmed("data", "csv_dir")
                .ok_or_else(|| EngineError::missing("data", "csv_dir"))?;
            info!(dir = %dir, "using csv data source");
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir))))
        }
        "sqlite" => open_sqlite(config),
        "postgres" => open_postgres(config),
        other => Err(EngineError::invalid(
            "data",
            "source",
            format!("unknown data source '{other}' (expected sqlite, postgres or csv)"),
        )),
    }
}

fn not_compiled(source: &str) -> EngineError {
    EngineError::invalid(
        "data",
        "source",
        format!("{source} support is not compiled in (enable the '{source}' feature)"),
    )
}

#[cfg(feature = "sqlite")]
fn open_sqlite(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, EngineError> {
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    let adapter = SqliteAdapter::from_config(config)?;
    adapter.initialize_schema()?;
    info!("using sqlite data source");
    Ok(Box::new(adapter))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, EngineError> {
    Err(not_compiled("sqlite"))
}

#[cfg(feature = "postgres")]
fn open_postgres(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, EngineError> {
    use crate::adapters::postgres_adapter::PostgresAdapter;
    info!("using postgres data source");
    Ok(Box::new(PostgresAdapter::from_config(config)?))
}

#[cfg(not(feature = "postgres"))]
fn open_postgres(_config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, EngineError> {
    Err(not_compiled("postgres"))
}

/// Build the backtest config, with `--symbols` replacing the configured list.
pub fn resolve_config(
    config: &dyn ConfigPort,
    symbols_override: Option<&str>,
) -> Result<BacktestConfig, EngineError> {
    let mut bt_config = build_backtest_config(config)?;
    if let Some(list) = symbols_override {
        bt_config.symbols =
            parse_symbols(list).map_err(|e| EngineError::invalid("cli", "symbols", e.to_string()))?;
    }
    Ok(bt_config)
}

pub fn report_format(config: &dyn ConfigPort) -> Result<ReportFormat, EngineError> {
    match config.get_trimmed("report", "format") {
        None => Ok(ReportFormat::Text),
        Some(raw) => ReportFormat::parse(&raw).ok_or_else(|| {
            EngineError::invalid(
                "report",
                "format",
                format!("unknown report format '{raw}' (expected json or text)"),
            )
        }),
    }
}

fn run_backtest(
    config: &FileConfigAdapter,
    output_path: Option<&Path>,
    symbols_override: Option<&str>,
) -> ExitCode {
    let bt_config = match resolve_config(config, symbols_override) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let format = match report_format(config) {
        Ok(f) => f,
        Err(e) => return fail(e),
    };
    let data_port = match open_data_port(config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    eprintln!(
        "Running backtest '{}': {} to {}",
        bt_config.strategy.name, bt_config.start_date, bt_config.end_date
    );

    let report = match backtest_engine::run_backtest(data_port.as_ref(), &bt_config) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    let portfolio = report.portfolio();
    eprintln!("\n=== Portfolio Results ===");
    eprintln!(
        "Symbols:          {} completed, {} skipped, {} failed",
        portfolio.symbols.completed, portfolio.symbols.skipped, portfolio.symbols.failed
    );
    eprintln!("Total P&L:        {}", portfolio.total_pnl);
    eprintln!("Total Return:     {:.2}%", portfolio.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", portfolio.annualized_return * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", portfolio.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", portfolio.trade_count);
    eprintln!("Win Rate:         {:.1}%", portfolio.win_rate * 100.0);

    let sink = format.sink();
    let output = output_path
        .map(Path::to_path_buf)
        .or_else(|| config.get_trimmed("report", "output").map(PathBuf::from));
    match output {
        Some(path) => {
            if let Err(e) = sink.write(&report, &path) {
                return fail(e);
            }
            eprintln!("\nReport written to: {}", path.display());
        }
        None => match sink.render(&report) {
            Ok(content) => print!("{content}"),
            Err(e) => return fail(e),
        },
    }

    if let Some(trades_path) = config.get_trimmed("report", "trades_csv") {
        let path = PathBuf::from(trades_path);
        if let Err(e) = TradeCsvAdapter.write(&report, &path) {
            return fail(e);
        }
        eprintln!("Trade log written to: {}", path.display());
    }

    if portfolio.symbols.completed == 0 {
        eprintln!("warning: no symbol completed a simulation");
    }
    ExitCode::SUCCESS
}

fn print_plan(bt_config: &BacktestConfig) {
    let strategy = &bt_config.strategy;
    eprintln!("\nStrategy:");
    eprintln!("  name:               {}", strategy.name);
    eprintln!("  signal:             {}", strategy.signal);
    eprintln!("  lookback_window:    {}", strategy.lookback_window);
    eprintln!("  buy_threshold:      {}", strategy.buy_threshold);
    eprintln!("  sell_threshold:     {}", strategy.sell_threshold);
    eprintln!("  position_sizing:    {}", strategy.position_sizing);
    eprintln!("  capital_per_symbol: {}", strategy.capital_per_symbol);
    eprintln!(
        "  fees:               {} ({})",
        strategy.fee_model.name(),
        strategy.fee_model.rate()
    );

    eprintln!("\nPeriod: {} to {}", bt_config.start_date, bt_config.end_date);
    if bt_config.symbols.is_empty() {
        eprintln!("Symbols: all symbols from the data source");
    } else {
        eprintln!("Symbols: {}", bt_config.symbols.join(", "));
    }

    let scheduler = &bt_config.scheduler;
    let workers = if scheduler.workers == 0 {
        "all cores".to_string()
    } else {
        scheduler.workers.to_string()
    };
    eprintln!(
        "Execution: {} path, {} workers, batch size {}, {}",
        scheduler.path.as_str(),
        workers,
        scheduler.batch_size,
        if scheduler.parallel {
            "parallel"
        } else {
            "sequential"
        }
    );
}

pub fn run_dry_run(config: &FileConfigAdapter, symbols_override: Option<&str>) -> ExitCode {
    let bt_config = match resolve_config(config, symbols_override) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if let Err(e) = report_format(config) {
        return fail(e);
    }
    eprintln!("Config validated successfully");
    print_plan(&bt_config);
    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config: &FileConfigAdapter) -> ExitCode {
    let bt_config = match build_backtest_config(config) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    if let Err(e) = report_format(config) {
        return fail(e);
    }
    print_plan(&bt_config);
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_list_symbols(config: &FileConfigAdapter) -> ExitCode {
    let data_port = match open_data_port(config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let symbols = match data_port.list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found");
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

fn run_info(config: &FileConfigAdapter, symbols_override: Option<&str>) -> ExitCode {
    let data_port = match open_data_port(config) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    let configured = symbols_override
        .map(str::to_string)
        .or_else(|| config.get_trimmed("backtest", "symbols"));
    let symbols = match configured {
        Some(list) => match parse_symbols(&list) {
            Ok(s) => s,
            Err(e) => return fail(EngineError::invalid("cli", "symbols", e.to_string())),
        },
        None => match data_port.list_symbols() {
            Ok(s) => s,
            Err(e) => return fail(e),
        },
    };

    let mut with_data = 0usize;
    let mut total_rows = 0usize;
    let mut earliest = None;
    let mut latest = None;
    for symbol in &symbols {
        match data_port.data_range(symbol) {
            Ok(Some((first, last, count))) => {
                println!("{}: {} bars, {} to {}", symbol, count, first, last);
                with_data += 1;
                total_rows += count;
                earliest = earliest.min(Some(first)).or(Some(first));
                latest = latest.max(Some(last));
            }
            Ok(None) => eprintln!("{}: no data found", symbol),
            Err(e) => eprintln!("error querying {}: {}", symbol, e),
        }
    }

    match earliest.zip(latest) {
        Some((first, last)) => eprintln!(
            "{} of {} symbols with data, {} rows, {} to {}",
            with_data,
            symbols.len(),
            total_rows,
            first,
            last
        ),
        None => eprintln!("No data found for {} symbols", symbols.len()),
    }
    ExitCode::SUCCESS
}
