use clap::Parser;
use market_insight::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
