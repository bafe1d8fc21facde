mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::compensation::{SponsorFeeArgs, WaterfallArgs};
use commands::project::{AnalyzeArgs, CashFlowArgs, CostArgs};
use commands::returns::ReturnsArgs;
use commands::risk::RiskArgs;

/// Real-estate development pro formas and LP/GP distributions
#[derive(Parser)]
#[command(
    name = "proforma",
    version,
    about = "Real-estate development pro formas and LP/GP distributions",
    long_about = "A CLI for development pro formas with decimal precision. Builds cost \
                  budgets, sizes construction and permanent debt, projects office, retail, \
                  apartment and for-sale cash flows, allocates them through a promote \
                  waterfall or sponsor fees, and reports returns and risk."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log computation stages to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Full analysis: costs, financing, cash flows, distribution and returns
    Analyze(AnalyzeArgs),
    /// Development cost budget
    Costs(CostArgs),
    /// Costs, financing and the unallocated annual projection
    CashFlows(CashFlowArgs),
    /// LP/GP promote waterfall over a known distributable amount
    Waterfall(WaterfallArgs),
    /// Full analysis under sponsor fee compensation
    SponsorFees(SponsorFeeArgs),
    /// IRR, NPV and multiple for an arbitrary cash flow series
    Returns(ReturnsArgs),
    /// Sensitivity table, Monte Carlo and scenario analysis
    Risk(RiskArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "proforma=debug,proforma_core=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::project::run_analyze(args),
        Commands::Costs(args) => commands::project::run_costs(args),
        Commands::CashFlows(args) => commands::project::run_cash_flows(args),
        Commands::Waterfall(args) => commands::compensation::run_waterfall(args),
        Commands::SponsorFees(args) => commands::compensation::run_sponsor_fees(args),
        Commands::Returns(args) => commands::returns::run_returns(args),
        Commands::Risk(args) => commands::risk::run_risk(args),
        Commands::Version => {
            println!("proforma {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
