use clap::Args;
use serde_json::Value;

use proforma_core::engine::{analyze_risk, RiskAnalysisInput};

use crate::input;

/// Arguments for risk analysis
#[derive(Args)]
pub struct RiskArgs {
    /// Path to a JSON/YAML file with `assumptions` and optional risk settings
    #[arg(long)]
    pub input: Option<String>,

    /// Monte Carlo iterations (overrides the input file)
    #[arg(long)]
    pub iterations: Option<u32>,

    /// Seed for reproducible Monte Carlo draws (overrides the input file)
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run_risk(args: RiskArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut risk_input: RiskAnalysisInput = input::read_request(args.input.as_deref(), "risk")?;
    if let Some(n) = args.iterations {
        risk_input.monte_carlo.iterations = n;
    }
    if args.seed.is_some() {
        risk_input.monte_carlo.seed = args.seed;
    }

    let result = analyze_risk(&risk_input)?;
    Ok(serde_json::to_value(result)?)
}
