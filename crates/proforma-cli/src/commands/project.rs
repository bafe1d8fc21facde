use clap::Args;
use serde_json::Value;

use proforma_core::assumptions::ProjectAssumptions;
use proforma_core::cash_flow::generate_cash_flows;
use proforma_core::development::costs::calculate_costs;
use proforma_core::engine::{analyze_project, ProjectInput};

use crate::input;

/// Arguments for a full project analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to a JSON/YAML file with `assumptions` and `compensation`
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ProjectInput = input::read_request(args.input.as_deref(), "analyze")?;
    let result = analyze_project(&request)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the cost budget
#[derive(Args)]
pub struct CostArgs {
    /// Path to a JSON/YAML project assumptions file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_costs(args: CostArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions: ProjectAssumptions = input::read_request(args.input.as_deref(), "costs")?;
    let result = calculate_costs(&assumptions)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the annual projection
#[derive(Args)]
pub struct CashFlowArgs {
    /// Path to a JSON/YAML project assumptions file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_cash_flows(args: CashFlowArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions: ProjectAssumptions =
        input::read_request(args.input.as_deref(), "cash-flows")?;
    let result = generate_cash_flows(&assumptions)?;
    Ok(serde_json::to_value(result)?)
}
