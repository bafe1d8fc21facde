use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use proforma_core::assumptions::ProjectAssumptions;
use proforma_core::compensation::sponsor_fees::SponsorFeeStructure;
use proforma_core::compensation::waterfall::{calculate_waterfall, WaterfallInput};
use proforma_core::compensation::CompensationMode;
use proforma_core::engine::compute;

use crate::input;

/// Arguments for a standalone waterfall
#[derive(Args)]
pub struct WaterfallArgs {
    /// Path to a JSON/YAML file with equity, distributable, hold_years and structure
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_waterfall(args: WaterfallArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let wf_input: WaterfallInput = input::read_request(args.input.as_deref(), "waterfall")?;
    let result = calculate_waterfall(&wf_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for a sponsor fee analysis
#[derive(Args)]
pub struct SponsorFeeArgs {
    /// Path to a JSON/YAML file with `assumptions` and `fees`
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
struct SponsorFeeRequest {
    assumptions: ProjectAssumptions,
    #[serde(default)]
    fees: SponsorFeeStructure,
}

pub fn run_sponsor_fees(args: SponsorFeeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: SponsorFeeRequest = input::read_request(args.input.as_deref(), "sponsor-fees")?;
    let result = compute(
        &request.assumptions,
        &CompensationMode::SponsorFee(request.fees),
    )?;
    Ok(serde_json::to_value(result)?)
}
