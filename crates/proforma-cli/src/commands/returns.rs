use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use proforma_core::returns::metrics::{calculate_returns, ReturnsInput};

use crate::input;

/// Arguments for series returns
#[derive(Args)]
pub struct ReturnsArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Annual cash flows, initial investment first (e.g. "-100,30,30,130")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Discount rate for NPV as a decimal
    #[arg(long)]
    pub discount_rate: Option<Decimal>,
}

pub fn run_returns(args: ReturnsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let returns_input: ReturnsInput = match args.cash_flows {
        Some(cash_flows) if args.input.is_none() => ReturnsInput {
            cash_flows,
            discount_rate: args.discount_rate.unwrap_or(dec!(0.10)),
        },
        _ => input::read_request(args.input.as_deref(), "returns (or pass --cash-flows)")?,
    };

    let result = calculate_returns(&returns_input)?;
    Ok(serde_json::to_value(result)?)
}
