//! Single-variable IRR sensitivity.
//!
//! IRR deltas come from fixed per-variable coefficients applied to the base
//! IRR, not from re-running the projection for each perturbation. Values are
//! therefore directional estimates, cheap enough to tabulate for every step.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Bps, Rate};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityConfig {
    /// Symmetric percentage shocks for rent and construction cost
    #[serde(default = "default_percent_steps")]
    pub percent_steps: Vec<Rate>,
    /// Symmetric basis-point shocks for cap rate and interest rate
    #[serde(default = "default_bps_steps")]
    pub bps_steps: Vec<Bps>,
    #[serde(default = "default_rent_coefficient")]
    pub rent_coefficient: Decimal,
    #[serde(default = "default_construction_coefficient")]
    pub construction_coefficient: Decimal,
    #[serde(default = "default_cap_rate_coefficient")]
    pub cap_rate_coefficient: Decimal,
    #[serde(default = "default_interest_rate_coefficient")]
    pub interest_rate_coefficient: Decimal,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        SensitivityConfig {
            percent_steps: default_percent_steps(),
            bps_steps: default_bps_steps(),
            rent_coefficient: default_rent_coefficient(),
            construction_coefficient: default_construction_coefficient(),
            cap_rate_coefficient: default_cap_rate_coefficient(),
            interest_rate_coefficient: default_interest_rate_coefficient(),
        }
    }
}

fn default_percent_steps() -> Vec<Rate> {
    vec![dec!(0.05), dec!(0.10), dec!(0.15)]
}
fn default_bps_steps() -> Vec<Bps> {
    vec![dec!(25), dec!(50), dec!(75)]
}
fn default_rent_coefficient() -> Decimal {
    dec!(1.5)
}
fn default_construction_coefficient() -> Decimal {
    dec!(0.8)
}
fn default_cap_rate_coefficient() -> Decimal {
    dec!(0.02)
}
fn default_interest_rate_coefficient() -> Decimal {
    dec!(0.005)
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityVariable {
    Rent,
    ConstructionCost,
    ExitCapRate,
    InterestRate,
}

impl SensitivityVariable {
    /// Rent and cost shocks are percentages; rate shocks are basis points.
    pub fn is_rate(&self) -> bool {
        matches!(self, SensitivityVariable::ExitCapRate | SensitivityVariable::InterestRate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRow {
    pub variable: SensitivityVariable,
    /// Signed shock: a decimal for rent/cost, basis points for rates
    pub change: Decimal,
    pub irr: Rate,
    pub irr_delta: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityTable {
    pub base_irr: Rate,
    pub rows: Vec<SensitivityRow>,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Approximate IRR change for a single shock.
pub fn irr_delta(
    variable: SensitivityVariable,
    change: Decimal,
    base_irr: Rate,
    config: &SensitivityConfig,
) -> Rate {
    match variable {
        SensitivityVariable::Rent => base_irr * change * config.rent_coefficient,
        SensitivityVariable::ConstructionCost => -base_irr * change * config.construction_coefficient,
        SensitivityVariable::ExitCapRate => -change * config.cap_rate_coefficient / dec!(100),
        SensitivityVariable::InterestRate => -change * config.interest_rate_coefficient / dec!(100),
    }
}

/// Tabulate every variable at every configured step, downside first.
pub fn sensitivity_table(base_irr: Rate, config: &SensitivityConfig) -> SensitivityTable {
    let mut rows = Vec::new();
    for variable in [
        SensitivityVariable::Rent,
        SensitivityVariable::ConstructionCost,
        SensitivityVariable::ExitCapRate,
        SensitivityVariable::InterestRate,
    ] {
        let steps = if variable.is_rate() {
            &config.bps_steps
        } else {
            &config.percent_steps
        };
        let mut changes: Vec<Decimal> = steps.iter().map(|s| -s.abs()).collect();
        changes.reverse();
        changes.extend(steps.iter().map(|s| s.abs()));

        for change in changes {
            let delta = irr_delta(variable, change, base_irr, config);
            rows.push(SensitivityRow {
                variable,
                change,
                irr: base_irr + delta,
                irr_delta: delta,
            });
        }
    }
    SensitivityTable { base_irr, rows }
}
