//! Sensitivity, Monte Carlo and scenario analysis around a base case.

pub mod monte_carlo;
pub mod scenarios;
pub mod sensitivity;

use serde::{Deserialize, Serialize};

use crate::types::Rate;

/// Base-case figures every risk tool perturbs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskBase {
    pub base_irr: Rate,
    pub yield_on_cost: Rate,
    pub exit_cap_rate: Rate,
}
