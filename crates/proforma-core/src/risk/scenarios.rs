use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{div_or_zero, Diagnostics};
use crate::risk::sensitivity::{irr_delta, SensitivityConfig, SensitivityVariable};
use crate::types::{Bps, Rate};

/// A discrete what-if case layered on the base IRR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub rent_change: Rate,
    #[serde(default)]
    pub cost_change: Rate,
    #[serde(default)]
    pub cap_rate_change_bps: Bps,
    pub probability: Rate,
}

pub fn default_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "Downside".into(),
            rent_change: dec!(-0.10),
            cost_change: dec!(0.10),
            cap_rate_change_bps: dec!(50),
            probability: dec!(0.25),
        },
        Scenario {
            name: "Base".into(),
            rent_change: Decimal::ZERO,
            cost_change: Decimal::ZERO,
            cap_rate_change_bps: Decimal::ZERO,
            probability: dec!(0.50),
        },
        Scenario {
            name: "Upside".into(),
            rent_change: dec!(0.10),
            cost_change: dec!(-0.05),
            cap_rate_change_bps: dec!(-25),
            probability: dec!(0.25),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub irr: Rate,
    pub probability: Rate,
    pub weighted_irr: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub scenarios: Vec<ScenarioResult>,
    pub probability_weighted_irr: Rate,
    /// Sum of the probabilities as supplied, before normalisation
    pub total_probability: Rate,
}

/// IRR for one scenario: base IRR plus the rent, cost and cap-rate deltas.
pub fn scenario_irr(scenario: &Scenario, base_irr: Rate, config: &SensitivityConfig) -> Rate {
    base_irr
        + irr_delta(SensitivityVariable::Rent, scenario.rent_change, base_irr, config)
        + irr_delta(
            SensitivityVariable::ConstructionCost,
            scenario.cost_change,
            base_irr,
            config,
        )
        + irr_delta(
            SensitivityVariable::ExitCapRate,
            scenario.cap_rate_change_bps,
            base_irr,
            config,
        )
}

/// Evaluate every scenario and weight by probability.
///
/// Negative probabilities are floored at zero. If the remainder does not sum
/// to one it is normalised; when it sums to zero the scenarios are weighted
/// equally.
pub fn evaluate_scenarios(
    scenarios: &[Scenario],
    base_irr: Rate,
    config: &SensitivityConfig,
    diagnostics: &mut Diagnostics,
) -> ScenarioSummary {
    if scenarios.is_empty() {
        return ScenarioSummary {
            scenarios: Vec::new(),
            probability_weighted_irr: base_irr,
            total_probability: Decimal::ZERO,
        };
    }

    let mut probabilities: Vec<Rate> = Vec::with_capacity(scenarios.len());
    for s in scenarios {
        if s.probability < Decimal::ZERO {
            diagnostics.validation(
                "scenarios.probability",
                format!("Scenario '{}' has negative probability; treated as 0", s.name),
            );
            probabilities.push(Decimal::ZERO);
        } else {
            probabilities.push(s.probability);
        }
    }

    let total: Rate = probabilities.iter().copied().sum();
    if total.is_zero() {
        diagnostics.validation(
            "scenarios.probability",
            "Scenario probabilities sum to 0; weighting scenarios equally",
        );
        let equal = Decimal::ONE / Decimal::from(scenarios.len() as u64);
        probabilities.iter_mut().for_each(|p| *p = equal);
    } else if (total - Decimal::ONE).abs() > dec!(0.000001) {
        diagnostics.validation(
            "scenarios.probability",
            format!("Scenario probabilities sum to {total}; normalised to 1"),
        );
        probabilities.iter_mut().for_each(|p| *p = div_or_zero(*p, total));
    }

    let results: Vec<ScenarioResult> = scenarios
        .iter()
        .zip(probabilities)
        .map(|(s, probability)| {
            let irr = scenario_irr(s, base_irr, config);
            ScenarioResult {
                name: s.name.clone(),
                irr,
                probability,
                weighted_irr: irr * probability,
            }
        })
        .collect();

    let probability_weighted_irr = results.iter().map(|r| r.weighted_irr).sum();
    ScenarioSummary {
        scenarios: results,
        probability_weighted_irr,
        total_probability: total,
    }
}
