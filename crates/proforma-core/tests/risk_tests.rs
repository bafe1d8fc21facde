#![cfg(feature = "risk")]

use proforma_core::assumptions::ProjectAssumptions;
use proforma_core::engine::{analyze_risk, analyze_risk_with_rng, RiskAnalysisInput};
use proforma_core::risk::monte_carlo::{simulate, MonteCarloConfig};
use proforma_core::risk::scenarios::default_scenarios;
use proforma_core::risk::sensitivity::{SensitivityConfig, SensitivityVariable};
use proforma_core::risk::RiskBase;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal_macros::dec;
use serde_json::json;

fn apartments() -> ProjectAssumptions {
    serde_json::from_value(json!({
        "project_name": "Maple Flats",
        "property": {
            "type": "apartment",
            "building_gfa_sf": "120000",
            "unit_mix": [
                { "name": "1BR", "count": 80, "avg_sf": "700", "monthly_rent": "1800" },
                { "name": "2BR", "count": 40, "avg_sf": "1000", "monthly_rent": "2500" }
            ],
            "other_income_per_unit_monthly": "50",
            "opex_per_unit": "7000"
        },
        "costs": {
            "land_cost": "4000000",
            "hard_cost_psf": "180",
            "site_work": { "basis": "per_unit", "amount_per_unit": "10000" },
            "developer_fee_pct": "0.03"
        },
        "financing": {
            "construction_ltc": "0.65",
            "construction_rate": "0.07",
            "permanent_ltv": "0.65",
            "permanent_rate": "0.06"
        },
        "operations": {
            "hold_period_years": 7,
            "market_cap_rate": "0.05",
            "exit_cap_rate": "0.055"
        }
    }))
    .unwrap()
}

fn risk_input(seed: u64) -> RiskAnalysisInput {
    RiskAnalysisInput {
        assumptions: apartments(),
        sensitivity: SensitivityConfig::default(),
        monte_carlo: MonteCarloConfig {
            iterations: 2_000,
            seed: Some(seed),
            ..Default::default()
        },
        scenarios: default_scenarios(),
    }
}

#[test]
fn test_seeded_risk_analysis_is_reproducible() {
    let a = analyze_risk(&risk_input(2024)).unwrap().result;
    let b = analyze_risk(&risk_input(2024)).unwrap().result;
    assert_eq!(a.base, b.base);
    assert_eq!(a.monte_carlo, b.monte_carlo);
    assert_eq!(a.sensitivity.rows, b.sensitivity.rows);
}

#[test]
fn test_injected_rng_matches_config_seed() {
    let input = risk_input(5);
    let mut rng = StdRng::seed_from_u64(5);
    let injected = analyze_risk_with_rng(&input, &mut rng).unwrap().result;
    let seeded = analyze_risk(&input).unwrap().result;
    assert_eq!(injected.monte_carlo, seeded.monte_carlo);
}

#[test]
fn test_sensitivity_directions() {
    let r = analyze_risk(&risk_input(1)).unwrap().result;
    for row in &r.sensitivity.rows {
        let up = row.change > dec!(0);
        match row.variable {
            SensitivityVariable::Rent if r.base.base_irr > dec!(0) => {
                assert_eq!(row.irr_delta > dec!(0), up)
            }
            SensitivityVariable::ExitCapRate | SensitivityVariable::InterestRate => {
                assert_eq!(row.irr_delta < dec!(0), up)
            }
            _ => {}
        }
    }
}

#[test]
fn test_scenario_weights_sum_to_one() {
    let r = analyze_risk(&risk_input(1)).unwrap().result;
    let total: rust_decimal::Decimal = r.scenarios.scenarios.iter().map(|s| s.probability).sum();
    assert_eq!(total, dec!(1));
    let weighted: rust_decimal::Decimal = r.scenarios.scenarios.iter().map(|s| s.weighted_irr).sum();
    assert_eq!(weighted, r.scenarios.probability_weighted_irr);
}

#[test]
fn test_monte_carlo_rejects_too_many_iterations() {
    let base = RiskBase {
        base_irr: dec!(0.12),
        yield_on_cost: dec!(0.065),
        exit_cap_rate: dec!(0.055),
    };
    let config = MonteCarloConfig {
        iterations: 1_000_001,
        seed: Some(1),
        ..Default::default()
    };
    assert!(simulate(&base, &config).is_err());
}
