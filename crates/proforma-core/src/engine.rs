//! End-to-end project analysis.
//!
//! Stages run in a fixed order: assumptions are checked, the cost budget
//! is built, financing is sized off the archetype's stabilised NOI, the
//! archetype strategy projects annual cash flows, the compensation mode
//! allocates them, and return metrics are computed from the result. Each
//! stage appends to one shared [`Diagnostics`] collector.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::{ProjectAssumptions, PropertyType};
use crate::cash_flow::for_sale::ForSaleSummary;
use crate::cash_flow::{strategy_for, CashFlowYear, ExitAnalysis, ProjectionContext};
use crate::compensation::sponsor_fees::FeeBases;
use crate::compensation::{allocate, CompensationMode, Distribution, PartnerFlows};
use crate::development::costs::{build_cost_breakdown, CostBreakdown};
use crate::development::financing::{size_financing, FinancingSummary};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ProformaError;
use crate::returns::metrics::{summarize_returns, ReturnsContext, ReturnsSummary};
use crate::types::{with_metadata, ComputationOutput};
use crate::ProformaResult;

#[cfg(feature = "risk")]
use crate::risk::{
    monte_carlo::{simulate_with_rng, MonteCarloConfig, MonteCarloSummary},
    scenarios::{default_scenarios, evaluate_scenarios, Scenario, ScenarioSummary},
    sensitivity::{sensitivity_table, SensitivityConfig, SensitivityTable},
    RiskBase,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Request body for a full analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInput {
    pub assumptions: ProjectAssumptions,
    pub compensation: CompensationMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAnalysis {
    pub property_type: PropertyType,
    pub costs: CostBreakdown,
    pub financing: FinancingSummary,
    /// Year 0 (equity outflow) through the final hold year, after fees
    pub cash_flows: Vec<CashFlowYear>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<ExitAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_sale: Option<ForSaleSummary>,
    pub distribution: Distribution,
    pub partner_flows: PartnerFlows,
    pub returns: ReturnsSummary,
    pub diagnostics: Vec<Diagnostic>,
}

// ---------------------------------------------------------------------------
// Project analysis
// ---------------------------------------------------------------------------

fn check_compensation(mode: &CompensationMode) -> ProformaResult<()> {
    if let CompensationMode::Waterfall(structure) = mode {
        if structure.tiers.is_empty() {
            return Err(ProformaError::InvalidInput {
                field: "compensation.tiers".into(),
                reason: "At least one waterfall tier is required".into(),
            });
        }
    }
    Ok(())
}

fn run(
    assumptions: &ProjectAssumptions,
    compensation: &CompensationMode,
    diagnostics: &mut Diagnostics,
) -> ProformaResult<(ProjectAnalysis, Vec<Decimal>)> {
    assumptions.validate_shape()?;
    check_compensation(compensation)?;
    assumptions.review(diagnostics);

    let costs = build_cost_breakdown(assumptions, diagnostics);

    let strategy = strategy_for(&assumptions.property);
    let stabilized_noi = strategy.stabilized_noi(assumptions);
    let financing = size_financing(assumptions, &costs, stabilized_noi, diagnostics)?;
    tracing::debug!(
        construction_loan = %financing.construction_loan,
        equity = %financing.required_equity,
        "financing sized"
    );

    let ctx = ProjectionContext {
        assumptions,
        costs: &costs,
        financing: &financing,
    };
    let mut projection = strategy.project(&ctx, diagnostics)?;
    let unallocated = projection.cash_flows();
    tracing::debug!(years = projection.hold_years(), "cash flows projected");

    let bases = FeeBases {
        equity: financing.required_equity,
        total_cost: costs.total_cost,
        hard_cost_with_contingency: costs.hard_cost_with_contingency,
        property_type: strategy.property_type(),
    };
    let allocation = allocate(compensation, &bases, &mut projection, diagnostics);
    tracing::debug!(
        lp_total = %allocation.distribution.lp_total(),
        gp_total = %allocation.distribution.gp_total(),
        "distributions allocated"
    );

    let returns = summarize_returns(
        &ReturnsContext {
            projection: &projection,
            partner_flows: Some(&allocation.partner_flows),
            equity: financing.required_equity,
            total_cost: costs.total_cost,
            exit_cap_rate: assumptions.operations.exit_cap_rate,
            discount_rate: assumptions.operations.discount_rate,
        },
        diagnostics,
    )?;

    let analysis = ProjectAnalysis {
        property_type: strategy.property_type(),
        costs,
        financing,
        cash_flows: projection.years,
        exit: projection.exit,
        for_sale: projection.for_sale,
        distribution: allocation.distribution,
        partner_flows: allocation.partner_flows,
        returns,
        diagnostics: diagnostics.clone().into_vec(),
    };
    Ok((analysis, unallocated))
}

/// Run the full pipeline for one project under one compensation mode.
pub fn compute(
    assumptions: &ProjectAssumptions,
    compensation: &CompensationMode,
) -> ProformaResult<ComputationOutput<ProjectAnalysis>> {
    let start = Instant::now();
    let mut diagnostics = Diagnostics::new();
    let (analysis, _) = run(assumptions, compensation, &mut diagnostics)?;

    let methodology = match compensation {
        CompensationMode::Waterfall(_) => "Development Pro Forma with LP/GP Promote Waterfall",
        CompensationMode::SponsorFee(_) => "Development Pro Forma with Sponsor Fee Compensation",
    };
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        methodology,
        &serde_json::json!({
            "project_name": assumptions.project_name,
            "property_type": analysis.property_type,
            "hold_period_years": assumptions.operations.hold_period_years,
            "discount_rate": assumptions.operations.discount_rate.to_string(),
        }),
        diagnostics.to_messages(),
        elapsed,
        analysis,
    ))
}

pub fn analyze_project(input: &ProjectInput) -> ProformaResult<ComputationOutput<ProjectAnalysis>> {
    compute(&input.assumptions, &input.compensation)
}

// ---------------------------------------------------------------------------
// Risk analysis
// ---------------------------------------------------------------------------

#[cfg(feature = "risk")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAnalysisInput {
    pub assumptions: ProjectAssumptions,
    #[serde(default)]
    pub sensitivity: SensitivityConfig,
    #[serde(default)]
    pub monte_carlo: MonteCarloConfig,
    #[serde(default = "default_scenarios")]
    pub scenarios: Vec<Scenario>,
}

#[cfg(feature = "risk")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub base: RiskBase,
    pub sensitivity: SensitivityTable,
    pub monte_carlo: MonteCarloSummary,
    pub scenarios: ScenarioSummary,
    pub diagnostics: Vec<Diagnostic>,
}

/// Risk tools around the unallocated project cash flows.
#[cfg(feature = "risk")]
pub fn analyze_risk(input: &RiskAnalysisInput) -> ProformaResult<ComputationOutput<RiskAnalysis>> {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let mut rng = match input.monte_carlo.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    analyze_risk_with_rng(input, &mut rng)
}

#[cfg(feature = "risk")]
pub fn analyze_risk_with_rng<R: rand::Rng>(
    input: &RiskAnalysisInput,
    rng: &mut R,
) -> ProformaResult<ComputationOutput<RiskAnalysis>> {
    use crate::compensation::sponsor_fees::SponsorFeeStructure;
    use crate::time_value::irr_outcome;

    let start = Instant::now();
    let mut diagnostics = Diagnostics::new();

    // A zero-fee sponsor mode leaves the projection untouched.
    let no_fees = CompensationMode::SponsorFee(SponsorFeeStructure::default());
    let (analysis, unallocated) = run(&input.assumptions, &no_fees, &mut diagnostics)?;

    let base_irr = match irr_outcome(&unallocated).rate() {
        Some(r) => r,
        None => {
            diagnostics.degenerate("risk.base_irr", "Base IRR is undefined; using 0");
            Decimal::ZERO
        }
    };
    let base = RiskBase {
        base_irr,
        yield_on_cost: analysis.returns.yield_on_cost,
        exit_cap_rate: input.assumptions.operations.exit_cap_rate,
    };
    tracing::debug!(base_irr = %base.base_irr, "risk base established");

    let sensitivity = sensitivity_table(base.base_irr, &input.sensitivity);
    let monte_carlo = simulate_with_rng(&base, &input.monte_carlo, rng)?;
    let scenarios = evaluate_scenarios(
        &input.scenarios,
        base.base_irr,
        &input.sensitivity,
        &mut diagnostics,
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Sensitivity, Monte Carlo and scenario analysis (approximations around base IRR)",
        &serde_json::json!({
            "project_name": input.assumptions.project_name,
            "iterations": input.monte_carlo.iterations,
            "seed": input.monte_carlo.seed,
            "num_scenarios": input.scenarios.len(),
        }),
        diagnostics.to_messages(),
        elapsed,
        RiskAnalysis {
            base,
            sensitivity,
            monte_carlo,
            scenarios,
            diagnostics: diagnostics.into_vec(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compensation::sponsor_fees::SponsorFeeStructure;
    use crate::compensation::waterfall::{EquityStructure, WaterfallTier};
    use crate::test_fixtures::{for_sale_assumptions, office_assumptions};
    use rust_decimal_macros::dec;

    fn waterfall() -> CompensationMode {
        CompensationMode::Waterfall(EquityStructure {
            lp_share: dec!(0.9),
            gp_share: dec!(0.1),
            preferred_return: dec!(0.08),
            gp_coinvest_pct: dec!(1),
            catch_up_enabled: true,
            catch_up_split: dec!(1),
            catch_up_target_promote: dec!(0.2),
            tiers: vec![WaterfallTier {
                min_irr: dec!(0),
                max_irr: dec!(1),
                lp_share: dec!(0.8),
                gp_share: dec!(0.2),
            }],
        })
    }

    #[test]
    fn test_office_pipeline() {
        let out = compute(&office_assumptions(), &waterfall()).unwrap();
        let a = &out.result;
        assert_eq!(a.property_type, PropertyType::Office);
        assert_eq!(a.cash_flows.len(), 11);
        assert_eq!(a.cash_flows[0].cash_flow, -a.financing.required_equity);
        assert!(a.exit.is_some());
        assert_eq!(a.partner_flows.lp.len(), a.cash_flows.len());
        assert_eq!(out.warnings.len(), a.diagnostics.len());
    }

    #[test]
    fn test_empty_tiers_rejected() {
        let mode = match waterfall() {
            CompensationMode::Waterfall(mut s) => {
                s.tiers.clear();
                CompensationMode::Waterfall(s)
            }
            other => other,
        };
        assert!(compute(&office_assumptions(), &mode).is_err());
    }

    #[test]
    fn test_zero_fee_mode_matches_unallocated_flows() {
        let mut diags = Diagnostics::new();
        let no_fees = CompensationMode::SponsorFee(SponsorFeeStructure::default());
        let (analysis, unallocated) = run(&office_assumptions(), &no_fees, &mut diags).unwrap();
        let allocated: Vec<Decimal> = analysis.cash_flows.iter().map(|y| y.cash_flow).collect();
        assert_eq!(allocated, unallocated);
    }

    #[test]
    fn test_for_sale_has_summary_and_no_exit() {
        let out = compute(&for_sale_assumptions(), &waterfall()).unwrap();
        assert!(out.result.for_sale.is_some());
        assert!(out.result.exit.is_none());
    }

    #[cfg(feature = "risk")]
    #[test]
    fn test_risk_seeded_determinism() {
        let input = RiskAnalysisInput {
            assumptions: office_assumptions(),
            sensitivity: SensitivityConfig::default(),
            monte_carlo: MonteCarloConfig {
                iterations: 1_000,
                seed: Some(11),
                ..Default::default()
            },
            scenarios: default_scenarios(),
        };
        let a = analyze_risk(&input).unwrap().result;
        let b = analyze_risk(&input).unwrap().result;
        assert_eq!(a.monte_carlo, b.monte_carlo);
        assert_eq!(a.sensitivity.rows.len(), 24);
        assert_eq!(a.scenarios.scenarios.len(), 3);
    }
}
