use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::{ProjectAssumptions, SiteWork, SoftCostBasis};
use crate::diagnostics::{clamp_non_negative, safe_div, Diagnostics};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::ProformaResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Development budget, bottom-up from land to developer fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub land_cost: Money,
    /// Building hard cost (hard cost/SF x building area)
    pub building_hard_cost: Money,
    pub tenant_improvements: Money,
    pub site_work: Money,
    /// Building + TI + site work, before contingency
    pub hard_cost: Money,
    pub contingency: Money,
    pub hard_cost_with_contingency: Money,
    pub soft_costs: Vec<SoftCostLine>,
    pub soft_cost_total: Money,
    /// Developer fee on land + hard (incl. contingency) + soft
    pub developer_fee: Money,
    pub total_cost: Money,
    pub cost_per_sf: Money,
    /// Present only for unit-based archetypes
    pub cost_per_unit: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftCostLine {
    pub name: String,
    pub amount: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the cost budget, recording any degenerate or clamped inputs.
pub fn build_cost_breakdown(
    assumptions: &ProjectAssumptions,
    diagnostics: &mut Diagnostics,
) -> CostBreakdown {
    let costs = &assumptions.costs;
    let property = &assumptions.property;

    let gfa = clamp_non_negative(
        property.building_area_sf(),
        "property.building_area_sf",
        diagnostics,
    );
    let rentable = property.rentable_area_sf();

    let land_cost = clamp_non_negative(costs.land_cost, "costs.land_cost", diagnostics);
    let hard_psf = clamp_non_negative(costs.hard_cost_psf, "costs.hard_cost_psf", diagnostics);
    let building_hard_cost = hard_psf * gfa;

    let tenant_improvements = if property.carries_tenant_improvements() {
        clamp_non_negative(
            costs.tenant_improvements_psf,
            "costs.tenant_improvements_psf",
            diagnostics,
        ) * rentable
    } else {
        Decimal::ZERO
    };

    let site_work = match (&costs.site_work, property.unit_count()) {
        (SiteWork::Total { amount }, _) => {
            clamp_non_negative(*amount, "costs.site_work", diagnostics)
        }
        (SiteWork::PerUnit { amount_per_unit }, Some(units)) => {
            if units == 0 {
                diagnostics.degenerate(
                    "costs.site_work",
                    "Per-unit site work with zero units; site work is 0",
                );
            }
            clamp_non_negative(*amount_per_unit, "costs.site_work", diagnostics)
                * Decimal::from(units)
        }
        (SiteWork::PerUnit { .. }, None) => {
            diagnostics.validation(
                "costs.site_work",
                format!(
                    "Per-unit site work is not valid for {:?} projects; site work is 0",
                    property.property_type()
                ),
            );
            Decimal::ZERO
        }
    };

    let hard_cost = building_hard_cost + tenant_improvements + site_work;
    let contingency_pct = clamp_non_negative(
        costs.contingency_pct,
        "costs.contingency_pct",
        diagnostics,
    );
    let contingency = hard_cost * contingency_pct;
    let hard_cost_with_contingency = hard_cost + contingency;

    let soft_costs: Vec<SoftCostLine> = costs
        .soft_costs
        .iter()
        .map(|item| {
            let raw = match item.basis {
                SoftCostBasis::PercentOfHardCost { rate } => hard_cost_with_contingency * rate,
                SoftCostBasis::PerSquareFoot { amount } => amount * gfa,
                SoftCostBasis::Flat { amount } => amount,
            };
            SoftCostLine {
                name: item.name.clone(),
                amount: clamp_non_negative(raw, "costs.soft_costs", diagnostics),
            }
        })
        .collect();
    let soft_cost_total: Money = soft_costs.iter().map(|l| l.amount).sum();

    let fee_base = land_cost + hard_cost_with_contingency + soft_cost_total;
    let developer_fee = clamp_non_negative(
        fee_base * costs.developer_fee_pct,
        "costs.developer_fee_pct",
        diagnostics,
    );

    let total_cost = land_cost + hard_cost_with_contingency + soft_cost_total + developer_fee;

    let cost_per_sf = safe_div(total_cost, gfa, "costs.cost_per_sf", diagnostics);
    let cost_per_unit = property
        .unit_count()
        .map(|units| safe_div(total_cost, Decimal::from(units), "costs.cost_per_unit", diagnostics));

    tracing::debug!(%total_cost, %hard_cost_with_contingency, %soft_cost_total, "cost budget built");

    CostBreakdown {
        land_cost,
        building_hard_cost,
        tenant_improvements,
        site_work,
        hard_cost,
        contingency,
        hard_cost_with_contingency,
        soft_costs,
        soft_cost_total,
        developer_fee,
        total_cost,
        cost_per_sf,
        cost_per_unit,
    }
}

/// Standalone development budget for a project.
pub fn calculate_costs(
    assumptions: &ProjectAssumptions,
) -> ProformaResult<ComputationOutput<CostBreakdown>> {
    let start = Instant::now();
    assumptions.validate_shape()?;

    let mut diagnostics = Diagnostics::new();
    assumptions.review(&mut diagnostics);
    let breakdown = build_cost_breakdown(assumptions, &mut diagnostics);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Development Budget (hard + contingency + soft + developer fee)",
        &assumptions.costs,
        diagnostics.to_messages(),
        elapsed,
        breakdown,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
