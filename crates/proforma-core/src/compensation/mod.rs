//! LP/GP allocation under one of two mutually exclusive compensation models.

pub mod sponsor_fees;
pub mod waterfall;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cash_flow::CashFlowProjection;
use crate::diagnostics::{div_or_zero, Diagnostics};
use crate::time_value::irr_outcome;
use crate::types::Money;

use self::sponsor_fees::{apply_sponsor_fees, FeeBases, SponsorFeeResult, SponsorFeeStructure};
use self::waterfall::{distribute, DistributionResult, EquityStructure};

/// How the sponsor is paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CompensationMode {
    Waterfall(EquityStructure),
    SponsorFee(SponsorFeeStructure),
}

/// Allocation output for the active mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Distribution {
    Waterfall(DistributionResult),
    SponsorFee(SponsorFeeResult),
}

impl Distribution {
    pub fn lp_total(&self) -> Money {
        match self {
            Distribution::Waterfall(r) => r.lp_total,
            Distribution::SponsorFee(r) => r.lp_total,
        }
    }

    pub fn gp_total(&self) -> Money {
        match self {
            Distribution::Waterfall(r) => r.gp_total,
            Distribution::SponsorFee(r) => r.gp_total,
        }
    }
}

/// Annual cash flow series per partner, year 0 first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartnerFlows {
    pub lp: Vec<Money>,
    pub gp: Vec<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub distribution: Distribution,
    pub partner_flows: PartnerFlows,
}

/// Positive cash flow after the initial investment.
pub fn distributable_cash(projection: &CashFlowProjection) -> Money {
    projection
        .years
        .iter()
        .skip(1)
        .map(|y| y.cash_flow)
        .filter(|cf| *cf > Decimal::ZERO)
        .sum()
}

/// Spread each year's project cash flow across partners: positive years in
/// proportion to overall distributions, negative years by capital share.
fn waterfall_partner_flows(projection: &CashFlowProjection, result: &DistributionResult) -> PartnerFlows {
    let lp_dist_share = div_or_zero(result.lp_total, result.total_distributed);
    let lp_capital_share = div_or_zero(result.lp_capital, result.lp_capital + result.gp_capital);

    let mut flows = PartnerFlows {
        lp: vec![-result.lp_capital],
        gp: vec![-result.gp_capital],
    };
    for row in projection.years.iter().skip(1) {
        let share = if row.cash_flow > Decimal::ZERO {
            lp_dist_share
        } else {
            lp_capital_share
        };
        let lp = row.cash_flow * share;
        flows.lp.push(lp);
        flows.gp.push(row.cash_flow - lp);
    }
    flows
}

/// Allocate a projection between partners under `mode`.
///
/// The waterfall leaves the projection unchanged. Sponsor fees are charged
/// into the projection's fee columns; year 0 is never altered.
pub fn allocate(
    mode: &CompensationMode,
    bases: &FeeBases,
    projection: &mut CashFlowProjection,
    diagnostics: &mut Diagnostics,
) -> Allocation {
    match mode {
        CompensationMode::Waterfall(structure) => {
            let project_irr = irr_outcome(&projection.cash_flows());
            let result = distribute(
                bases.equity,
                distributable_cash(projection),
                projection.hold_years(),
                structure,
                project_irr,
                diagnostics,
            );
            let partner_flows = waterfall_partner_flows(projection, &result);
            Allocation {
                distribution: Distribution::Waterfall(result),
                partner_flows,
            }
        }
        CompensationMode::SponsorFee(structure) => {
            let result = apply_sponsor_fees(structure, bases, projection, diagnostics);
            let lp = projection.cash_flows();
            let mut gp = vec![Decimal::ZERO];
            gp.extend(result.years.iter().map(|y| y.total_fees));
            Allocation {
                distribution: Distribution::SponsorFee(result),
                partner_flows: PartnerFlows { lp, gp },
            }
        }
    }
}
