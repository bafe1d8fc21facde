use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::cash_flow::CashFlowProjection;
use crate::compensation::PartnerFlows;
use crate::diagnostics::{div_or_zero, safe_div, Diagnostics};
use crate::error::ProformaError;
use crate::time_value::{irr_outcome, npv, IrrOutcome};
use crate::types::*;
use crate::ProformaResult;

/// Below this a lender covenant is likely to trip.
pub const MIN_DSCR: Decimal = dec!(1.20);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashOnCashYear {
    pub year: u32,
    #[serde(rename = "yield")]
    pub cash_yield: Rate,
}

/// Project and partner return metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsSummary {
    pub project_irr: IrrOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lp_irr: Option<IrrOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_irr: Option<IrrOutcome>,
    pub npv: Money,
    pub discount_rate: Rate,
    /// Positive distributions / initial equity
    pub equity_multiple: Multiple,
    pub initial_equity: Money,
    pub total_distributions: Money,
    pub cash_on_cash: Vec<CashOnCashYear>,
    pub average_cash_on_cash: Rate,
    /// First year operating distributions recover equity, else the hold period
    pub payback_year: u32,
    pub payback_reached: bool,
    /// Year-1 NOI / total cost
    pub yield_on_cost: Rate,
    pub exit_cap_rate: Rate,
    /// (yield on cost - exit cap) in basis points
    pub development_spread_bps: Bps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_dscr: Option<Decimal>,
}

/// Inputs from earlier stages needed to summarise returns.
#[derive(Debug, Clone, Copy)]
pub struct ReturnsContext<'a> {
    pub projection: &'a CashFlowProjection,
    pub partner_flows: Option<&'a PartnerFlows>,
    pub equity: Money,
    pub total_cost: Money,
    pub exit_cap_rate: Rate,
    pub discount_rate: Rate,
}

// ---------------------------------------------------------------------------
// Project returns
// ---------------------------------------------------------------------------

fn flag_undefined_irr(label: &str, outcome: IrrOutcome, diagnostics: &mut Diagnostics) {
    if !outcome.is_converged() {
        diagnostics.degenerate(label, format!("IRR is undefined: {outcome:?}"));
    }
}

pub fn summarize_returns(
    ctx: &ReturnsContext<'_>,
    diagnostics: &mut Diagnostics,
) -> ProformaResult<ReturnsSummary> {
    let projection = ctx.projection;
    let flows = projection.cash_flows();
    let equity = ctx.equity;

    let project_irr = irr_outcome(&flows);
    flag_undefined_irr("returns.project_irr", project_irr, diagnostics);
    let lp_irr = ctx.partner_flows.map(|pf| irr_outcome(&pf.lp));
    let gp_irr = ctx.partner_flows.map(|pf| irr_outcome(&pf.gp));

    let npv_value = npv(ctx.discount_rate, &flows)?;

    let operating_years = &projection.years[1.min(projection.years.len())..];
    let total_distributions: Money = operating_years
        .iter()
        .map(|y| y.cash_flow)
        .filter(|cf| *cf > Decimal::ZERO)
        .sum();
    let equity_multiple = div_or_zero(total_distributions, equity);

    let mut cash_on_cash = Vec::with_capacity(operating_years.len());
    let mut cumulative_operating = Decimal::ZERO;
    let mut payback = None;
    for row in operating_years {
        let operating = row.cash_flow - row.sale_proceeds + row.disposition_fee;
        cash_on_cash.push(CashOnCashYear {
            year: row.year,
            cash_yield: div_or_zero(operating, equity),
        });
        cumulative_operating += operating;
        if payback.is_none() && equity > Decimal::ZERO && cumulative_operating >= equity {
            payback = Some(row.year);
        }
    }
    let average_cash_on_cash = div_or_zero(
        cash_on_cash.iter().map(|c| c.cash_yield).sum(),
        Decimal::from(cash_on_cash.len()),
    );

    let year_one_noi = operating_years.first().map(|y| y.noi).unwrap_or(Decimal::ZERO);
    let yield_on_cost = safe_div(year_one_noi, ctx.total_cost, "returns.yield_on_cost", diagnostics);
    let development_spread_bps = (yield_on_cost - ctx.exit_cap_rate) * dec!(10000);
    if development_spread_bps < Decimal::ZERO {
        diagnostics.validation(
            "returns.development_spread",
            format!(
                "Negative development spread of {} bps; yield on cost is below the exit cap rate",
                development_spread_bps.round_dp(0)
            ),
        );
    }

    let min_dscr = operating_years.iter().filter_map(|y| y.dscr).min();
    if let Some(dscr) = min_dscr {
        if dscr < MIN_DSCR {
            diagnostics.validation(
                "returns.min_dscr",
                format!("Minimum DSCR of {:.2}x is below {MIN_DSCR}x", dscr),
            );
        }
    }

    Ok(ReturnsSummary {
        project_irr,
        lp_irr,
        gp_irr,
        npv: npv_value,
        discount_rate: ctx.discount_rate,
        equity_multiple,
        initial_equity: equity,
        total_distributions,
        cash_on_cash,
        average_cash_on_cash,
        payback_year: payback.unwrap_or_else(|| projection.hold_years()),
        payback_reached: payback.is_some(),
        yield_on_cost,
        exit_cap_rate: ctx.exit_cap_rate,
        development_spread_bps,
        min_dscr,
    })
}

// ---------------------------------------------------------------------------
// Arbitrary series
// ---------------------------------------------------------------------------

/// IRR / NPV over any annual series (index 0 = initial investment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsInput {
    pub cash_flows: Vec<Money>,
    #[serde(default = "default_discount_rate")]
    pub discount_rate: Rate,
}

fn default_discount_rate() -> Rate {
    dec!(0.10)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesReturns {
    pub irr: IrrOutcome,
    pub npv: Money,
    pub discount_rate: Rate,
    pub total_invested: Money,
    pub total_returned: Money,
    /// Total returned / total invested
    pub multiple: Multiple,
    /// First period the running total turns non-negative
    pub payback_period: Option<u32>,
}

pub fn calculate_returns(input: &ReturnsInput) -> ProformaResult<ComputationOutput<SeriesReturns>> {
    let start = Instant::now();
    if input.cash_flows.is_empty() {
        return Err(ProformaError::InsufficientData(
            "At least one cash flow is required".into(),
        ));
    }

    let mut diagnostics = Diagnostics::new();
    let irr = irr_outcome(&input.cash_flows);
    flag_undefined_irr("cash_flows", irr, &mut diagnostics);

    let total_invested: Money = input
        .cash_flows
        .iter()
        .filter(|cf| cf.is_sign_negative())
        .map(|cf| cf.abs())
        .sum();
    let total_returned: Money = input
        .cash_flows
        .iter()
        .filter(|cf| **cf > Decimal::ZERO)
        .sum();
    let multiple = safe_div(total_returned, total_invested, "total_invested", &mut diagnostics);

    let mut running = Decimal::ZERO;
    let mut payback_period = None;
    for (i, cf) in input.cash_flows.iter().enumerate() {
        running += *cf;
        if i > 0 && running >= Decimal::ZERO {
            payback_period = Some(i as u32);
            break;
        }
    }

    let result = SeriesReturns {
        irr,
        npv: npv(input.discount_rate, &input.cash_flows)?,
        discount_rate: input.discount_rate,
        total_invested,
        total_returned,
        multiple,
        payback_period,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "IRR (Newton-Raphson with bisection fallback) and NPV",
        input,
        diagnostics.to_messages(),
        elapsed,
        result,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cash_flow::CashFlowYear;

    fn projection(flows: &[(Money, Money, Money)]) -> CashFlowProjection {
        // (noi, debt service, sale proceeds) per operating year
        let mut years = vec![CashFlowYear::initial_investment(dec!(1000), None)];
        for (i, (noi, ds, sale)) in flows.iter().enumerate() {
            let mut row = CashFlowYear::empty(i as u32 + 1, None);
            row.noi = *noi;
            row.debt_service = *ds;
            row.dscr = if ds.is_zero() { None } else { Some(*noi / *ds) };
            row.sale_proceeds = *sale;
            row.settle();
            years.push(row);
        }
        let mut p = CashFlowProjection {
            years,
            exit: None,
            for_sale: None,
        };
        p.recompute_cumulative();
        p
    }

    fn ctx(p: &CashFlowProjection) -> ReturnsContext<'_> {
        ReturnsContext {
            projection: p,
            partner_flows: None,
            equity: dec!(1000),
            total_cost: dec!(2000),
            exit_cap_rate: dec!(0.06),
            discount_rate: dec!(0.10),
        }
    }

    #[test]
    fn test_cash_on_cash_excludes_sale() {
        let p = projection(&[
            (dec!(200), dec!(100), dec!(0)),
            (dec!(200), dec!(100), dec!(1500)),
        ]);
        let mut diags = Diagnostics::new();
        let r = summarize_returns(&ctx(&p), &mut diags).unwrap();
        assert_eq!(r.cash_on_cash[0].cash_yield, dec!(0.1));
        assert_eq!(r.cash_on_cash[1].cash_yield, dec!(0.1));
        assert_eq!(r.average_cash_on_cash, dec!(0.1));
        assert_eq!(r.total_distributions, dec!(1700));
        assert_eq!(r.equity_multiple, dec!(1.7));
        // operating distributions never recover equity
        assert!(!r.payback_reached);
        assert_eq!(r.payback_year, 2);
    }

    #[test]
    fn test_payback_reached() {
        let p = projection(&[
            (dec!(600), dec!(0), dec!(0)),
            (dec!(600), dec!(0), dec!(0)),
            (dec!(600), dec!(0), dec!(0)),
        ]);
        let mut diags = Diagnostics::new();
        let r = summarize_returns(&ctx(&p), &mut diags).unwrap();
        assert!(r.payback_reached);
        assert_eq!(r.payback_year, 2);
    }

    #[test]
    fn test_yield_on_cost_and_spread() {
        let p = projection(&[(dec!(160), dec!(0), dec!(0))]);
        let mut diags = Diagnostics::new();
        let r = summarize_returns(&ctx(&p), &mut diags).unwrap();
        assert_eq!(r.yield_on_cost, dec!(0.08));
        assert_eq!(r.development_spread_bps, dec!(200));
        assert!(!diags.mentions("returns.development_spread"));
    }

    #[test]
    fn test_negative_spread_and_low_dscr_warn() {
        let p = projection(&[(dec!(100), dec!(90), dec!(2000))]);
        let mut diags = Diagnostics::new();
        let r = summarize_returns(&ctx(&p), &mut diags).unwrap();
        assert!(r.development_spread_bps < Decimal::ZERO);
        assert!(diags.mentions("returns.development_spread"));
        assert!(diags.mentions("returns.min_dscr"));
    }

    #[test]
    fn test_zero_equity_multiple_is_zero() {
        let p = projection(&[(dec!(100), dec!(0), dec!(0))]);
        let mut c = ctx(&p);
        c.equity = Decimal::ZERO;
        let mut diags = Diagnostics::new();
        let r = summarize_returns(&c, &mut diags).unwrap();
        assert_eq!(r.equity_multiple, Decimal::ZERO);
    }

    #[test]
    fn test_series_all_negative_is_total_loss() {
        let input = ReturnsInput {
            cash_flows: vec![dec!(-100), dec!(-10), dec!(-5)],
            discount_rate: dec!(0.1),
        };
        let out = calculate_returns(&input).unwrap();
        assert_eq!(out.result.irr, IrrOutcome::TotalLoss);
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn test_series_single_entry_is_insufficient() {
        let input = ReturnsInput {
            cash_flows: vec![dec!(-100)],
            discount_rate: dec!(0.1),
        };
        let out = calculate_returns(&input).unwrap();
        assert_eq!(out.result.irr, IrrOutcome::InsufficientData);
    }

    #[test]
    fn test_series_multiple_and_payback() {
        let input = ReturnsInput {
            cash_flows: vec![dec!(-100), dec!(40), dec!(40), dec!(40)],
            discount_rate: dec!(0.1),
        };
        let out = calculate_returns(&input).unwrap();
        assert_eq!(out.result.multiple, dec!(1.2));
        assert_eq!(out.result.payback_period, Some(3));
        assert!(out.result.irr.is_converged());
    }
}
