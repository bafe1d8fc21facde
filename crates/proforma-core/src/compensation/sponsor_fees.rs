use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::assumptions::PropertyType;
use crate::cash_flow::CashFlowProjection;
use crate::diagnostics::{div_or_zero, Diagnostics};
use crate::time_value::{irr_outcome, IrrOutcome};
use crate::types::{Bps, Money, Rate};

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Fee-based sponsor compensation. All rates are decimals of their base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SponsorFeeStructure {
    /// On total development cost
    #[serde(default)]
    pub acquisition_fee_pct: Rate,
    /// On total development cost
    #[serde(default)]
    pub development_fee_pct: Rate,
    /// On hard cost including contingency
    #[serde(default)]
    pub construction_management_fee_pct: Rate,
    /// On gross exit value (for-sale: gross collections)
    #[serde(default)]
    pub disposition_fee_pct: Rate,
    /// On effective gross revenue
    #[serde(default)]
    pub asset_management_fee_pct: Rate,
    /// On effective gross revenue
    #[serde(default)]
    pub property_management_fee_pct: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_hurdle: Option<PerformanceHurdle>,
    #[serde(default)]
    pub one_time_fee_timing: FeeTiming,
    /// Maximum fees in any year, as a share of equity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_cap_pct_of_equity: Option<Rate>,
    /// Maximum fees over the hold, as a share of equity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime_cap_pct_of_equity: Option<Rate>,
}

/// Ongoing fees drop to `reduced_fee_pct` of the normal rate while the
/// trailing cash yield is below `hurdle_rate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceHurdle {
    pub hurdle_rate: Rate,
    pub reduced_fee_pct: Rate,
}

/// When one-time fees are paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeTiming {
    /// All in year 1
    #[default]
    Upfront,
    /// All in the final year
    Deferred,
    /// Evenly across the hold
    Amortized,
}

/// Bases the one-time fees are charged on, fixed at closing.
#[derive(Debug, Clone, Copy)]
pub struct FeeBases {
    pub equity: Money,
    pub total_cost: Money,
    pub hard_cost_with_contingency: Money,
    pub property_type: PropertyType,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneTimeFees {
    pub acquisition: Money,
    pub development: Money,
    pub construction_management: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeYear {
    pub year: u32,
    pub one_time_fees: Money,
    pub ongoing_fees: Money,
    /// Trailing yield was below the hurdle; ongoing fees were reduced
    pub hurdle_reduced: bool,
    pub disposition_fee: Money,
    /// Amount removed by annual or lifetime caps
    pub cap_reduction: Money,
    pub total_fees: Money,
}

/// IRR comparison between fee-based and promote-equivalent compensation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeDrag {
    /// IRR of the cash flows before any sponsor fee
    pub gross_irr: IrrOutcome,
    /// IRR to the LP after fees
    pub net_irr: IrrOutcome,
    /// IRR if the same fee total were taken from the final distribution
    pub promote_equivalent_irr: IrrOutcome,
    /// (gross - net) in basis points
    pub fee_drag_bps: Option<Bps>,
    /// (promote equivalent - net) in basis points: the cost of paying fees early
    pub timing_drag_bps: Option<Bps>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorFeeResult {
    pub one_time: OneTimeFees,
    pub years: Vec<FeeYear>,
    pub total_one_time: Money,
    pub total_ongoing: Money,
    pub total_disposition: Money,
    pub total_fees: Money,
    /// Positive net cash flow to the LP after fees
    pub lp_total: Money,
    pub gp_total: Money,
    pub fee_drag: FeeDrag,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

fn one_time_fees(structure: &SponsorFeeStructure, bases: &FeeBases) -> OneTimeFees {
    let acquisition = bases.total_cost * structure.acquisition_fee_pct;
    let development = bases.total_cost * structure.development_fee_pct;
    let construction_management =
        bases.hard_cost_with_contingency * structure.construction_management_fee_pct;
    OneTimeFees {
        acquisition,
        development,
        construction_management,
        total: acquisition + development + construction_management,
    }
}

/// One-time fee paid in `year` under the timing rule.
fn scheduled_one_time(total: Money, timing: FeeTiming, year: u32, hold: u32) -> Money {
    match timing {
        FeeTiming::Upfront if year == 1 => total,
        FeeTiming::Deferred if year == hold => total,
        FeeTiming::Amortized => {
            let slice = div_or_zero(total, Decimal::from(hold)).round_dp(2);
            if year == hold {
                total - slice * Decimal::from(hold - 1)
            } else {
                slice
            }
        }
        _ => Decimal::ZERO,
    }
}

fn bps_difference(a: IrrOutcome, b: IrrOutcome) -> Option<Bps> {
    match (a.rate(), b.rate()) {
        (Some(x), Some(y)) => Some((x - y) * dec!(10000)),
        _ => None,
    }
}

/// Scale fee components down to `allowed`, truncating each to cents and
/// giving the leftover to the largest component so the parts sum exactly.
fn scale_to_cap(parts: [Money; 3], allowed: Money) -> [Money; 3] {
    let uncapped: Money = parts.iter().sum();
    let factor = div_or_zero(allowed, uncapped);
    let mut scaled = parts.map(|p| (p * factor).round_dp_with_strategy(2, RoundingStrategy::ToZero));
    let leftover = allowed - scaled.iter().sum::<Money>();
    let largest = (0..parts.len())
        .reduce(|best, i| if parts[i] > parts[best] { i } else { best })
        .unwrap_or(0);
    scaled[largest] += leftover;
    scaled
}

/// Charge sponsor fees against the projection in place.
///
/// Year 0 is never touched. Each operating year's `sponsor_fees` and
/// `disposition_fee` columns are filled and the derived columns re-settled.
pub fn apply_sponsor_fees(
    structure: &SponsorFeeStructure,
    bases: &FeeBases,
    projection: &mut CashFlowProjection,
    diagnostics: &mut Diagnostics,
) -> SponsorFeeResult {
    let hold = projection.hold_years();
    let gross_flows = projection.cash_flows();
    let one_time = one_time_fees(structure, bases);
    let ongoing_rate =
        structure.asset_management_fee_pct + structure.property_management_fee_pct;
    let gross_exit_value = projection
        .exit
        .as_ref()
        .map(|e| e.gross_exit_value)
        .unwrap_or(Decimal::ZERO);
    let is_for_sale = bases.property_type == PropertyType::ForSale;

    let annual_cap = structure.annual_cap_pct_of_equity.map(|p| bases.equity * p);
    let mut lifetime_allowance = structure
        .lifetime_cap_pct_of_equity
        .map(|p| bases.equity * p);

    let mut fee_years = Vec::with_capacity(hold as usize);
    let mut prior_pre_fee_cash = None;

    for row in projection.years.iter_mut().skip(1) {
        let year = row.year;
        let pre_fee_cash = row.noi - row.debt_service;

        let mut one_time_fee = scheduled_one_time(one_time.total, structure.one_time_fee_timing, year, hold);
        let mut ongoing = row.effective_gross_revenue * ongoing_rate;

        let mut hurdle_reduced = false;
        if let Some(hurdle) = &structure.performance_hurdle {
            let trailing_cash = prior_pre_fee_cash.unwrap_or(pre_fee_cash);
            let trailing_yield = div_or_zero(trailing_cash, bases.equity);
            if trailing_yield < hurdle.hurdle_rate {
                ongoing *= hurdle.reduced_fee_pct;
                hurdle_reduced = true;
            }
        }
        prior_pre_fee_cash = Some(pre_fee_cash);

        let mut disposition = if is_for_sale {
            row.gross_revenue * structure.disposition_fee_pct
        } else if year == hold {
            gross_exit_value * structure.disposition_fee_pct
        } else {
            Decimal::ZERO
        };

        let uncapped = one_time_fee + ongoing + disposition;
        let mut allowed = uncapped;
        if let Some(cap) = annual_cap {
            allowed = allowed.min(cap.max(Decimal::ZERO));
        }
        if let Some(remaining) = lifetime_allowance {
            allowed = allowed.min(remaining.max(Decimal::ZERO));
        }
        let cap_reduction = uncapped - allowed;
        if cap_reduction > Decimal::ZERO {
            [one_time_fee, ongoing, disposition] =
                scale_to_cap([one_time_fee, ongoing, disposition], allowed);
        }
        if let Some(remaining) = lifetime_allowance.as_mut() {
            *remaining -= allowed;
        }

        row.sponsor_fees = one_time_fee + ongoing;
        row.disposition_fee = disposition;
        row.settle();

        fee_years.push(FeeYear {
            year,
            one_time_fees: one_time_fee,
            ongoing_fees: ongoing,
            hurdle_reduced,
            disposition_fee: disposition,
            cap_reduction,
            total_fees: allowed,
        });
    }
    projection.recompute_cumulative();

    if fee_years.iter().any(|y| y.cap_reduction > Decimal::ZERO) {
        let capped: Money = fee_years.iter().map(|y| y.cap_reduction).sum();
        diagnostics.validation(
            "sponsor_fees.caps",
            format!("Fee caps reduced sponsor fees by {capped}"),
        );
    }

    let total_one_time: Money = fee_years.iter().map(|y| y.one_time_fees).sum();
    let total_ongoing: Money = fee_years.iter().map(|y| y.ongoing_fees).sum();
    let total_disposition: Money = fee_years.iter().map(|y| y.disposition_fee).sum();
    let total_fees = total_one_time + total_ongoing + total_disposition;

    let net_flows = projection.cash_flows();
    let mut promote_flows = gross_flows.clone();
    if let Some(last) = promote_flows.last_mut() {
        if hold > 0 {
            *last -= total_fees;
        }
    }

    let gross_irr = irr_outcome(&gross_flows);
    let net_irr = irr_outcome(&net_flows);
    let promote_equivalent_irr = irr_outcome(&promote_flows);

    let lp_total: Money = net_flows
        .iter()
        .skip(1)
        .filter(|cf| **cf > Decimal::ZERO)
        .sum();

    tracing::debug!(%total_fees, ?net_irr, "sponsor fees applied");

    SponsorFeeResult {
        one_time,
        years: fee_years,
        total_one_time,
        total_ongoing,
        total_disposition,
        total_fees,
        lp_total,
        gp_total: total_fees,
        fee_drag: FeeDrag {
            gross_irr,
            net_irr,
            promote_equivalent_irr,
            fee_drag_bps: bps_difference(gross_irr, net_irr),
            timing_drag_bps: bps_difference(promote_equivalent_irr, net_irr),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cash_flow::CashFlowYear;
    use pretty_assertions::assert_eq;

    fn projection(hold: u32) -> CashFlowProjection {
        let mut years = vec![CashFlowYear::initial_investment(dec!(1000000), None)];
        for year in 1..=hold {
            let mut row = CashFlowYear::empty(year, None);
            row.gross_revenue = dec!(200000);
            row.effective_gross_revenue = dec!(200000);
            row.operating_expenses = dec!(80000);
            row.noi = dec!(120000);
            if year == hold {
                row.sale_proceeds = dec!(1500000);
            }
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

    fn bases() -> FeeBases {
        FeeBases {
            equity: dec!(1000000),
            total_cost: dec!(3000000),
            hard_cost_with_contingency: dec!(2000000),
            property_type: PropertyType::Office,
        }
    }

    fn structure() -> SponsorFeeStructure {
        SponsorFeeStructure {
            acquisition_fee_pct: dec!(0.01),
            development_fee_pct: dec!(0.02),
            construction_management_fee_pct: dec!(0.01),
            asset_management_fee_pct: dec!(0.02),
            property_management_fee_pct: dec!(0.03),
            ..Default::default()
        }
    }

    #[test]
    fn test_upfront_fees_in_year_one() {
        let mut p = projection(5);
        let mut diags = Diagnostics::new();
        let r = apply_sponsor_fees(&structure(), &bases(), &mut p, &mut diags);
        // 1% + 2% of 3M, 1% of 2M
        assert_eq!(r.one_time.total, dec!(110000));
        assert_eq!(r.years[0].one_time_fees, dec!(110000));
        assert_eq!(r.years[1].one_time_fees, dec!(0));
        // 5% of 200k EGR
        assert_eq!(r.years[0].ongoing_fees, dec!(10000));
        assert_eq!(p.years[1].sponsor_fees, dec!(120000));
        assert_eq!(p.years[1].cash_flow, dec!(0));
    }

    #[test]
    fn test_year_zero_untouched() {
        let mut p = projection(5);
        let before = p.years[0].clone();
        let mut diags = Diagnostics::new();
        apply_sponsor_fees(&structure(), &bases(), &mut p, &mut diags);
        assert_eq!(p.years[0], before);
    }

    #[test]
    fn test_amortized_timing_sums_to_total() {
        let mut s = structure();
        s.one_time_fee_timing = FeeTiming::Amortized;
        let mut p = projection(3);
        let mut diags = Diagnostics::new();
        let r = apply_sponsor_fees(&s, &bases(), &mut p, &mut diags);
        assert_eq!(r.total_one_time, dec!(110000));
        assert_eq!(r.years[0].one_time_fees, dec!(36666.67));
        assert_eq!(r.years[2].one_time_fees, dec!(36666.66));
    }

    #[test]
    fn test_deferred_timing() {
        let mut s = structure();
        s.one_time_fee_timing = FeeTiming::Deferred;
        let mut p = projection(4);
        let mut diags = Diagnostics::new();
        let r = apply_sponsor_fees(&s, &bases(), &mut p, &mut diags);
        assert_eq!(r.years[0].one_time_fees, dec!(0));
        assert_eq!(r.years[3].one_time_fees, dec!(110000));
    }

    #[test]
    fn test_hurdle_reduces_ongoing_fees() {
        let mut s = structure();
        s.performance_hurdle = Some(PerformanceHurdle {
            hurdle_rate: dec!(0.15),
            reduced_fee_pct: dec!(0.5),
        });
        let mut p = projection(3);
        let mut diags = Diagnostics::new();
        let r = apply_sponsor_fees(&s, &bases(), &mut p, &mut diags);
        // 120k / 1M = 12% < 15%
        assert!(r.years.iter().all(|y| y.hurdle_reduced));
        assert_eq!(r.years[1].ongoing_fees, dec!(5000));
    }

    #[test]
    fn test_annual_cap_scales_fees() {
        let mut s = structure();
        s.annual_cap_pct_of_equity = Some(dec!(0.05));
        let mut p = projection(3);
        let mut diags = Diagnostics::new();
        let r = apply_sponsor_fees(&s, &bases(), &mut p, &mut diags);
        assert_eq!(r.years[0].total_fees, dec!(50000));
        assert_eq!(r.years[0].cap_reduction, dec!(70000));
        assert_eq!(
            r.years[0].one_time_fees + r.years[0].ongoing_fees + r.years[0].disposition_fee,
            dec!(50000)
        );
        assert!(diags.mentions("sponsor_fees.caps"));
    }

    #[test]
    fn test_capped_components_never_exceed_allowance() {
        // 0.515 each would round half-even to 0.52 and overshoot by a cent
        let parts = scale_to_cap([dec!(1), dec!(1), dec!(0)], dec!(1.03));
        assert_eq!(parts, [dec!(0.52), dec!(0.51), dec!(0)]);
        assert_eq!(parts.iter().sum::<Decimal>(), dec!(1.03));
        assert!(parts.iter().all(|p| *p >= Decimal::ZERO));
    }

    #[test]
    fn test_lifetime_cap() {
        let mut s = structure();
        s.lifetime_cap_pct_of_equity = Some(dec!(0.13));
        let mut p = projection(5);
        let mut diags = Diagnostics::new();
        let r = apply_sponsor_fees(&s, &bases(), &mut p, &mut diags);
        assert_eq!(r.total_fees, dec!(130000));
        assert_eq!(r.years[1].total_fees, dec!(10000));
        assert_eq!(r.years[2].total_fees, dec!(0));
        assert_eq!(r.years[2].cap_reduction, dec!(10000));
    }

    #[test]
    fn test_fee_drag_positive() {
        let mut p = projection(5);
        let mut diags = Diagnostics::new();
        let r = apply_sponsor_fees(&structure(), &bases(), &mut p, &mut diags);
        let drag = r.fee_drag.fee_drag_bps.unwrap();
        assert!(drag > Decimal::ZERO);
        // Taking the same fees at exit costs the LP less than paying them early
        assert!(r.fee_drag.timing_drag_bps.unwrap() > Decimal::ZERO);
        assert_eq!(r.gp_total, r.total_fees);
    }
}
