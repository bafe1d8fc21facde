//! For-sale (condominium) projects: monthly absorption simulation rolled up
//! into annual buckets.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::assumptions::{ForSaleProfile, PropertyType, ProjectAssumptions};
use crate::cash_flow::{period_end, CashFlowProjection, CashFlowStrategy, CashFlowYear, ProjectionContext};
use crate::development::financing::FinancingSummary;
use crate::diagnostics::{div_or_zero, Diagnostics};
use crate::time_value::compound_factor;
use crate::types::{Money, Rate};
use crate::ProformaResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForSaleMonth {
    pub month: u32,
    /// Cumulative units released to market
    pub units_released: u32,
    pub units_signed: u32,
    pub units_closed: u32,
    pub price_per_unit: Money,
    pub deposits: Money,
    /// Balance due at closing (contract value less deposit)
    pub closing_proceeds: Money,
    pub marketing: Money,
    pub commissions: Money,
    pub closing_costs: Money,
    pub loan_draw: Money,
    pub interest: Money,
    pub interest_from_reserve: Money,
    /// Principal repaid from cash, including any balloon at the horizon
    pub principal_repaid: Money,
    pub net_cash_flow: Money,
}

impl ForSaleMonth {
    pub fn collections(&self) -> Money {
        self.deposits + self.closing_proceeds
    }

    pub fn selling_costs(&self) -> Money {
        self.marketing + self.commissions + self.closing_costs
    }

    pub fn debt_service(&self) -> Money {
        self.interest - self.interest_from_reserve + self.principal_repaid
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForSaleSummary {
    /// First month in which every unit is under contract
    pub sellout_month: Option<u32>,
    pub units_signed: u32,
    pub units_closed: u32,
    /// Contract value of all units signed
    pub gross_sales: Money,
    pub total_marketing: Money,
    pub total_commissions: Money,
    pub total_closing_costs: Money,
    pub total_interest: Money,
    pub interest_reserve_used: Money,
    pub balloon_payment: Money,
    pub months: Vec<ForSaleMonth>,
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

pub struct ForSaleStrategy<'a> {
    profile: &'a ForSaleProfile,
}

impl<'a> ForSaleStrategy<'a> {
    pub fn new(profile: &'a ForSaleProfile) -> Self {
        Self { profile }
    }

    /// Cumulative units released by `month`.
    pub fn released_through(&self, month: u32) -> u32 {
        let p = self.profile;
        if p.release_phases.is_empty() {
            return if month >= p.sales_start_month { p.units } else { 0 };
        }
        let released: u32 = p
            .release_phases
            .iter()
            .filter(|phase| phase.release_month <= month)
            .map(|phase| phase.units)
            .sum();
        released.min(p.units)
    }

    pub fn price_in_month(&self, month: u32) -> Money {
        self.profile.avg_price_per_unit
            * compound_factor(self.profile.monthly_price_escalation, month.saturating_sub(1))
    }

    /// Run the monthly absorption, closing and construction-loan schedule.
    pub fn simulate(
        &self,
        financing: &FinancingSummary,
        construction_rate: Rate,
        diagnostics: &mut Diagnostics,
    ) -> ForSaleSummary {
        let p = self.profile;
        let build_months = p.construction_months.max(1);
        let loan = financing.construction_loan;
        let scheduled_draw = div_or_zero(loan, Decimal::from(build_months));
        let monthly_rate = construction_rate / dec!(12);

        let phased_units: u32 = p.release_phases.iter().map(|phase| phase.units).sum();
        if !p.release_phases.is_empty() && phased_units < p.units {
            diagnostics.validation(
                "property.release_phases",
                format!(
                    "Release phases cover {phased_units} of {} units; the rest never release",
                    p.units
                ),
            );
        }

        let mut months = Vec::with_capacity(p.horizon_months as usize);
        let mut backlog: Vec<(u32, Money)> = Vec::new();
        let mut signed_total = 0u32;
        let mut closed_total = 0u32;
        let mut sellout_month = None;
        let mut drawn = Decimal::ZERO;
        let mut balance = Decimal::ZERO;
        let mut reserve = financing.construction_interest;
        let mut reserve_used = Decimal::ZERO;
        let mut gross_sales = Decimal::ZERO;

        for month in 1..=p.horizon_months {
            let released = self.released_through(month);
            let price = self.price_in_month(month);

            let signed = if month >= p.sales_start_month {
                p.sales_pace_per_month
                    .min(released.saturating_sub(signed_total))
            } else {
                0
            };
            signed_total += signed;
            if sellout_month.is_none() && p.units > 0 && signed_total >= p.units {
                sellout_month = Some(month);
            }

            let contract_value = price * Decimal::from(signed);
            gross_sales += contract_value;
            let deposits = contract_value * p.deposit_pct;
            let marketing = contract_value * p.marketing_pct;
            if signed > 0 {
                backlog.push((signed, price));
            }

            // Contracts deliver once construction completes.
            let (units_closed, closing_value) = if month > p.construction_months {
                backlog
                    .drain(..)
                    .fold((0u32, Decimal::ZERO), |(u, v), (units, px)| {
                        (u + units, v + px * Decimal::from(units))
                    })
            } else {
                (0, Decimal::ZERO)
            };
            closed_total += units_closed;
            let closing_proceeds = closing_value * (Decimal::ONE - p.deposit_pct);
            let commissions = closing_value * p.commission_pct;
            let closing_costs = closing_value * p.closing_cost_pct;

            let loan_draw = if month < build_months {
                scheduled_draw
            } else if month == build_months {
                loan - drawn
            } else {
                Decimal::ZERO
            };
            drawn += loan_draw;
            balance += loan_draw;

            let interest = balance * monthly_rate;
            let interest_from_reserve = interest.min(reserve);
            reserve -= interest_from_reserve;
            reserve_used += interest_from_reserve;

            let mut net = deposits + closing_proceeds
                - marketing
                - commissions
                - closing_costs
                - (interest - interest_from_reserve);

            if month == build_months && reserve > Decimal::ZERO {
                // Unused interest reserve is equity already funded; retire principal with it.
                let applied = reserve.min(balance);
                balance -= applied;
                reserve -= applied;
            }

            let mut principal_repaid = Decimal::ZERO;
            if balance > Decimal::ZERO && net > Decimal::ZERO {
                principal_repaid = net.min(balance);
                balance -= principal_repaid;
                net -= principal_repaid;
            }

            months.push(ForSaleMonth {
                month,
                units_released: released,
                units_signed: signed,
                units_closed,
                price_per_unit: price,
                deposits,
                closing_proceeds,
                marketing,
                commissions,
                closing_costs,
                loan_draw,
                interest,
                interest_from_reserve,
                principal_repaid,
                net_cash_flow: net,
            });
        }

        let mut balloon_payment = Decimal::ZERO;
        if balance > Decimal::ZERO {
            balloon_payment = balance;
            if let Some(last) = months.last_mut() {
                last.principal_repaid += balance;
                last.net_cash_flow -= balance;
            }
            diagnostics.validation(
                "financing.construction_ltc",
                format!("Construction loan balance {balance} unpaid at horizon; repaid as a balloon"),
            );
        }
        if signed_total < p.units {
            diagnostics.validation(
                "property.horizon_months",
                format!(
                    "{} of {} units remain unsold at the end of the horizon",
                    p.units - signed_total,
                    p.units
                ),
            );
        }
        if !backlog.is_empty() {
            diagnostics.validation(
                "property.construction_months",
                "Construction completes after the horizon; signed contracts never close",
            );
        }

        tracing::debug!(?sellout_month, signed_total, closed_total, "for-sale absorption simulated");

        ForSaleSummary {
            sellout_month,
            units_signed: signed_total,
            units_closed: closed_total,
            gross_sales,
            total_marketing: months.iter().map(|m| m.marketing).sum(),
            total_commissions: months.iter().map(|m| m.commissions).sum(),
            total_closing_costs: months.iter().map(|m| m.closing_costs).sum(),
            total_interest: months.iter().map(|m| m.interest).sum(),
            interest_reserve_used: reserve_used,
            balloon_payment,
            months,
        }
    }
}

/// Roll monthly records into annual `CashFlowYear` rows (years 1..).
fn aggregate_years(
    assumptions: &ProjectAssumptions,
    months: &[ForSaleMonth],
) -> ProformaResult<Vec<CashFlowYear>> {
    let year_count = months.len().div_ceil(12);
    let mut rows = Vec::with_capacity(year_count);
    for (index, chunk) in months.chunks(12).enumerate() {
        let year = index as u32 + 1;
        let mut row = CashFlowYear::empty(year, period_end(assumptions.start_date, year)?);
        row.gross_revenue = chunk.iter().map(|m| m.collections()).sum();
        row.effective_gross_revenue = row.gross_revenue;
        row.operating_expenses = chunk.iter().map(|m| m.selling_costs()).sum();
        row.noi = row.effective_gross_revenue - row.operating_expenses;
        row.debt_service = chunk.iter().map(|m| m.debt_service()).sum();
        row.settle();
        rows.push(row);
    }
    Ok(rows)
}

impl CashFlowStrategy for ForSaleStrategy<'_> {
    fn property_type(&self) -> PropertyType {
        PropertyType::ForSale
    }

    fn stabilized_noi(&self, _assumptions: &ProjectAssumptions) -> Money {
        Decimal::ZERO
    }

    fn project(
        &self,
        ctx: &ProjectionContext<'_>,
        diagnostics: &mut Diagnostics,
    ) -> ProformaResult<CashFlowProjection> {
        let a = ctx.assumptions;
        let summary = self.simulate(ctx.financing, a.financing.construction_rate, diagnostics);

        let mut years = vec![CashFlowYear::initial_investment(
            ctx.financing.required_equity,
            period_end(a.start_date, 0)?,
        )];
        years.extend(aggregate_years(a, &summary.months)?);

        let mut projection = CashFlowProjection {
            years,
            exit: None,
            for_sale: Some(summary),
        };
        projection.recompute_cumulative();
        Ok(projection)
    }
}
