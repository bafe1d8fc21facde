//! Annual cash-flow projection, one strategy per property archetype.

pub mod apartment;
pub mod for_sale;
pub mod income;
pub mod office;
pub mod retail;

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::{PropertyProfile, PropertyType, ProjectAssumptions};
use crate::development::costs::{build_cost_breakdown, CostBreakdown};
use crate::development::financing::{size_financing, FinancingSummary};
use crate::diagnostics::Diagnostics;
use crate::error::ProformaError;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::ProformaResult;

use self::apartment::ApartmentStrategy;
use self::for_sale::{ForSaleStrategy, ForSaleSummary};
use self::office::OfficeStrategy;
use self::retail::RetailStrategy;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One row of the annual projection. Year 0 carries the equity contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowYear {
    pub year: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_end: Option<NaiveDate>,
    pub gross_revenue: Money,
    pub vacancy_loss: Money,
    pub effective_gross_revenue: Money,
    pub operating_expenses: Money,
    pub noi: Money,
    pub debt_service: Money,
    /// NOI / debt service; `None` when there is no debt service
    pub dscr: Option<Decimal>,
    pub sponsor_fees: Money,
    /// NOI - debt service - sponsor fees
    pub base_cash_flow: Money,
    pub sale_proceeds: Money,
    pub refinance_proceeds: Money,
    pub disposition_fee: Money,
    pub cash_flow: Money,
    pub cumulative_cash_flow: Money,
}

impl CashFlowYear {
    pub fn empty(year: u32, period_end: Option<NaiveDate>) -> Self {
        CashFlowYear {
            year,
            period_end,
            gross_revenue: Decimal::ZERO,
            vacancy_loss: Decimal::ZERO,
            effective_gross_revenue: Decimal::ZERO,
            operating_expenses: Decimal::ZERO,
            noi: Decimal::ZERO,
            debt_service: Decimal::ZERO,
            dscr: None,
            sponsor_fees: Decimal::ZERO,
            base_cash_flow: Decimal::ZERO,
            sale_proceeds: Decimal::ZERO,
            refinance_proceeds: Decimal::ZERO,
            disposition_fee: Decimal::ZERO,
            cash_flow: Decimal::ZERO,
            cumulative_cash_flow: Decimal::ZERO,
        }
    }

    /// The initial equity contribution row.
    pub fn initial_investment(equity: Money, period_end: Option<NaiveDate>) -> Self {
        let mut row = Self::empty(0, period_end);
        row.base_cash_flow = -equity;
        row.cash_flow = -equity;
        row.cumulative_cash_flow = -equity;
        row
    }

    /// Recompute the derived columns after fees or one-time items change.
    pub fn settle(&mut self) {
        if self.year == 0 {
            return;
        }
        self.base_cash_flow = self.noi - self.debt_service - self.sponsor_fees;
        self.cash_flow =
            self.base_cash_flow + self.refinance_proceeds + self.sale_proceeds - self.disposition_fee;
    }

    /// Cash flow before any sponsor compensation.
    pub fn pre_fee_cash_flow(&self) -> Money {
        self.cash_flow + self.sponsor_fees + self.disposition_fee
    }
}

/// Terminal-year sale of an income property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitAnalysis {
    pub terminal_noi: Money,
    pub exit_cap_rate: Decimal,
    pub gross_exit_value: Money,
    pub exit_costs: Money,
    pub loan_payoff: Money,
    pub net_sale_proceeds: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowProjection {
    pub years: Vec<CashFlowYear>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<ExitAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_sale: Option<ForSaleSummary>,
}

impl CashFlowProjection {
    /// Operating years after the initial investment.
    pub fn hold_years(&self) -> u32 {
        self.years.len().saturating_sub(1) as u32
    }

    pub fn cash_flows(&self) -> Vec<Money> {
        self.years.iter().map(|y| y.cash_flow).collect()
    }

    /// Re-accumulate the running total after any column changes.
    pub fn recompute_cumulative(&mut self) {
        let mut running = Decimal::ZERO;
        for row in self.years.iter_mut() {
            running += row.cash_flow;
            row.cumulative_cash_flow = running;
        }
    }
}

/// Everything a strategy needs beyond the raw assumptions.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionContext<'a> {
    pub assumptions: &'a ProjectAssumptions,
    pub costs: &'a CostBreakdown,
    pub financing: &'a FinancingSummary,
}

// ---------------------------------------------------------------------------
// Strategy dispatch
// ---------------------------------------------------------------------------

/// Archetype-specific cash-flow generation.
pub trait CashFlowStrategy {
    fn property_type(&self) -> PropertyType;

    /// Year-1 NOI used to size permanent debt. Zero for for-sale.
    fn stabilized_noi(&self, assumptions: &ProjectAssumptions) -> Money;

    fn project(
        &self,
        ctx: &ProjectionContext<'_>,
        diagnostics: &mut Diagnostics,
    ) -> ProformaResult<CashFlowProjection>;
}

/// Select the strategy once from the archetype tag.
pub fn strategy_for(property: &PropertyProfile) -> Box<dyn CashFlowStrategy + '_> {
    match property {
        PropertyProfile::Office(p) => Box::new(OfficeStrategy::new(p)),
        PropertyProfile::Retail(p) => Box::new(RetailStrategy::new(p)),
        PropertyProfile::Apartment(p) => Box::new(ApartmentStrategy::new(p)),
        PropertyProfile::ForSale(p) => Box::new(ForSaleStrategy::new(p)),
    }
}

/// Calendar end of analysis year `year`, when a start date is given.
pub fn period_end(start: Option<NaiveDate>, year: u32) -> ProformaResult<Option<NaiveDate>> {
    match start {
        None => Ok(None),
        Some(date) => date
            .checked_add_months(Months::new(12 * year))
            .map(Some)
            .ok_or_else(|| {
                ProformaError::DateError(format!("year {year} after {date} is out of range"))
            }),
    }
}

// ---------------------------------------------------------------------------
// Standalone entry point
// ---------------------------------------------------------------------------

/// Costs, financing and the unallocated annual projection for a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowOutput {
    pub costs: CostBreakdown,
    pub financing: FinancingSummary,
    pub projection: CashFlowProjection,
}

pub fn generate_cash_flows(
    assumptions: &ProjectAssumptions,
) -> ProformaResult<ComputationOutput<CashFlowOutput>> {
    let start = Instant::now();
    assumptions.validate_shape()?;

    let mut diagnostics = Diagnostics::new();
    assumptions.review(&mut diagnostics);

    let costs = build_cost_breakdown(assumptions, &mut diagnostics);
    let strategy = strategy_for(&assumptions.property);
    let noi = strategy.stabilized_noi(assumptions);
    let financing = size_financing(assumptions, &costs, noi, &mut diagnostics)?;
    let ctx = ProjectionContext {
        assumptions,
        costs: &costs,
        financing: &financing,
    };
    let projection = strategy.project(&ctx, &mut diagnostics)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!("Annual Cash Flow Projection ({:?})", strategy.property_type()),
        assumptions,
        diagnostics.to_messages(),
        elapsed,
        CashFlowOutput {
            costs,
            financing,
            projection,
        },
    ))
}
