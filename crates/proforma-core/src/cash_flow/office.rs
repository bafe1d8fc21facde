use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::assumptions::{OfficeProfile, OperatingAssumptions, ParkingIncome, PropertyType, ProjectAssumptions};
use crate::cash_flow::income::{project_income, OperatingLine};
use crate::cash_flow::{CashFlowProjection, CashFlowStrategy, ProjectionContext};
use crate::diagnostics::Diagnostics;
use crate::time_value::compound_factor;
use crate::types::Money;
use crate::ProformaResult;

/// Office: stepped rent escalation with optional parking income.
pub struct OfficeStrategy<'a> {
    profile: &'a OfficeProfile,
}

impl<'a> OfficeStrategy<'a> {
    pub fn new(profile: &'a OfficeProfile) -> Self {
        Self { profile }
    }

    /// Base rent per SF in `year`; steps once every `escalation_step_years`.
    pub fn rent_psf(&self, year: u32) -> Money {
        let step_years = self.profile.escalation_step_years.max(1);
        let steps = (year.saturating_sub(1)) / step_years;
        self.profile.base_rent_psf * compound_factor(self.profile.escalation_step_pct, steps)
    }

    fn operating_line(&self, year: u32, ops: &OperatingAssumptions) -> OperatingLine {
        let p = self.profile;
        let base_rent = self.rent_psf(year) * p.rentable_sf;
        let parking = p
            .parking
            .as_ref()
            .map(|pk| parking_income(pk, year))
            .unwrap_or(Decimal::ZERO);
        let opex = p.opex_psf * p.rentable_sf * compound_factor(ops.expense_growth, year - 1);

        OperatingLine {
            gross_revenue: base_rent + parking,
            vacancy_loss: base_rent * ops.vacancy_rate,
            operating_expenses: opex,
        }
    }
}

/// Annual parking revenue in `year`, grown from the year-1 monthly rate.
pub fn parking_income(parking: &ParkingIncome, year: u32) -> Money {
    Decimal::from(parking.spaces)
        * parking.monthly_rate
        * dec!(12)
        * compound_factor(parking.annual_growth, year.saturating_sub(1))
}

impl CashFlowStrategy for OfficeStrategy<'_> {
    fn property_type(&self) -> PropertyType {
        PropertyType::Office
    }

    fn stabilized_noi(&self, assumptions: &ProjectAssumptions) -> Money {
        self.operating_line(1, &assumptions.operations).noi()
    }

    fn project(
        &self,
        ctx: &ProjectionContext<'_>,
        diagnostics: &mut Diagnostics,
    ) -> ProformaResult<CashFlowProjection> {
        let ops = &ctx.assumptions.operations;
        project_income(ctx, diagnostics, |year| self.operating_line(year, ops))
    }
}
