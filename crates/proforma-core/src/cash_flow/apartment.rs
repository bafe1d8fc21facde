use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::assumptions::{ApartmentProfile, OperatingAssumptions, PropertyType, ProjectAssumptions};
use crate::cash_flow::income::{project_income, OperatingLine};
use crate::cash_flow::{CashFlowProjection, CashFlowStrategy, ProjectionContext};
use crate::diagnostics::Diagnostics;
use crate::time_value::compound_factor;
use crate::types::Money;
use crate::ProformaResult;

/// Multifamily: unit-mix rent roll grown at a blended renewal/new-lease rate.
pub struct ApartmentStrategy<'a> {
    profile: &'a ApartmentProfile,
}

impl<'a> ApartmentStrategy<'a> {
    pub fn new(profile: &'a ApartmentProfile) -> Self {
        Self { profile }
    }

    /// Gross potential rent in `year`.
    pub fn gross_potential_rent(&self, year: u32) -> Money {
        let year_one: Money = self
            .profile
            .unit_mix
            .iter()
            .map(|u| Decimal::from(u.count) * u.monthly_rent * dec!(12))
            .sum();
        year_one * compound_factor(self.profile.blended_rent_growth(), year.saturating_sub(1))
    }

    fn operating_line(&self, year: u32, ops: &OperatingAssumptions) -> OperatingLine {
        let p = self.profile;
        let units = Decimal::from(p.total_units());
        let gpr = self.gross_potential_rent(year);
        let loss_to_lease = gpr * p.loss_to_lease_pct;
        let vacancy = gpr * ops.vacancy_rate;
        let other_income = units
            * p.other_income_per_unit_monthly
            * dec!(12)
            * compound_factor(p.blended_rent_growth(), year.saturating_sub(1));
        let opex = units * p.opex_per_unit * compound_factor(ops.expense_growth, year - 1);

        OperatingLine {
            gross_revenue: gpr + other_income,
            vacancy_loss: loss_to_lease + vacancy,
            operating_expenses: opex,
        }
    }
}

impl CashFlowStrategy for ApartmentStrategy<'_> {
    fn property_type(&self) -> PropertyType {
        PropertyType::Apartment
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
