use rust_decimal::Decimal;

use crate::assumptions::{OperatingAssumptions, PercentageRent, PropertyType, ProjectAssumptions, RetailProfile};
use crate::cash_flow::income::{project_income, OperatingLine};
use crate::cash_flow::office::parking_income;
use crate::cash_flow::{CashFlowProjection, CashFlowStrategy, ProjectionContext};
use crate::diagnostics::{div_or_zero, Diagnostics};
use crate::time_value::compound_factor;
use crate::types::Money;
use crate::ProformaResult;

/// Retail: annual base-rent escalation plus percentage rent over breakpoint.
pub struct RetailStrategy<'a> {
    profile: &'a RetailProfile,
}

impl<'a> RetailStrategy<'a> {
    pub fn new(profile: &'a RetailProfile) -> Self {
        Self { profile }
    }

    pub fn base_rent_psf(&self, year: u32) -> Money {
        self.profile.base_rent_psf
            * compound_factor(self.profile.annual_escalation, year.saturating_sub(1))
    }

    /// Overage rent per leasable SF in `year`.
    pub fn percentage_rent_psf(&self, terms: &PercentageRent, year: u32) -> Money {
        if terms.rate <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let sales = terms.tenant_sales_psf * compound_factor(terms.sales_growth, year.saturating_sub(1));
        let breakpoint = terms
            .breakpoint_psf
            .unwrap_or_else(|| div_or_zero(self.base_rent_psf(year), terms.rate));
        (sales - breakpoint).max(Decimal::ZERO) * terms.rate
    }

    fn operating_line(&self, year: u32, ops: &OperatingAssumptions) -> OperatingLine {
        let p = self.profile;
        let base_rent = self.base_rent_psf(year) * p.leasable_sf;
        let overage = p
            .percentage_rent
            .as_ref()
            .map(|terms| self.percentage_rent_psf(terms, year) * p.leasable_sf)
            .unwrap_or(Decimal::ZERO);
        let parking = p
            .parking
            .as_ref()
            .map(|pk| parking_income(pk, year))
            .unwrap_or(Decimal::ZERO);
        let opex = p.opex_psf * p.leasable_sf * compound_factor(ops.expense_growth, year - 1);

        OperatingLine {
            gross_revenue: base_rent + overage + parking,
            vacancy_loss: (base_rent + overage) * ops.vacancy_rate,
            operating_expenses: opex,
        }
    }
}

impl CashFlowStrategy for RetailStrategy<'_> {
    fn property_type(&self) -> PropertyType {
        PropertyType::Retail
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::PropertyProfile;
    use crate::test_fixtures::retail_assumptions;
    use rust_decimal_macros::dec;

    fn profile() -> RetailProfile {
        match retail_assumptions().property {
            PropertyProfile::Retail(p) => p,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_natural_breakpoint() {
        let p = profile();
        let s = RetailStrategy::new(&p);
        let terms = p.percentage_rent.clone().unwrap();
        // breakpoint = 30 / 6% = 500 = sales, so no overage in year 1
        assert_eq!(s.percentage_rent_psf(&terms, 1), Decimal::ZERO);
        // year 2: sales 515, breakpoint 30.75 / 0.06 = 512.5
        assert_eq!(s.percentage_rent_psf(&terms, 2), dec!(0.15));
    }

    #[test]
    fn test_explicit_breakpoint() {
        let p = profile();
        let s = RetailStrategy::new(&p);
        let mut terms = p.percentage_rent.clone().unwrap();
        terms.breakpoint_psf = Some(dec!(400));
        assert_eq!(s.percentage_rent_psf(&terms, 1), dec!(6));
    }

    #[test]
    fn test_annual_escalation_and_noi() {
        let a = retail_assumptions();
        let p = profile();
        let s = RetailStrategy::new(&p);
        assert_eq!(s.base_rent_psf(2), dec!(30.75));
        // 30 x 45k = 1.35M, 5% vacancy, 8 x 45k opex
        assert_eq!(
            s.stabilized_noi(&a),
            dec!(1350000) - dec!(67500) - dec!(360000)
        );
    }
}
