//! Shared annual projection for income-producing archetypes.

use rust_decimal::Decimal;

use crate::cash_flow::{period_end, CashFlowProjection, CashFlowYear, ExitAnalysis, ProjectionContext};
use crate::diagnostics::{div_or_zero, safe_div, Diagnostics};
use crate::types::Money;
use crate::ProformaResult;

/// Revenue and expense lines for one operating year, before debt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingLine {
    pub gross_revenue: Money,
    /// Vacancy and any other revenue loss (e.g. loss-to-lease)
    pub vacancy_loss: Money,
    pub operating_expenses: Money,
}

impl OperatingLine {
    pub fn effective_gross_revenue(&self) -> Money {
        self.gross_revenue - self.vacancy_loss
    }

    pub fn noi(&self) -> Money {
        self.effective_gross_revenue() - self.operating_expenses
    }
}

/// Build the hold-period projection from a per-year operating line.
///
/// Year 1 carries any refinance proceeds; the terminal year carries the
/// exit at terminal NOI / exit cap rate, net of exit costs and loan payoff.
pub fn project_income<F>(
    ctx: &ProjectionContext<'_>,
    diagnostics: &mut Diagnostics,
    line_for_year: F,
) -> ProformaResult<CashFlowProjection>
where
    F: Fn(u32) -> OperatingLine,
{
    let a = ctx.assumptions;
    let ops = &a.operations;
    let financing = ctx.financing;
    let hold = ops.hold_period_years;

    let mut years = Vec::with_capacity(hold as usize + 1);
    years.push(CashFlowYear::initial_investment(
        ctx.financing.required_equity,
        period_end(a.start_date, 0)?,
    ));

    let mut exit = None;
    for year in 1..=hold {
        let line = line_for_year(year);
        let mut row = CashFlowYear::empty(year, period_end(a.start_date, year)?);
        row.gross_revenue = line.gross_revenue;
        row.vacancy_loss = line.vacancy_loss;
        row.effective_gross_revenue = line.effective_gross_revenue();
        row.operating_expenses = line.operating_expenses;
        row.noi = line.noi();
        row.debt_service = financing.debt_service(year);
        row.dscr = if row.debt_service > Decimal::ZERO {
            Some(div_or_zero(row.noi, row.debt_service))
        } else {
            None
        };

        if year == 1 {
            row.refinance_proceeds = financing.refinance_proceeds;
        }

        if year == hold {
            let gross_exit_value = safe_div(
                row.noi,
                ops.exit_cap_rate,
                "operations.exit_cap_rate",
                diagnostics,
            );
            let exit_costs = gross_exit_value * ops.exit_cost_pct;
            let loan_payoff = financing.payoff_after(hold);
            let net_sale_proceeds = gross_exit_value - exit_costs - loan_payoff;
            if net_sale_proceeds < Decimal::ZERO {
                diagnostics.validation(
                    "exit.net_sale_proceeds",
                    format!("Exit value does not cover costs and loan payoff ({net_sale_proceeds})"),
                );
            }
            row.sale_proceeds = net_sale_proceeds;
            exit = Some(ExitAnalysis {
                terminal_noi: row.noi,
                exit_cap_rate: ops.exit_cap_rate,
                gross_exit_value,
                exit_costs,
                loan_payoff,
                net_sale_proceeds,
            });
        }

        row.settle();
        years.push(row);
    }

    let mut projection = CashFlowProjection {
        years,
        exit,
        for_sale: None,
    };
    projection.recompute_cumulative();
    Ok(projection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::development::costs::build_cost_breakdown;
    use crate::development::financing::size_financing;
    use crate::diagnostics::DiagnosticKind;
    use crate::test_fixtures::office_assumptions;
    use rust_decimal_macros::dec;

    fn flat_line(_year: u32) -> OperatingLine {
        OperatingLine {
            gross_revenue: dec!(1000000),
            vacancy_loss: dec!(50000),
            operating_expenses: dec!(350000),
        }
    }

    #[test]
    fn test_flat_projection() {
        let mut a = office_assumptions();
        a.financing.permanent_ltv = dec!(0);
        a.operations.hold_period_years = 5;
        let mut diags = Diagnostics::new();
        let costs = build_cost_breakdown(&a, &mut diags);
        let fin = size_financing(&a, &costs, dec!(600000), &mut diags).unwrap();
        let ctx = ProjectionContext {
            assumptions: &a,
            costs: &costs,
            financing: &fin,
        };
        let p = project_income(&ctx, &mut diags, flat_line).unwrap();

        assert_eq!(p.years.len(), 6);
        assert_eq!(p.years[1].noi, dec!(600000));

        // No takeout: the construction loan stays outstanding interest-only
        let carried_interest = fin.construction_loan * dec!(0.07);
        assert_eq!(p.years[1].debt_service, carried_interest);
        assert_eq!(p.years[1].cash_flow, dec!(600000) - carried_interest);

        let exit = p.exit.unwrap();
        // 600k / 6.5%
        let value = dec!(600000) / dec!(0.065);
        assert_eq!(exit.gross_exit_value, value);
        assert_eq!(exit.loan_payoff, fin.construction_loan);
        assert_eq!(
            exit.net_sale_proceeds,
            value - value * dec!(0.02) - fin.construction_loan
        );
        assert_eq!(
            p.years[5].cash_flow,
            dec!(600000) - carried_interest + exit.net_sale_proceeds
        );
    }

    #[test]
    fn test_undersized_takeout_repays_remainder_at_exit() {
        let mut a = office_assumptions();
        a.financing.permanent_ltv = dec!(0.10);
        a.operations.hold_period_years = 5;
        let mut diags = Diagnostics::new();
        let costs = build_cost_breakdown(&a, &mut diags);
        let fin = size_financing(&a, &costs, dec!(3000000), &mut diags).unwrap();
        let ctx = ProjectionContext {
            assumptions: &a,
            costs: &costs,
            financing: &fin,
        };
        let p = project_income(&ctx, &mut diags, flat_line).unwrap();

        let carried = fin.construction_loan - fin.permanent_loan.amount;
        assert!(carried > Decimal::ZERO);
        assert_eq!(p.years[1].refinance_proceeds, Decimal::ZERO);
        assert_eq!(
            p.years[1].debt_service,
            fin.permanent_loan.debt_service(1) + carried * dec!(0.07)
        );

        let exit = p.exit.unwrap();
        assert_eq!(
            exit.loan_payoff,
            fin.permanent_loan.balance_after(5) + carried
        );
    }

    #[test]
    fn test_zero_exit_cap_gives_zero_value() {
        let mut a = office_assumptions();
        a.financing.permanent_ltv = dec!(0);
        a.operations.exit_cap_rate = dec!(0);
        let mut diags = Diagnostics::new();
        let costs = build_cost_breakdown(&a, &mut diags);
        let fin = size_financing(&a, &costs, dec!(600000), &mut diags).unwrap();
        let ctx = ProjectionContext {
            assumptions: &a,
            costs: &costs,
            financing: &fin,
        };
        let p = project_income(&ctx, &mut diags, flat_line).unwrap();
        assert_eq!(p.exit.unwrap().gross_exit_value, Decimal::ZERO);
        assert!(diags.has(DiagnosticKind::NumericDegeneracy));
        assert!(diags.mentions("operations.exit_cap_rate"));
    }
}
