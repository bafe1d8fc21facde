use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::{PropertyType, ProjectAssumptions};
use crate::cash_flow::strategy_for;
use crate::development::costs::{build_cost_breakdown, CostBreakdown};
use crate::diagnostics::{safe_div, Diagnostics};
use crate::time_value::{monthly_payment, remaining_balance};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::ProformaResult;

/// Average share of the construction commitment outstanding over the
/// construction period (draws ramp up from zero).
pub const CONSTRUCTION_AVERAGE_OUTSTANDING: Decimal = dec!(0.60);

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Construction and permanent debt sizing plus the equity requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingSummary {
    pub construction_loan: Money,
    pub construction_interest: Money,
    pub origination_fee: Money,
    /// Construction interest + origination fee
    pub financing_costs: Money,
    /// Total cost + financing costs - construction loan, floored at zero
    pub required_equity: Money,
    pub stabilized_noi: Money,
    /// Stabilized NOI / market cap rate
    pub stabilized_value: Money,
    pub permanent_loan: PermanentLoan,
    /// Permanent loan - construction payoff - construction interest, if positive
    pub refinance_proceeds: Money,
    /// Construction principal the permanent loan does not take out. Stays
    /// outstanding interest-only at the construction rate until exit.
    pub carried_construction_balance: Money,
    pub carried_construction_rate: Rate,
}

impl FinancingSummary {
    /// Permanent debt service plus interest on any carried construction balance.
    pub fn debt_service(&self, year: u32) -> Money {
        self.permanent_loan.debt_service(year)
            + self.carried_construction_balance * self.carried_construction_rate
    }

    /// All debt repaid from sale proceeds at the end of operating year `years`.
    pub fn payoff_after(&self, years: u32) -> Money {
        self.permanent_loan.balance_after(years) + self.carried_construction_balance
    }
}

/// Takeout loan on the stabilized asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermanentLoan {
    pub amount: Money,
    pub rate: Rate,
    pub amortization_years: u32,
    pub interest_only_years: u32,
    /// Level monthly payment once amortization begins
    pub monthly_payment: Money,
}

impl PermanentLoan {
    pub fn none() -> Self {
        PermanentLoan {
            amount: Decimal::ZERO,
            rate: Decimal::ZERO,
            amortization_years: 0,
            interest_only_years: 0,
            monthly_payment: Decimal::ZERO,
        }
    }

    fn is_interest_only(&self, year: u32) -> bool {
        self.amortization_years == 0 || year <= self.interest_only_years
    }

    /// Annual debt service in operating year `year` (1-based).
    pub fn debt_service(&self, year: u32) -> Money {
        if self.amount.is_zero() {
            return Decimal::ZERO;
        }
        if self.is_interest_only(year) {
            self.amount * self.rate
        } else {
            self.monthly_payment * dec!(12)
        }
    }

    /// Outstanding principal at the end of operating year `years`.
    pub fn balance_after(&self, years: u32) -> Money {
        if self.amount.is_zero() || self.is_interest_only(years) {
            return self.amount;
        }
        let amortizing_months = (years - self.interest_only_years) * 12;
        remaining_balance(self.amount, self.rate, self.monthly_payment, amortizing_months)
    }
}

// ---------------------------------------------------------------------------
// Sizing
// ---------------------------------------------------------------------------

/// Size construction and permanent debt against a cost budget.
pub fn size_financing(
    assumptions: &ProjectAssumptions,
    costs: &CostBreakdown,
    stabilized_noi: Money,
    diagnostics: &mut Diagnostics,
) -> ProformaResult<FinancingSummary> {
    let fin = &assumptions.financing;

    let ltc = fin.construction_ltc.max(Decimal::ZERO).min(Decimal::ONE);
    let construction_loan = costs.total_cost * ltc;
    let term_years = Decimal::from(fin.construction_term_months) / dec!(12);
    let construction_interest =
        construction_loan * fin.construction_rate * term_years * CONSTRUCTION_AVERAGE_OUTSTANDING;
    let origination_fee = construction_loan * fin.origination_fee_pct;
    let financing_costs = construction_interest + origination_fee;

    let raw_equity = costs.total_cost + financing_costs - construction_loan;
    let required_equity = if raw_equity < Decimal::ZERO {
        diagnostics.validation(
            "financing.required_equity",
            format!("Required equity {raw_equity} is negative; clamped to 0"),
        );
        Decimal::ZERO
    } else {
        raw_equity
    };
    if required_equity.is_zero() {
        diagnostics.validation(
            "financing.required_equity",
            "Project requires no equity; equity multiple and cash-on-cash will be 0",
        );
    }

    let is_for_sale = assumptions.property.property_type() == PropertyType::ForSale;
    let (stabilized_value, permanent_loan) = if is_for_sale || fin.permanent_ltv.is_zero() {
        (Decimal::ZERO, PermanentLoan::none())
    } else {
        let value = safe_div(
            stabilized_noi,
            assumptions.operations.market_cap_rate,
            "operations.market_cap_rate",
            diagnostics,
        );
        let amount = (value * fin.permanent_ltv).max(Decimal::ZERO);
        let payment = if fin.amortization_years == 0 {
            diagnostics.validation(
                "financing.amortization_years",
                "Zero amortization term; permanent loan is interest-only for the hold",
            );
            Decimal::ZERO
        } else {
            monthly_payment(amount, fin.permanent_rate, fin.amortization_years * 12)?
        };
        (
            value,
            PermanentLoan {
                amount,
                rate: fin.permanent_rate,
                amortization_years: fin.amortization_years,
                interest_only_years: fin.interest_only_years,
                monthly_payment: payment,
            },
        )
    };

    let refinance_proceeds = if permanent_loan.amount.is_zero() {
        Decimal::ZERO
    } else {
        let net = permanent_loan.amount - construction_loan - construction_interest;
        if net < Decimal::ZERO {
            diagnostics.validation(
                "financing.permanent_ltv",
                format!("Permanent loan does not cover construction payoff (shortfall {})", -net),
            );
            Decimal::ZERO
        } else {
            net
        }
    };

    let carried_construction_balance = if is_for_sale {
        Decimal::ZERO
    } else {
        (construction_loan - permanent_loan.amount).max(Decimal::ZERO)
    };
    if carried_construction_balance > Decimal::ZERO {
        diagnostics.validation(
            "financing.construction_loan",
            format!(
                "Construction balance of {carried_construction_balance} is not refinanced; \
                 carried interest-only at {}% until exit",
                fin.construction_rate * dec!(100)
            ),
        );
    }

    tracing::debug!(
        %construction_loan,
        %required_equity,
        permanent_loan = %permanent_loan.amount,
        "financing sized"
    );

    Ok(FinancingSummary {
        construction_loan,
        construction_interest,
        origination_fee,
        financing_costs,
        required_equity,
        stabilized_noi,
        stabilized_value,
        permanent_loan,
        refinance_proceeds,
        carried_construction_balance,
        carried_construction_rate: fin.construction_rate,
    })
}

/// Standalone debt sizing: builds the budget and stabilized NOI first.
pub fn calculate_financing(
    assumptions: &ProjectAssumptions,
) -> ProformaResult<ComputationOutput<FinancingSummary>> {
    let start = Instant::now();
    assumptions.validate_shape()?;

    let mut diagnostics = Diagnostics::new();
    assumptions.review(&mut diagnostics);
    let costs = build_cost_breakdown(assumptions, &mut diagnostics);
    let noi = strategy_for(&assumptions.property).stabilized_noi(assumptions);
    let summary = size_financing(assumptions, &costs, noi, &mut diagnostics)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Construction (LTC, 60% average outstanding) and Permanent (LTV on stabilized value) Debt Sizing",
        &assumptions.financing,
        diagnostics.to_messages(),
        elapsed,
        summary,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::office_assumptions;

    #[test]
    fn test_construction_loan_and_interest() {
        let a = office_assumptions();
        let mut diags = Diagnostics::new();
        let costs = build_cost_breakdown(&a, &mut diags);
        let f = size_financing(&a, &costs, dec!(3000000), &mut diags).unwrap();

        assert_eq!(f.construction_loan, costs.total_cost * dec!(0.65));
        // loan x 7% x 2 years x 0.6
        assert_eq!(
            f.construction_interest,
            f.construction_loan * dec!(0.07) * dec!(2) * dec!(0.60)
        );
        assert_eq!(f.origination_fee, f.construction_loan * dec!(0.01));
        assert_eq!(
            f.required_equity,
            costs.total_cost + f.financing_costs - f.construction_loan
        );
    }

    #[test]
    fn test_permanent_loan_sizing() {
        let a = office_assumptions();
        let mut diags = Diagnostics::new();
        let costs = build_cost_breakdown(&a, &mut diags);
        let f = size_financing(&a, &costs, dec!(3000000), &mut diags).unwrap();

        // 3M / 6% = 50M value, 65% LTV
        assert_eq!(f.stabilized_value, dec!(50000000));
        assert_eq!(f.permanent_loan.amount, dec!(32500000));
        assert!(f.permanent_loan.monthly_payment > Decimal::ZERO);
    }

    #[test]
    fn test_zero_market_cap_gives_no_loan() {
        let mut a = office_assumptions();
        a.operations.market_cap_rate = Decimal::ZERO;
        let mut diags = Diagnostics::new();
        let costs = build_cost_breakdown(&a, &mut diags);
        let f = size_financing(&a, &costs, dec!(3000000), &mut diags).unwrap();
        assert_eq!(f.stabilized_value, Decimal::ZERO);
        assert_eq!(f.permanent_loan.amount, Decimal::ZERO);
        assert_eq!(f.refinance_proceeds, Decimal::ZERO);
        assert!(diags.mentions("operations.market_cap_rate"));
    }

    #[test]
    fn test_interest_only_then_amortizing() {
        let loan = PermanentLoan {
            amount: dec!(1000000),
            rate: dec!(0.06),
            amortization_years: 30,
            interest_only_years: 2,
            monthly_payment: monthly_payment(dec!(1000000), dec!(0.06), 360).unwrap(),
        };
        assert_eq!(loan.debt_service(1), dec!(60000));
        assert_eq!(loan.debt_service(2), dec!(60000));
        assert_eq!(loan.debt_service(3), loan.monthly_payment * dec!(12));
        assert_eq!(loan.balance_after(2), dec!(1000000));
        assert!(loan.balance_after(3) < dec!(1000000));
    }

    #[test]
    fn test_refinance_shortfall_warns() {
        let mut a = office_assumptions();
        a.financing.permanent_ltv = dec!(0.10);
        let mut diags = Diagnostics::new();
        let costs = build_cost_breakdown(&a, &mut diags);
        let f = size_financing(&a, &costs, dec!(3000000), &mut diags).unwrap();
        assert_eq!(f.refinance_proceeds, Decimal::ZERO);
        assert!(diags.mentions("financing.permanent_ltv"));

        let carried = f.construction_loan - f.permanent_loan.amount;
        assert_eq!(f.carried_construction_balance, carried);
        assert_eq!(
            f.debt_service(1),
            f.permanent_loan.debt_service(1) + carried * dec!(0.07)
        );
        assert_eq!(f.payoff_after(10), f.permanent_loan.balance_after(10) + carried);
    }

    #[test]
    fn test_no_permanent_loan_carries_construction_loan() {
        let mut a = office_assumptions();
        a.financing.permanent_ltv = Decimal::ZERO;
        let mut diags = Diagnostics::new();
        let costs = build_cost_breakdown(&a, &mut diags);
        let f = size_financing(&a, &costs, dec!(3000000), &mut diags).unwrap();

        assert_eq!(f.permanent_loan.amount, Decimal::ZERO);
        assert_eq!(f.carried_construction_balance, f.construction_loan);
        assert_eq!(f.debt_service(3), f.construction_loan * dec!(0.07));
        assert_eq!(f.payoff_after(10), f.construction_loan);
        assert!(diags.mentions("financing.construction_loan"));
    }

    #[test]
    fn test_full_takeout_carries_nothing() {
        let a = office_assumptions();
        let mut diags = Diagnostics::new();
        let costs = build_cost_breakdown(&a, &mut diags);
        let f = size_financing(&a, &costs, dec!(3000000), &mut diags).unwrap();
        assert_eq!(f.carried_construction_balance, Decimal::ZERO);
        assert_eq!(f.debt_service(1), f.permanent_loan.debt_service(1));
        assert!(!diags.mentions("financing.construction_loan"));
    }
}
