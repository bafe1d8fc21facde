use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::types::{Money, Rate};
use crate::ProformaResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const MAX_BISECTION_ITERATIONS: u32 = 200;
const IRR_FLOOR: Decimal = dec!(-0.99);
const IRR_CEILING: Decimal = dec!(100.0);
const BISECTION_CEILING: Decimal = dec!(10.0);

/// Result of an IRR search, with explicit states for series that have no
/// meaningful rate of return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "rate", rename_all = "snake_case")]
pub enum IrrOutcome {
    Converged(Rate),
    /// No positive flows: capital is never returned
    TotalLoss,
    /// No negative flows: return is unbounded
    Unbounded,
    /// Fewer than two flows
    InsufficientData,
    /// Mixed-sign series on which neither Newton nor bisection converged
    NoConvergence,
}

impl IrrOutcome {
    pub fn rate(&self) -> Option<Rate> {
        match self {
            IrrOutcome::Converged(r) => Some(*r),
            _ => None,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, IrrOutcome::Converged(_))
    }
}

/// Compound growth factor (1 + rate)^periods, or None past the Decimal range.
pub fn checked_compound_factor(rate: Rate, periods: u32) -> Option<Decimal> {
    (Decimal::ONE + rate).checked_powu(u64::from(periods))
}

/// Compound growth factor (1 + rate)^periods for bounded growth rates.
/// Zero when the factor leaves the Decimal range.
pub fn compound_factor(rate: Rate, periods: u32) -> Decimal {
    checked_compound_factor(rate, periods).unwrap_or(Decimal::ZERO)
}

/// Net Present Value of a series of cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> ProformaResult<Money> {
    if rate <= dec!(-1) {
        return Err(ProformaError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| ProformaError::DivisionByZero {
                    context: format!("NPV discount factor overflow at period {t}"),
                })?;
        }
        let pv = cf.checked_div(discount).ok_or_else(|| ProformaError::DivisionByZero {
            context: format!("NPV discount factor at period {t}"),
        })?;
        result += pv;
    }

    Ok(result)
}

/// NPV and its derivative with respect to the rate. Terms whose discount
/// factor underflows or overflows the decimal range are dropped.
fn npv_with_derivative(rate: Rate, cash_flows: &[Money]) -> (Decimal, Decimal) {
    let one_plus_r = Decimal::ONE + rate;
    let mut npv_val = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            match discount.checked_mul(one_plus_r) {
                Some(d) if !d.is_zero() => discount = d,
                _ => break,
            }
        }
        let Some(term) = cf.checked_div(discount) else {
            break;
        };
        npv_val += term;
        if t > 0 {
            if let Some(d) = (Decimal::from(t as i64) * term).checked_div(one_plus_r) {
                dnpv -= d;
            }
        }
    }

    (npv_val, dnpv)
}

/// Internal Rate of Return using Newton-Raphson, falling back to bisection
/// when Newton stalls.
pub fn irr(cash_flows: &[Money], guess: Rate) -> ProformaResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(ProformaError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let mut rate = guess;

    for _ in 0..MAX_IRR_ITERATIONS {
        let (npv_val, dnpv) = npv_with_derivative(rate, cash_flows);

        if npv_val.abs() < CONVERGENCE_THRESHOLD {
            return Ok(rate);
        }

        let Some(step) = npv_val.checked_div(dnpv) else {
            break;
        };
        rate -= step;

        // Guard against divergence
        if rate < IRR_FLOOR {
            rate = IRR_FLOOR;
        } else if rate > IRR_CEILING {
            rate = IRR_CEILING;
        }
    }

    bisect_irr(cash_flows)
}

fn bisect_irr(cash_flows: &[Money]) -> ProformaResult<Rate> {
    let mut lo = IRR_FLOOR;
    let mut hi = BISECTION_CEILING;
    let (mut f_lo, _) = npv_with_derivative(lo, cash_flows);
    let (f_hi, _) = npv_with_derivative(hi, cash_flows);

    if f_lo.is_sign_negative() == f_hi.is_sign_negative() {
        return Err(ProformaError::ConvergenceFailure {
            function: "IRR".into(),
            iterations: MAX_IRR_ITERATIONS,
            last_delta: f_lo,
        });
    }

    let mut last_delta = f_lo;
    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let f_mid = npv_with_derivative(mid, cash_flows).0;
        if f_mid.abs() < CONVERGENCE_THRESHOLD || (hi - lo) < dec!(0.0000000001) {
            return Ok(mid);
        }
        if f_mid.is_sign_negative() == f_lo.is_sign_negative() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
        last_delta = f_mid;
    }

    Err(ProformaError::ConvergenceFailure {
        function: "IRR (bisection)".into(),
        iterations: MAX_BISECTION_ITERATIONS,
        last_delta,
    })
}

/// Classify a cash-flow series before solving for IRR so degenerate series
/// report an explicit state instead of a meaningless rate.
pub fn irr_outcome(cash_flows: &[Money]) -> IrrOutcome {
    if cash_flows.len() < 2 {
        return IrrOutcome::InsufficientData;
    }
    let has_positive = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    let has_negative = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    if !has_positive {
        return IrrOutcome::TotalLoss;
    }
    if !has_negative {
        return IrrOutcome::Unbounded;
    }
    match irr(cash_flows, dec!(0.10)) {
        Ok(r) => IrrOutcome::Converged(r),
        Err(_) => IrrOutcome::NoConvergence,
    }
}

/// Level monthly payment on a fully amortizing loan:
/// P * r(1+r)^n / ((1+r)^n - 1)
pub fn monthly_payment(
    principal: Money,
    annual_rate: Rate,
    total_months: u32,
) -> ProformaResult<Money> {
    if total_months == 0 {
        return Err(ProformaError::InvalidInput {
            field: "amortization_months".into(),
            reason: "Amortization period must be > 0".into(),
        });
    }

    let monthly_rate = annual_rate / dec!(12);
    if monthly_rate.is_zero() {
        return Ok(principal / Decimal::from(total_months));
    }

    let compound = compound_factor(monthly_rate, total_months);
    let denominator = compound - Decimal::ONE;
    if denominator.is_zero() {
        return Err(ProformaError::DivisionByZero {
            context: "mortgage payment denominator".into(),
        });
    }

    Ok(principal * monthly_rate * compound / denominator)
}

/// Outstanding balance after `payments_made` level monthly payments.
pub fn remaining_balance(
    principal: Money,
    annual_rate: Rate,
    payment: Money,
    payments_made: u32,
) -> Money {
    let monthly_rate = annual_rate / dec!(12);
    let mut balance = principal;
    for _ in 0..payments_made {
        let interest = balance * monthly_rate;
        balance -= payment - interest;
        if balance <= Decimal::ZERO {
            return Decimal::ZERO;
        }
    }
    balance
}
