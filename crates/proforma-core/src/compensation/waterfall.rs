use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::diagnostics::{div_or_zero, Diagnostics};
use crate::error::ProformaError;
use crate::time_value::{checked_compound_factor, IrrOutcome};
use crate::types::*;
use crate::ProformaResult;

const SHARE_TOLERANCE: Decimal = dec!(0.000001);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// LP/GP partnership terms for a promote waterfall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityStructure {
    /// LP share of equity (decimal, LP + GP should equal 1)
    pub lp_share: Rate,
    pub gp_share: Rate,
    /// Annual preferred return, compounded over the hold
    pub preferred_return: Rate,
    /// Fraction of the GP share actually funded by the GP
    #[serde(default = "default_one")]
    pub gp_coinvest_pct: Rate,
    #[serde(default)]
    pub catch_up_enabled: bool,
    /// GP share of each catch-up dollar (1.0 = full catch-up)
    #[serde(default = "default_one")]
    pub catch_up_split: Rate,
    /// GP share of profits the catch-up restores
    #[serde(default = "default_catch_up_target")]
    pub catch_up_target_promote: Rate,
    /// Ordered IRR tiers for the residual split
    pub tiers: Vec<WaterfallTier>,
}

/// Residual split applying when project IRR falls in `[min_irr, max_irr)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallTier {
    pub min_irr: Rate,
    pub max_irr: Rate,
    pub lp_share: Rate,
    pub gp_share: Rate,
}

fn default_one() -> Rate {
    Decimal::ONE
}

fn default_catch_up_target() -> Rate {
    dec!(0.20)
}

/// Standalone waterfall over a known pool of distributable cash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallInput {
    /// Total equity contributed at closing
    pub equity: Money,
    /// Positive cash available to partners over the hold
    pub distributable: Money,
    pub hold_years: u32,
    /// Realized project IRR used for tier selection; `None` when undefined
    #[serde(default)]
    pub project_irr: Option<Rate>,
    pub structure: EquityStructure,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One auditable allocation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationStep {
    pub name: String,
    pub lp_amount: Money,
    pub gp_amount: Money,
    /// Cash left after this step
    pub remaining: Money,
}

impl AllocationStep {
    pub fn amount(&self) -> Money {
        self.lp_amount + self.gp_amount
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionResult {
    pub lp_total: Money,
    pub gp_total: Money,
    pub total_distributed: Money,
    pub lp_capital: Money,
    pub gp_capital: Money,
    pub steps: Vec<AllocationStep>,
    /// Index of the tier used for the residual split
    pub selected_tier: Option<usize>,
    pub lp_pct_of_total: Rate,
    pub gp_pct_of_total: Rate,
    /// GP distributions beyond its own capital and preferred return
    pub gp_promote: Money,
}

// ---------------------------------------------------------------------------
// Validation and tier selection
// ---------------------------------------------------------------------------

/// Report malformed terms. Never corrects them.
pub fn validate_structure(structure: &EquityStructure, diagnostics: &mut Diagnostics) {
    let split = structure.lp_share + structure.gp_share;
    if (split - Decimal::ONE).abs() > SHARE_TOLERANCE {
        diagnostics.validation(
            "equity.lp_share",
            format!("LP + GP shares sum to {split}, expected 1"),
        );
    }
    if structure.gp_coinvest_pct < Decimal::ZERO || structure.gp_coinvest_pct > Decimal::ONE {
        diagnostics.validation(
            "equity.gp_coinvest_pct",
            "GP co-investment must be between 0 and 1",
        );
    }

    let tiers = &structure.tiers;
    for (i, tier) in tiers.iter().enumerate() {
        let sum = tier.lp_share + tier.gp_share;
        if (sum - Decimal::ONE).abs() > SHARE_TOLERANCE {
            diagnostics.structural(
                "equity.tiers",
                format!("Tier {} shares sum to {sum}, expected 1", i + 1),
            );
        }
        if tier.min_irr >= tier.max_irr {
            diagnostics.structural(
                "equity.tiers",
                format!("Tier {} has an empty IRR range", i + 1),
            );
        }
    }
    for (i, pair) in tiers.windows(2).enumerate() {
        let (lower, upper) = (&pair[0], &pair[1]);
        if lower.max_irr < upper.min_irr {
            diagnostics.structural(
                "equity.tiers",
                format!("Gap between tier {} and tier {}", i + 1, i + 2),
            );
        } else if lower.max_irr > upper.min_irr {
            diagnostics.structural(
                "equity.tiers",
                format!("Tier {} overlaps tier {}", i + 1, i + 2),
            );
        }
        if upper.gp_share < lower.gp_share {
            diagnostics.validation(
                "equity.tiers",
                format!("GP share decreases from tier {} to tier {}", i + 1, i + 2),
            );
        }
    }
}

fn distance_to_tier(irr: Rate, tier: &WaterfallTier) -> Decimal {
    if irr < tier.min_irr {
        tier.min_irr - irr
    } else if irr >= tier.max_irr {
        irr - tier.max_irr
    } else {
        Decimal::ZERO
    }
}

/// Pick the tier whose half-open `[min, max)` range holds the project IRR.
///
/// IRR at or above the last tier's minimum falls back to the last tier. An
/// IRR below every tier uses the closest one and is reported.
pub fn select_tier(
    tiers: &[WaterfallTier],
    project_irr: IrrOutcome,
    diagnostics: &mut Diagnostics,
) -> Option<usize> {
    let last = tiers.len().checked_sub(1)?;

    let irr = match project_irr {
        IrrOutcome::Converged(r) => r,
        IrrOutcome::Unbounded => return Some(last),
        other => {
            diagnostics.structural(
                "equity.tiers",
                format!("Project IRR is undefined ({other:?}); first tier applied"),
            );
            return Some(0);
        }
    };

    if let Some(i) = tiers
        .iter()
        .position(|t| irr >= t.min_irr && irr < t.max_irr)
    {
        return Some(i);
    }
    if irr >= tiers[last].min_irr {
        return Some(last);
    }

    let closest = tiers
        .iter()
        .enumerate()
        .min_by_key(|(_, t)| distance_to_tier(irr, t))
        .map(|(i, _)| i)
        .unwrap_or(0);
    diagnostics.structural(
        "equity.tiers",
        format!(
            "No tier contains project IRR {irr}; closest tier {} applied",
            closest + 1
        ),
    );
    Some(closest)
}

// ---------------------------------------------------------------------------
// Distribution
// ---------------------------------------------------------------------------

/// Capital contributed by each partner: GP funds its share times its
/// co-investment fraction, LP funds the rest.
pub fn partner_capital(equity: Money, structure: &EquityStructure) -> (Money, Money) {
    let gp_capital = (equity * structure.gp_share * structure.gp_coinvest_pct).max(Decimal::ZERO);
    let lp_capital = (equity - gp_capital).max(Decimal::ZERO);
    (lp_capital, gp_capital)
}

struct Ledger {
    remaining: Money,
    steps: Vec<AllocationStep>,
}

impl Ledger {
    fn record(&mut self, name: &str, lp_amount: Money, gp_amount: Money) {
        self.remaining -= lp_amount + gp_amount;
        self.steps.push(AllocationStep {
            name: name.to_string(),
            lp_amount,
            gp_amount,
            remaining: self.remaining,
        });
    }

    /// Pay up to `amount` to one partner, returning what was paid.
    fn pay(&mut self, name: &str, amount: Money, to_gp: bool) -> Money {
        let paid = self.remaining.min(amount.max(Decimal::ZERO));
        if to_gp {
            self.record(name, Decimal::ZERO, paid);
        } else {
            self.record(name, paid, Decimal::ZERO);
        }
        paid
    }
}

/// Accrued preferred return owed to each partner over the hold.
///
/// A claim that leaves the Decimal range is treated as unlimited, so the
/// pref absorbs all remaining cash, and recorded as a degeneracy.
fn preferred_claims(
    lp_capital: Money,
    gp_capital: Money,
    hold_years: u32,
    structure: &EquityStructure,
    diagnostics: &mut Diagnostics,
) -> (Money, Money) {
    let factor = checked_compound_factor(structure.preferred_return, hold_years);
    let mut overflowed = false;
    let mut claim = |capital: Money| {
        if capital.is_zero() {
            return Decimal::ZERO;
        }
        match factor.and_then(|f| capital.checked_mul(f - Decimal::ONE)) {
            Some(amount) => amount,
            None => {
                overflowed = true;
                Decimal::MAX
            }
        }
    };
    let claims = (claim(lp_capital), claim(gp_capital));
    if overflowed {
        diagnostics.degenerate(
            "equity.preferred_return",
            format!(
                "Preferred return of {} compounded over {hold_years} years exceeds the numeric range; \
                 treated as unlimited",
                structure.preferred_return
            ),
        );
    }
    claims
}

/// Run the ordered waterfall over `distributable`.
///
/// Every step records both partner amounts; the steps always sum to the
/// distributable amount exactly because each split assigns LP the step
/// amount minus the GP amount.
pub fn distribute(
    equity: Money,
    distributable: Money,
    hold_years: u32,
    structure: &EquityStructure,
    project_irr: IrrOutcome,
    diagnostics: &mut Diagnostics,
) -> DistributionResult {
    validate_structure(structure, diagnostics);

    let total = if distributable < Decimal::ZERO {
        diagnostics.validation(
            "distributable",
            format!("Negative distributable cash {distributable} treated as 0"),
        );
        Decimal::ZERO
    } else {
        distributable
    };

    let (lp_capital, gp_capital) = partner_capital(equity, structure);
    let mut ledger = Ledger {
        remaining: total,
        steps: Vec::with_capacity(6),
    };

    // 1. Return of capital
    ledger.pay("Return of LP Capital", lp_capital, false);
    let gp_roc = ledger.pay("Return of GP Capital", gp_capital, true);

    // 2. Compounded preferred return
    let (lp_pref_claim, gp_pref_claim) =
        preferred_claims(lp_capital, gp_capital, hold_years, structure, diagnostics);
    let lp_pref = ledger.pay("LP Preferred Return", lp_pref_claim, false);
    let gp_pref = ledger.pay("GP Preferred Return", gp_pref_claim, true);

    // 3. Catch-up
    let mut gp_catch_up = Decimal::ZERO;
    if structure.catch_up_enabled && ledger.remaining > Decimal::ZERO {
        let split = structure.catch_up_split;
        let target = structure.catch_up_target_promote;
        if split <= target {
            diagnostics.structural(
                "equity.catch_up_split",
                format!("Catch-up split {split} cannot reach target promote {target}; catch-up skipped"),
            );
        } else {
            let step = (target * (lp_pref + gp_pref) / (split - target)).min(ledger.remaining);
            gp_catch_up = step * split;
            ledger.record("GP Catch-Up", step - gp_catch_up, gp_catch_up);
        }
    }

    // 4. Residual by IRR tier
    let selected_tier = select_tier(&structure.tiers, project_irr, diagnostics);
    let residual = ledger.remaining;
    let (name, gp_residual) = match selected_tier {
        Some(i) => {
            let tier = &structure.tiers[i];
            (format!("Residual Split (Tier {})", i + 1), residual * tier.gp_share)
        }
        None => {
            diagnostics.structural(
                "equity.tiers",
                "No waterfall tiers; residual split by equity shares",
            );
            let gp_weight = div_or_zero(structure.gp_share, structure.lp_share + structure.gp_share);
            ("Residual Split (Equity Shares)".to_string(), residual * gp_weight)
        }
    };
    ledger.record(&name, residual - gp_residual, gp_residual);

    let lp_total: Money = ledger.steps.iter().map(|s| s.lp_amount).sum();
    let gp_total: Money = ledger.steps.iter().map(|s| s.gp_amount).sum();
    let total_distributed = lp_total + gp_total;

    tracing::debug!(%lp_total, %gp_total, ?selected_tier, "waterfall distributed");

    DistributionResult {
        lp_total,
        gp_total,
        total_distributed,
        lp_capital,
        gp_capital,
        steps: ledger.steps,
        selected_tier,
        lp_pct_of_total: div_or_zero(lp_total, total_distributed),
        gp_pct_of_total: div_or_zero(gp_total, total_distributed),
        gp_promote: gp_total - gp_roc - gp_pref,
    }
}

/// Standalone waterfall calculation.
pub fn calculate_waterfall(
    input: &WaterfallInput,
) -> ProformaResult<ComputationOutput<DistributionResult>> {
    let start = Instant::now();

    if input.structure.tiers.is_empty() {
        return Err(ProformaError::InvalidInput {
            field: "structure.tiers".into(),
            reason: "At least one waterfall tier is required".into(),
        });
    }
    if input.equity < Decimal::ZERO {
        return Err(ProformaError::InvalidInput {
            field: "equity".into(),
            reason: "Equity cannot be negative".into(),
        });
    }

    let mut diagnostics = Diagnostics::new();
    let irr = match input.project_irr {
        Some(r) => IrrOutcome::Converged(r),
        None => IrrOutcome::NoConvergence,
    };
    let result = distribute(
        input.equity,
        input.distributable,
        input.hold_years,
        &input.structure,
        irr,
        &mut diagnostics,
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "LP/GP Promote Waterfall (ROC, compounded pref, catch-up, IRR tiers)",
        &serde_json::json!({
            "equity": input.equity.to_string(),
            "distributable": input.distributable.to_string(),
            "hold_years": input.hold_years,
            "num_tiers": input.structure.tiers.len(),
        }),
        diagnostics.to_messages(),
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
