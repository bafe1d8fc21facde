use proforma_core::compensation::waterfall::{
    calculate_waterfall, distribute, EquityStructure, WaterfallInput, WaterfallTier,
};
use proforma_core::time_value::IrrOutcome;
use proforma_core::{DiagnosticKind, Diagnostics};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Helpers
// ===========================================================================

fn three_tier_structure() -> EquityStructure {
    EquityStructure {
        lp_share: dec!(0.90),
        gp_share: dec!(0.10),
        preferred_return: dec!(0.08),
        gp_coinvest_pct: dec!(1),
        catch_up_enabled: true,
        catch_up_split: dec!(1),
        catch_up_target_promote: dec!(0.20),
        tiers: vec![
            WaterfallTier {
                min_irr: dec!(0),
                max_irr: dec!(0.12),
                lp_share: dec!(0.80),
                gp_share: dec!(0.20),
            },
            WaterfallTier {
                min_irr: dec!(0.12),
                max_irr: dec!(0.18),
                lp_share: dec!(0.70),
                gp_share: dec!(0.30),
            },
            WaterfallTier {
                min_irr: dec!(0.18),
                max_irr: dec!(1),
                lp_share: dec!(0.60),
                gp_share: dec!(0.40),
            },
        ],
    }
}

/// $20M project at 65% LTC: $7M of equity split 90/10.
fn standard_deal() -> WaterfallInput {
    WaterfallInput {
        equity: dec!(20000000) * (Decimal::ONE - dec!(0.65)),
        distributable: dec!(15000000),
        hold_years: 10,
        project_irr: Some(dec!(0.09)),
        structure: three_tier_structure(),
    }
}

// ===========================================================================
// Conservation
// ===========================================================================

#[test]
fn test_standard_deal_distributes_exactly_fifteen_million() {
    let out = calculate_waterfall(&standard_deal()).unwrap();
    let r = &out.result;

    assert_eq!(r.lp_capital, dec!(6300000));
    assert_eq!(r.gp_capital, dec!(700000));
    assert_eq!(r.steps[0].lp_amount, dec!(6300000));
    assert_eq!(r.steps[1].gp_amount, dec!(700000));
    assert!((r.lp_total + r.gp_total - dec!(15000000)).abs() < dec!(0.000001));
    assert!((r.lp_pct_of_total + r.gp_pct_of_total - Decimal::ONE).abs() < dec!(0.000001));
}

#[test]
fn test_conservation_across_cash_levels() {
    let structure = three_tier_structure();
    for distributable in [
        dec!(0),
        dec!(1000),
        dec!(6300000),
        dec!(7000000),
        dec!(12500000),
        dec!(40000000),
    ] {
        for irr in [dec!(0.05), dec!(0.15), dec!(0.25)] {
            let mut diags = Diagnostics::new();
            let r = distribute(
                dec!(7000000),
                distributable,
                10,
                &structure,
                IrrOutcome::Converged(irr),
                &mut diags,
            );
            let steps: Decimal = r.steps.iter().map(|s| s.amount()).sum();
            assert!((steps - distributable).abs() < dec!(0.000001));
            assert!((r.total_distributed - distributable).abs() < dec!(0.000001));
            assert!(r.steps.iter().all(|s| s.lp_amount >= Decimal::ZERO && s.gp_amount >= Decimal::ZERO));
        }
    }
}

// ===========================================================================
// Tier selection
// ===========================================================================

#[test]
fn test_every_irr_selects_exactly_one_tier() {
    let structure = three_tier_structure();
    let cases = [
        (dec!(0), Some(0)),
        (dec!(0.1199), Some(0)),
        (dec!(0.12), Some(1)),
        (dec!(0.18), Some(2)),
        (dec!(0.99), Some(2)),
        (dec!(3.5), Some(2)),
    ];
    for (irr, expected) in cases {
        let mut diags = Diagnostics::new();
        let r = distribute(
            dec!(1000000),
            dec!(3000000),
            5,
            &structure,
            IrrOutcome::Converged(irr),
            &mut diags,
        );
        assert_eq!(r.selected_tier, expected, "irr {irr}");
        assert!(!diags.has(DiagnosticKind::Structural), "irr {irr}");
    }
}

#[test]
fn test_undefined_irr_falls_back_with_warning() {
    let mut diags = Diagnostics::new();
    let r = distribute(
        dec!(1000000),
        dec!(500000),
        5,
        &three_tier_structure(),
        IrrOutcome::TotalLoss,
        &mut diags,
    );
    assert_eq!(r.selected_tier, Some(0));
    assert!(diags.has(DiagnosticKind::Structural));
    assert_eq!(r.lp_total + r.gp_total, dec!(500000));
}

#[test]
fn test_higher_tier_pays_gp_more() {
    let mut diags = Diagnostics::new();
    let low = distribute(
        dec!(1000000),
        dec!(4000000),
        5,
        &three_tier_structure(),
        IrrOutcome::Converged(dec!(0.10)),
        &mut diags,
    );
    let high = distribute(
        dec!(1000000),
        dec!(4000000),
        5,
        &three_tier_structure(),
        IrrOutcome::Converged(dec!(0.20)),
        &mut diags,
    );
    assert!(high.gp_total > low.gp_total);
    assert!(high.gp_promote > low.gp_promote);
}

#[test]
fn test_empty_tiers_rejected() {
    let mut input = standard_deal();
    input.structure.tiers.clear();
    assert!(calculate_waterfall(&input).is_err());
}
