//! Shared assumption sets for unit tests.

use rust_decimal_macros::dec;

use crate::assumptions::*;

fn base_financing() -> FinancingAssumptions {
    FinancingAssumptions {
        construction_ltc: dec!(0.65),
        construction_rate: dec!(0.07),
        construction_term_months: 24,
        origination_fee_pct: dec!(0.01),
        permanent_ltv: dec!(0.65),
        permanent_rate: dec!(0.06),
        amortization_years: 30,
        interest_only_years: 0,
    }
}

fn base_operations() -> OperatingAssumptions {
    OperatingAssumptions {
        hold_period_years: 10,
        vacancy_rate: dec!(0.05),
        expense_growth: dec!(0.03),
        market_cap_rate: dec!(0.06),
        exit_cap_rate: dec!(0.065),
        exit_cost_pct: dec!(0.02),
        discount_rate: dec!(0.10),
    }
}

pub(crate) fn office_assumptions() -> ProjectAssumptions {
    ProjectAssumptions {
        project_name: "Test Office".into(),
        start_date: None,
        property: PropertyProfile::Office(OfficeProfile {
            building_gfa_sf: dec!(100000),
            rentable_sf: dec!(90000),
            base_rent_psf: dec!(40),
            escalation_step_pct: dec!(0.03),
            escalation_step_years: 1,
            opex_psf: dec!(12),
            parking: None,
        }),
        costs: CostAssumptions {
            land_cost: dec!(5000000),
            hard_cost_psf: dec!(300),
            site_work: SiteWork::Total {
                amount: dec!(1000000),
            },
            tenant_improvements_psf: dec!(50),
            contingency_pct: dec!(0.05),
            soft_costs: vec![
                SoftCostItem {
                    name: "Architecture".into(),
                    basis: SoftCostBasis::PercentOfHardCost { rate: dec!(0.06) },
                },
                SoftCostItem {
                    name: "Permits".into(),
                    basis: SoftCostBasis::PerSquareFoot { amount: dec!(4) },
                },
                SoftCostItem {
                    name: "Legal".into(),
                    basis: SoftCostBasis::Flat {
                        amount: dec!(250000),
                    },
                },
            ],
            developer_fee_pct: dec!(0.04),
        },
        financing: base_financing(),
        operations: base_operations(),
    }
}

pub(crate) fn retail_assumptions() -> ProjectAssumptions {
    ProjectAssumptions {
        project_name: "Test Retail".into(),
        start_date: None,
        property: PropertyProfile::Retail(RetailProfile {
            building_gfa_sf: dec!(50000),
            leasable_sf: dec!(45000),
            base_rent_psf: dec!(30),
            annual_escalation: dec!(0.025),
            opex_psf: dec!(8),
            percentage_rent: Some(PercentageRent {
                tenant_sales_psf: dec!(500),
                sales_growth: dec!(0.03),
                rate: dec!(0.06),
                breakpoint_psf: None,
            }),
            parking: None,
        }),
        costs: CostAssumptions {
            land_cost: dec!(3000000),
            hard_cost_psf: dec!(200),
            site_work: SiteWork::Total {
                amount: dec!(500000),
            },
            tenant_improvements_psf: dec!(20),
            contingency_pct: dec!(0.05),
            soft_costs: vec![SoftCostItem {
                name: "Architecture".into(),
                basis: SoftCostBasis::PercentOfHardCost { rate: dec!(0.05) },
            }],
            developer_fee_pct: dec!(0.03),
        },
        financing: base_financing(),
        operations: base_operations(),
    }
}

pub(crate) fn apartment_assumptions() -> ProjectAssumptions {
    ProjectAssumptions {
        project_name: "Test Apartments".into(),
        start_date: None,
        property: PropertyProfile::Apartment(ApartmentProfile {
            building_gfa_sf: dec!(120000),
            unit_mix: vec![
                UnitType {
                    name: "1BR".into(),
                    count: 80,
                    avg_sf: dec!(700),
                    monthly_rent: dec!(1800),
                },
                UnitType {
                    name: "2BR".into(),
                    count: 40,
                    avg_sf: dec!(1000),
                    monthly_rent: dec!(2500),
                },
            ],
            renewal_share: dec!(0.5),
            renewal_increase: dec!(0.03),
            new_lease_increase: dec!(0.05),
            loss_to_lease_pct: dec!(0.02),
            other_income_per_unit_monthly: dec!(50),
            opex_per_unit: dec!(7000),
        }),
        costs: CostAssumptions {
            land_cost: dec!(4000000),
            hard_cost_psf: dec!(180),
            site_work: SiteWork::PerUnit {
                amount_per_unit: dec!(10000),
            },
            tenant_improvements_psf: dec!(0),
            contingency_pct: dec!(0.05),
            soft_costs: vec![SoftCostItem {
                name: "Architecture".into(),
                basis: SoftCostBasis::PercentOfHardCost { rate: dec!(0.05) },
            }],
            developer_fee_pct: dec!(0.03),
        },
        financing: base_financing(),
        operations: OperatingAssumptions {
            market_cap_rate: dec!(0.05),
            exit_cap_rate: dec!(0.055),
            ..base_operations()
        },
    }
}

pub(crate) fn for_sale_assumptions() -> ProjectAssumptions {
    ProjectAssumptions {
        project_name: "Test Condos".into(),
        start_date: None,
        property: PropertyProfile::ForSale(ForSaleProfile {
            units: 100,
            avg_unit_sf: dec!(1000),
            avg_price_per_unit: dec!(750000),
            sales_pace_per_month: 5,
            monthly_price_escalation: dec!(0),
            deposit_pct: dec!(0.10),
            construction_months: 18,
            sales_start_month: 1,
            horizon_months: 60,
            commission_pct: dec!(0.05),
            marketing_pct: dec!(0.01),
            closing_cost_pct: dec!(0.01),
            release_phases: vec![],
        }),
        costs: CostAssumptions {
            land_cost: dec!(8000000),
            hard_cost_psf: dec!(350),
            site_work: SiteWork::PerUnit {
                amount_per_unit: dec!(15000),
            },
            tenant_improvements_psf: dec!(0),
            contingency_pct: dec!(0.05),
            soft_costs: vec![SoftCostItem {
                name: "Architecture".into(),
                basis: SoftCostBasis::PercentOfHardCost { rate: dec!(0.06) },
            }],
            developer_fee_pct: dec!(0.03),
        },
        financing: FinancingAssumptions {
            construction_term_months: 18,
            permanent_ltv: dec!(0),
            ..base_financing()
        },
        operations: base_operations(),
    }
}
