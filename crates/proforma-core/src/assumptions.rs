//! Project assumptions: the immutable input to every stage of the engine.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::ProformaError;
use crate::types::{Money, Rate};
use crate::ProformaResult;

const MAX_HOLD_PERIOD_YEARS: u32 = 50;
const MAX_FOR_SALE_HORIZON_MONTHS: u32 = 600;

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAssumptions {
    #[serde(default)]
    pub project_name: String,
    /// Optional analysis start; when present every cash-flow year carries a
    /// calendar period-end date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    pub property: PropertyProfile,
    pub costs: CostAssumptions,
    pub financing: FinancingAssumptions,
    pub operations: OperatingAssumptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Office,
    Retail,
    Apartment,
    ForSale,
}

/// Archetype-specific size and revenue drivers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyProfile {
    Office(OfficeProfile),
    Retail(RetailProfile),
    Apartment(ApartmentProfile),
    ForSale(ForSaleProfile),
}

impl PropertyProfile {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyProfile::Office(_) => PropertyType::Office,
            PropertyProfile::Retail(_) => PropertyType::Retail,
            PropertyProfile::Apartment(_) => PropertyType::Apartment,
            PropertyProfile::ForSale(_) => PropertyType::ForSale,
        }
    }

    /// Gross building area used for hard-cost and per-SF soft-cost bases.
    pub fn building_area_sf(&self) -> Decimal {
        match self {
            PropertyProfile::Office(p) => p.building_gfa_sf,
            PropertyProfile::Retail(p) => p.building_gfa_sf,
            PropertyProfile::Apartment(p) => p.building_gfa_sf,
            PropertyProfile::ForSale(p) => p.avg_unit_sf * Decimal::from(p.units),
        }
    }

    /// Income-producing (or saleable) area.
    pub fn rentable_area_sf(&self) -> Decimal {
        match self {
            PropertyProfile::Office(p) => p.rentable_sf,
            PropertyProfile::Retail(p) => p.leasable_sf,
            PropertyProfile::Apartment(p) => p.net_rentable_sf(),
            PropertyProfile::ForSale(p) => p.avg_unit_sf * Decimal::from(p.units),
        }
    }

    /// Unit count for unit-based archetypes; `None` for office and retail.
    pub fn unit_count(&self) -> Option<u32> {
        match self {
            PropertyProfile::Apartment(p) => Some(p.total_units()),
            PropertyProfile::ForSale(p) => Some(p.units),
            _ => None,
        }
    }

    /// Tenant improvements are only carried by commercial archetypes.
    pub fn carries_tenant_improvements(&self) -> bool {
        matches!(self, PropertyProfile::Office(_) | PropertyProfile::Retail(_))
    }
}

// ---------------------------------------------------------------------------
// Archetypes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfficeProfile {
    pub building_gfa_sf: Decimal,
    pub rentable_sf: Decimal,
    /// Year-1 annual base rent per rentable SF
    pub base_rent_psf: Money,
    /// Rent bump applied at each step
    #[serde(default = "default_office_step_pct")]
    pub escalation_step_pct: Rate,
    /// Years between rent steps
    #[serde(default = "default_office_step_years")]
    pub escalation_step_years: u32,
    /// Year-1 operating expenses per rentable SF
    pub opex_psf: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking: Option<ParkingIncome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParkingIncome {
    pub spaces: u32,
    pub monthly_rate: Money,
    #[serde(default)]
    pub annual_growth: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetailProfile {
    pub building_gfa_sf: Decimal,
    pub leasable_sf: Decimal,
    pub base_rent_psf: Money,
    #[serde(default = "default_retail_escalation")]
    pub annual_escalation: Rate,
    pub opex_psf: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_rent: Option<PercentageRent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking: Option<ParkingIncome>,
}

/// Overage rent on tenant sales above a breakpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentageRent {
    /// Year-1 tenant sales per leasable SF
    pub tenant_sales_psf: Money,
    #[serde(default = "default_sales_growth")]
    pub sales_growth: Rate,
    pub rate: Rate,
    /// Explicit breakpoint per SF; the natural breakpoint
    /// (base rent / rate) is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakpoint_psf: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApartmentProfile {
    pub building_gfa_sf: Decimal,
    pub unit_mix: Vec<UnitType>,
    /// Share of expiring leases that renew
    #[serde(default = "default_renewal_share")]
    pub renewal_share: Rate,
    #[serde(default = "default_renewal_increase")]
    pub renewal_increase: Rate,
    #[serde(default = "default_new_lease_increase")]
    pub new_lease_increase: Rate,
    /// In-place rents below market, as a share of gross potential rent
    #[serde(default)]
    pub loss_to_lease_pct: Rate,
    #[serde(default)]
    pub other_income_per_unit_monthly: Money,
    /// Year-1 operating expenses per unit
    pub opex_per_unit: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitType {
    pub name: String,
    pub count: u32,
    pub avg_sf: Decimal,
    pub monthly_rent: Money,
}

impl ApartmentProfile {
    pub fn total_units(&self) -> u32 {
        self.unit_mix.iter().map(|u| u.count).sum()
    }

    pub fn net_rentable_sf(&self) -> Decimal {
        self.unit_mix
            .iter()
            .map(|u| u.avg_sf * Decimal::from(u.count))
            .sum()
    }

    /// Blended annual rent growth across renewals and new leases.
    pub fn blended_rent_growth(&self) -> Rate {
        self.renewal_share * self.renewal_increase
            + (Decimal::ONE - self.renewal_share) * self.new_lease_increase
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForSaleProfile {
    pub units: u32,
    pub avg_unit_sf: Decimal,
    pub avg_price_per_unit: Money,
    pub sales_pace_per_month: u32,
    #[serde(default)]
    pub monthly_price_escalation: Rate,
    /// Deposit collected at contract signing, as a share of price
    #[serde(default = "default_deposit_pct")]
    pub deposit_pct: Rate,
    #[serde(default = "default_construction_months")]
    pub construction_months: u32,
    #[serde(default = "default_sales_start_month")]
    pub sales_start_month: u32,
    #[serde(default = "default_horizon_months")]
    pub horizon_months: u32,
    #[serde(default = "default_commission_pct")]
    pub commission_pct: Rate,
    #[serde(default = "default_marketing_pct")]
    pub marketing_pct: Rate,
    #[serde(default = "default_closing_cost_pct")]
    pub closing_cost_pct: Rate,
    /// Phased inventory releases; all units release at the sales start
    /// month when empty
    #[serde(default)]
    pub release_phases: Vec<ReleasePhase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasePhase {
    pub release_month: u32,
    pub units: u32,
}

// ---------------------------------------------------------------------------
// Costs, financing, operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostAssumptions {
    pub land_cost: Money,
    /// Building hard cost per SF of gross area
    pub hard_cost_psf: Money,
    #[serde(default)]
    pub site_work: SiteWork,
    /// Tenant improvement allowance per rentable SF (office/retail)
    #[serde(default)]
    pub tenant_improvements_psf: Money,
    #[serde(default = "default_contingency_pct")]
    pub contingency_pct: Rate,
    #[serde(default)]
    pub soft_costs: Vec<SoftCostItem>,
    /// Developer fee on the cost subtotal excluding the fee itself
    #[serde(default)]
    pub developer_fee_pct: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum SiteWork {
    Total { amount: Money },
    /// Only valid for unit-based archetypes
    PerUnit { amount_per_unit: Money },
}

impl Default for SiteWork {
    fn default() -> Self {
        SiteWork::Total {
            amount: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftCostItem {
    pub name: String,
    #[serde(flatten)]
    pub basis: SoftCostBasis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum SoftCostBasis {
    /// Share of hard cost including contingency
    PercentOfHardCost { rate: Rate },
    /// Amount per SF of gross building area
    PerSquareFoot { amount: Money },
    Flat { amount: Money },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingAssumptions {
    /// Construction loan-to-cost
    pub construction_ltc: Rate,
    pub construction_rate: Rate,
    #[serde(default = "default_construction_term_months")]
    pub construction_term_months: u32,
    #[serde(default)]
    pub origination_fee_pct: Rate,
    /// Permanent loan-to-value on stabilized value; zero disables the takeout
    #[serde(default)]
    pub permanent_ltv: Rate,
    #[serde(default)]
    pub permanent_rate: Rate,
    #[serde(default = "default_amortization_years")]
    pub amortization_years: u32,
    #[serde(default)]
    pub interest_only_years: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatingAssumptions {
    pub hold_period_years: u32,
    #[serde(default = "default_vacancy_rate")]
    pub vacancy_rate: Rate,
    #[serde(default = "default_expense_growth")]
    pub expense_growth: Rate,
    /// Cap rate used to size the permanent loan on stabilized NOI
    pub market_cap_rate: Rate,
    pub exit_cap_rate: Rate,
    #[serde(default = "default_exit_cost_pct")]
    pub exit_cost_pct: Rate,
    #[serde(default = "default_discount_rate")]
    pub discount_rate: Rate,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_office_step_pct() -> Rate {
    dec!(0.03)
}
fn default_office_step_years() -> u32 {
    1
}
fn default_retail_escalation() -> Rate {
    dec!(0.025)
}
fn default_sales_growth() -> Rate {
    dec!(0.03)
}
fn default_renewal_share() -> Rate {
    dec!(0.50)
}
fn default_renewal_increase() -> Rate {
    dec!(0.03)
}
fn default_new_lease_increase() -> Rate {
    dec!(0.04)
}
fn default_deposit_pct() -> Rate {
    dec!(0.10)
}
fn default_construction_months() -> u32 {
    18
}
fn default_sales_start_month() -> u32 {
    1
}
fn default_horizon_months() -> u32 {
    60
}
fn default_commission_pct() -> Rate {
    dec!(0.05)
}
fn default_marketing_pct() -> Rate {
    dec!(0.01)
}
fn default_closing_cost_pct() -> Rate {
    dec!(0.01)
}
fn default_contingency_pct() -> Rate {
    dec!(0.05)
}
fn default_construction_term_months() -> u32 {
    24
}
fn default_amortization_years() -> u32 {
    30
}
fn default_vacancy_rate() -> Rate {
    dec!(0.05)
}
fn default_expense_growth() -> Rate {
    dec!(0.03)
}
fn default_exit_cost_pct() -> Rate {
    dec!(0.02)
}
fn default_discount_rate() -> Rate {
    dec!(0.10)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl ProjectAssumptions {
    /// Reject input shapes no computation can proceed from.
    pub fn validate_shape(&self) -> ProformaResult<()> {
        if let PropertyProfile::ForSale(p) = &self.property {
            if p.horizon_months == 0 || p.horizon_months > MAX_FOR_SALE_HORIZON_MONTHS {
                return Err(ProformaError::InvalidInput {
                    field: "property.horizon_months".into(),
                    reason: format!(
                        "Sales horizon must be between 1 and {MAX_FOR_SALE_HORIZON_MONTHS} months"
                    ),
                });
            }
            return Ok(());
        }

        if let PropertyProfile::Apartment(p) = &self.property {
            if p.unit_mix.is_empty() {
                return Err(ProformaError::InvalidInput {
                    field: "property.unit_mix".into(),
                    reason: "Apartment projects require at least one unit type".into(),
                });
            }
        }

        let hold = self.operations.hold_period_years;
        if hold == 0 || hold > MAX_HOLD_PERIOD_YEARS {
            return Err(ProformaError::InvalidInput {
                field: "operations.hold_period_years".into(),
                reason: format!("Hold period must be between 1 and {MAX_HOLD_PERIOD_YEARS} years"),
            });
        }

        Ok(())
    }

    /// Record warnings for assumptions outside market norms. Never fails.
    pub fn review(&self, diagnostics: &mut Diagnostics) {
        let fin = &self.financing;
        let ops = &self.operations;

        if fin.construction_ltc > dec!(0.85) {
            diagnostics.validation(
                "financing.construction_ltc",
                format!(
                    "LTC of {:.1}% is above typical construction lending (85%)",
                    fin.construction_ltc * dec!(100)
                ),
            );
        }
        if fin.construction_ltc < Decimal::ZERO || fin.construction_ltc > Decimal::ONE {
            diagnostics.validation(
                "financing.construction_ltc",
                "LTC outside [0, 100%]; loan amount will be clamped",
            );
        }
        if fin.permanent_ltv > dec!(0.80) {
            diagnostics.validation(
                "financing.permanent_ltv",
                format!(
                    "LTV of {:.1}% is above typical permanent lending (80%)",
                    fin.permanent_ltv * dec!(100)
                ),
            );
        }

        let is_for_sale = matches!(self.property, PropertyProfile::ForSale(_));
        if !is_for_sale {
            for (field, cap) in [
                ("operations.market_cap_rate", ops.market_cap_rate),
                ("operations.exit_cap_rate", ops.exit_cap_rate),
            ] {
                if cap < dec!(0.03) || cap > dec!(0.12) {
                    diagnostics.validation(
                        field,
                        format!("Cap rate {cap} is outside the typical 3%-12% range"),
                    );
                }
            }
        }

        if ops.vacancy_rate > dec!(0.15) {
            diagnostics.validation(
                "operations.vacancy_rate",
                format!(
                    "Vacancy rate of {:.1}% is above typical market norms (15%)",
                    ops.vacancy_rate * dec!(100)
                ),
            );
        }

        let gfa = self.property.building_area_sf();
        match &self.property {
            PropertyProfile::Office(p) if p.rentable_sf > p.building_gfa_sf => {
                diagnostics.validation(
                    "property.rentable_sf",
                    format!("Rentable SF {} exceeds building GFA {gfa}", p.rentable_sf),
                );
            }
            PropertyProfile::Retail(p) if p.leasable_sf > p.building_gfa_sf => {
                diagnostics.validation(
                    "property.leasable_sf",
                    format!("Leasable SF {} exceeds building GFA {gfa}", p.leasable_sf),
                );
            }
            PropertyProfile::Apartment(p) if p.net_rentable_sf() > p.building_gfa_sf => {
                diagnostics.validation(
                    "property.unit_mix",
                    format!(
                        "Unit SF x count ({}) exceeds building GFA {gfa}",
                        p.net_rentable_sf()
                    ),
                );
            }
            PropertyProfile::ForSale(p) => {
                if p.sales_pace_per_month == 0 {
                    diagnostics.validation(
                        "property.sales_pace_per_month",
                        "Sales pace is zero; no units will sell",
                    );
                }
                if p.deposit_pct < Decimal::ZERO || p.deposit_pct > Decimal::ONE {
                    diagnostics.validation(
                        "property.deposit_pct",
                        "Deposit share outside [0, 100%]",
                    );
                }
            }
            _ => {}
        }
    }
}
