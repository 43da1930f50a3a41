//! Capital and operating cost inputs.
use super::{check_in_range, check_non_negative};
use anyhow::Result;
use serde::Deserialize;

/// Capital and operating costs
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostInputs {
    /// Battery capital cost ($/kWh)
    pub capex_per_kwh: f64,
    /// Fixed O&M ($/kW-year)
    pub fom_per_kw_year: f64,
    /// Variable O&M ($/MWh discharged)
    pub vom_per_mwh: f64,
    /// Augmentation cost in the cost base year ($/kWh)
    pub augmentation_per_kwh: f64,
    /// End-of-life decommissioning ($/kW)
    pub decommissioning_per_kw: f64,
    /// Annual decline in battery costs, between 0 and 0.30
    pub learning_rate: f64,
    /// Calendar year in which the per-unit costs are quoted
    pub cost_base_year: u32,
    /// Base investment tax credit, between 0 and 0.50
    pub itc_percent: f64,
    /// ITC adders (energy community, domestic content), between 0 and 0.20
    pub itc_adders: f64,
    /// Interconnection and network upgrades ($/kW)
    pub interconnection_per_kw: f64,
    /// Site acquisition ($/kW)
    pub land_per_kw: f64,
    /// Permits and environmental review ($/kW)
    pub permitting_per_kw: f64,
    /// Annual insurance as a fraction of battery CapEx
    pub insurance_pct_of_capex: f64,
    /// Annual property tax as a fraction of remaining book value
    pub property_tax_pct: f64,
    /// Cost of charging energy ($/MWh)
    pub charging_cost_per_mwh: f64,
    /// Residual value at the end of the analysis as a fraction of CapEx, between 0 and 0.50
    pub residual_value_pct: f64,
    /// Discount on fleet purchases, between 0 and 0.30
    pub bulk_discount_rate: f64,
    /// Minimum energy capacity (MWh) for the bulk discount to apply
    pub bulk_discount_threshold_mwh: f64,
}

impl Default for CostInputs {
    fn default() -> Self {
        Self {
            capex_per_kwh: 160.0,
            fom_per_kw_year: 25.0,
            vom_per_mwh: 0.0,
            augmentation_per_kwh: 55.0,
            decommissioning_per_kw: 10.0,
            learning_rate: 0.10,
            cost_base_year: 2024,
            itc_percent: 0.30,
            itc_adders: 0.0,
            interconnection_per_kw: 100.0,
            land_per_kw: 10.0,
            permitting_per_kw: 15.0,
            insurance_pct_of_capex: 0.005,
            property_tax_pct: 0.01,
            charging_cost_per_mwh: 30.0,
            residual_value_pct: 0.10,
            bulk_discount_rate: 0.0,
            bulk_discount_threshold_mwh: 0.0,
        }
    }
}

impl CostInputs {
    /// Total ITC rate including adders
    pub fn total_itc_rate(&self) -> f64 {
        self.itc_percent + self.itc_adders
    }

    /// Interconnection, land and permitting costs ($/kW)
    pub fn infrastructure_per_kw(&self) -> f64 {
        self.interconnection_per_kw + self.land_per_kw + self.permitting_per_kw
    }

    /// Learning-curve multiplier after the given number of years
    fn learning_factor(&self, years: i64) -> f64 {
        (1.0 - self.learning_rate).powi(years.max(0) as i32)
    }

    /// Augmentation cost ($/kWh) after `years` years of cost decline
    pub fn augmentation_cost_after(&self, years: u32) -> f64 {
        self.augmentation_per_kwh * self.learning_factor(years as i64)
    }

    /// Battery CapEx ($/kWh) for capacity bought in the given calendar year
    pub fn capex_in_year(&self, year: u32) -> f64 {
        self.capex_per_kwh * self.learning_factor(year as i64 - self.cost_base_year as i64)
    }

    /// Multiplier applied to capital and fixed costs for a project of the given energy capacity
    pub fn bulk_discount_multiplier(&self, capacity_mwh: f64) -> f64 {
        if self.bulk_discount_rate > 0.0 && capacity_mwh >= self.bulk_discount_threshold_mwh {
            1.0 - self.bulk_discount_rate
        } else {
            1.0
        }
    }

    /// Check that all values are within their valid ranges
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("capex_per_kwh", self.capex_per_kwh),
            ("fom_per_kw_year", self.fom_per_kw_year),
            ("vom_per_mwh", self.vom_per_mwh),
            ("augmentation_per_kwh", self.augmentation_per_kwh),
            ("decommissioning_per_kw", self.decommissioning_per_kw),
            ("interconnection_per_kw", self.interconnection_per_kw),
            ("land_per_kw", self.land_per_kw),
            ("permitting_per_kw", self.permitting_per_kw),
            ("charging_cost_per_mwh", self.charging_cost_per_mwh),
            ("bulk_discount_threshold_mwh", self.bulk_discount_threshold_mwh),
        ] {
            check_non_negative(name, value)?;
        }

        check_in_range("learning_rate", self.learning_rate, 0.0..=0.30)?;
        check_in_range("itc_percent", self.itc_percent, 0.0..=0.50)?;
        check_in_range("itc_adders", self.itc_adders, 0.0..=0.20)?;
        check_in_range("insurance_pct_of_capex", self.insurance_pct_of_capex, 0.0..=0.10)?;
        check_in_range("property_tax_pct", self.property_tax_pct, 0.0..=0.10)?;
        check_in_range("residual_value_pct", self.residual_value_pct, 0.0..=0.50)?;
        check_in_range("bulk_discount_rate", self.bulk_discount_rate, 0.0..=0.30)?;

        Ok(())
    }
}
