//! Inputs for the utility-owned storage analysis.
use super::{check_in_range, check_non_negative};
use crate::avoided_cost::AvoidedCosts;
use crate::rate_base::{CostOfCapital, MacrsClass};
use crate::sod::{DEFAULT_LOAD_SHAPE, HOURS_PER_DAY};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Regulatory and comparison parameters for a utility-owned project
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UtilityOwnershipInputs {
    /// Authorised cost of capital
    pub cost_of_capital: CostOfCapital,
    /// Avoided cost trajectories used to value the project for ratepayers
    pub avoided_costs: AvoidedCosts,
    /// Book life of the storage asset (years)
    pub book_life_years: u32,
    /// Tax depreciation class of the storage asset
    pub macrs_class: MacrsClass,
    /// Share of the tax basis expensed in year 1
    pub bonus_depreciation_pct: f64,
    /// Capital cost of the traditional wires solution ($/kW)
    pub wires_cost_per_kw: f64,
    /// Book life of the wires asset (years)
    pub wires_book_life_years: u32,
    /// Lead time to build the wires solution (years)
    pub wires_lead_time_years: u32,
    /// Years by which storage defers the wires investment
    pub nwa_deferral_years: u32,
    /// Whether only revenue requirement above avoided costs counts against storage
    pub nwa_incrementality: bool,
    /// Minimum qualifying hours for Slice-of-Day capacity
    pub sod_min_hours: u32,
    /// Capacity factor at or above which an hour is a demand hour
    pub sod_deration_threshold: f64,
    /// Demand by hour as a fraction of nameplate power, for hours 0-23
    pub load_shape: Vec<f64>,
}

impl Default for UtilityOwnershipInputs {
    fn default() -> Self {
        Self {
            cost_of_capital: CostOfCapital::default(),
            avoided_costs: AvoidedCosts::default(),
            book_life_years: 20,
            macrs_class: MacrsClass::SevenYear,
            bonus_depreciation_pct: 0.0,
            wires_cost_per_kw: 500.0,
            wires_book_life_years: 40,
            wires_lead_time_years: 5,
            nwa_deferral_years: 5,
            nwa_incrementality: true,
            sod_min_hours: 4,
            sod_deration_threshold: 0.5,
            load_shape: DEFAULT_LOAD_SHAPE.to_vec(),
        }
    }
}

impl UtilityOwnershipInputs {
    /// Check that all values are within their valid ranges
    pub fn validate(&self) -> Result<()> {
        self.cost_of_capital
            .validate()
            .context("Invalid cost of capital")?;
        self.avoided_costs
            .validate()
            .context("Invalid avoided costs")?;
        ensure!(self.book_life_years >= 1, "book_life_years must be at least 1");
        ensure!(
            self.wires_book_life_years >= 1,
            "wires_book_life_years must be at least 1"
        );
        check_in_range(
            "bonus_depreciation_pct",
            self.bonus_depreciation_pct,
            0.0..=1.0,
        )?;
        check_non_negative("wires_cost_per_kw", self.wires_cost_per_kw)?;
        ensure!(
            (1..=24).contains(&self.sod_min_hours),
            "sod_min_hours must be between 1 and 24, got {}",
            self.sod_min_hours
        );
        check_in_range(
            "sod_deration_threshold",
            self.sod_deration_threshold,
            0.0..=1.0,
        )?;
        ensure!(
            self.load_shape.len() == HOURS_PER_DAY,
            "Load shape must have exactly {HOURS_PER_DAY} hourly values, got {}",
            self.load_shape.len()
        );
        for (hour, &factor) in self.load_shape.iter().enumerate() {
            check_in_range("capacity factor", factor, 0.0..=1.0)
                .with_context(|| format!("Invalid load shape value for hour {hour}"))?;
        }

        Ok(())
    }
}
