//! Avoided cost trajectories for valuing storage from the ratepayer's perspective.
//!
//! Default values are from the E3 2024 Avoided Cost Calculator (v2a) for the SCE service
//! territory. Capacity-based components are valued per kW of storage and energy-based components
//! per MWh discharged.
use crate::project::{TechnologySpecs, check_non_negative};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Avoided generation capacity cost, declining as storage saturates the market
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationCapacityCost {
    /// Value in each year of the analysis ($/kW-year), starting with the first year
    pub values_per_kw_year: Vec<f64>,
    /// Calendar year of the first value
    pub start_year: u32,
}

impl Default for GenerationCapacityCost {
    fn default() -> Self {
        Self {
            values_per_kw_year: vec![
                89.48, 82.00, 75.00, 68.50, 62.50, 57.00, 52.00, 48.00, 44.50, 41.50, 39.50,
                39.00, 39.00, 39.00, 39.00, 39.00, 39.00, 39.00, 39.00, 39.00,
            ],
            start_year: 2026,
        }
    }
}

impl GenerationCapacityCost {
    /// Value ($/kW-year) for the given 0-based year index, clamped to the end of the table
    pub fn value(&self, year_index: usize) -> f64 {
        self.values_per_kw_year
            .get(year_index)
            .or(self.values_per_kw_year.last())
            .copied()
            .unwrap_or(0.0)
    }
}

/// A base value escalated geometrically each year
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EscalatingValue {
    /// Value in the first year
    pub base: f64,
    /// Annual escalation rate (negative for a decline)
    pub escalation: f64,
}

impl EscalatingValue {
    const fn new(base: f64, escalation: f64) -> Self {
        Self { base, escalation }
    }

    /// Value for the given 0-based year index
    pub fn value(&self, year_index: usize) -> f64 {
        self.base * (1.0 + self.escalation).powi(year_index as i32)
    }
}

/// Avoided energy cost by time-of-use period ($/MWh)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnergyValue {
    /// On-peak energy cost
    pub on_peak_per_mwh: f64,
    /// Off-peak energy cost
    pub off_peak_per_mwh: f64,
    /// Super off-peak energy cost
    pub super_off_peak_per_mwh: f64,
    /// Average across time-of-use periods, weighted by storage discharge
    pub weighted_average_per_mwh: f64,
    /// Annual escalation rate
    pub escalation_rate: f64,
}

impl Default for EnergyValue {
    fn default() -> Self {
        Self {
            on_peak_per_mwh: 85.0,
            off_peak_per_mwh: 35.0,
            super_off_peak_per_mwh: 15.0,
            weighted_average_per_mwh: 55.0,
            escalation_rate: 0.025,
        }
    }
}

impl EnergyValue {
    /// Spread between charging off-peak and discharging on-peak ($/MWh)
    pub fn arbitrage_spread(&self) -> f64 {
        self.on_peak_per_mwh - self.off_peak_per_mwh
    }

    /// Weighted average value ($/MWh) for the given 0-based year index
    pub fn value(&self, year_index: usize) -> f64 {
        EscalatingValue::new(self.weighted_average_per_mwh, self.escalation_rate).value(year_index)
    }
}

/// The complete set of avoided cost trajectories
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AvoidedCosts {
    /// Generation capacity ($/kW-year)
    pub generation_capacity: GenerationCapacityCost,
    /// Distribution capacity ($/kW-year), only counted for projects deferring distribution upgrades
    pub distribution_capacity: EscalatingValue,
    /// Energy value ($/MWh)
    pub energy_value: EnergyValue,
    /// GHG value ($/ton CO2e)
    pub ghg_value_per_ton: EscalatingValue,
    /// Grid emissions displaced (tons CO2e/MWh)
    pub ghg_emission_factor: f64,
    /// Ancillary services ($/kW-year)
    pub ancillary: EscalatingValue,
    /// Transmission deferral ($/kW-year)
    pub transmission: EscalatingValue,
}

impl Default for AvoidedCosts {
    fn default() -> Self {
        Self {
            generation_capacity: GenerationCapacityCost::default(),
            distribution_capacity: EscalatingValue::new(77.30, 0.02),
            energy_value: EnergyValue::default(),
            ghg_value_per_ton: EscalatingValue::new(52.0, 0.03),
            ghg_emission_factor: 0.35,
            ancillary: EscalatingValue::new(10.0, 0.01),
            transmission: EscalatingValue::new(25.0, 0.015),
        }
    }
}

/// Avoided costs in a single year, split by component ($)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvoidedCostComponents {
    /// Year of the analysis (1-based)
    pub year: u32,
    /// Energy discharged in the year (MWh)
    pub discharge_mwh: f64,
    /// Avoided generation capacity
    pub generation_capacity: f64,
    /// Avoided distribution capacity
    pub distribution_capacity: f64,
    /// Avoided energy
    pub energy: f64,
    /// Avoided GHG emissions
    pub ghg: f64,
    /// Ancillary services
    pub ancillary: f64,
    /// Avoided transmission
    pub transmission: f64,
    /// Sum of all components
    pub total: f64,
}

impl AvoidedCosts {
    /// Avoided costs for a single year, by component.
    ///
    /// # Arguments
    ///
    /// * `capacity_kw` - Power capacity of the project
    /// * `discharge_mwh` - Energy discharged in the year
    /// * `year_index` - 0-based year of the analysis
    /// * `include_distribution` - Whether the project defers distribution infrastructure
    pub fn components(
        &self,
        capacity_kw: f64,
        discharge_mwh: f64,
        year_index: usize,
        include_distribution: bool,
    ) -> AvoidedCostComponents {
        let generation_capacity = self.generation_capacity.value(year_index) * capacity_kw;
        let distribution_capacity = if include_distribution {
            self.distribution_capacity.value(year_index) * capacity_kw
        } else {
            0.0
        };
        let energy = self.energy_value.value(year_index) * discharge_mwh;
        let ghg =
            self.ghg_value_per_ton.value(year_index) * self.ghg_emission_factor * discharge_mwh;
        let ancillary = self.ancillary.value(year_index) * capacity_kw;
        let transmission = self.transmission.value(year_index) * capacity_kw;

        AvoidedCostComponents {
            year: year_index as u32 + 1,
            discharge_mwh,
            generation_capacity,
            distribution_capacity,
            energy,
            ghg,
            ancillary,
            transmission,
            total: generation_capacity
                + distribution_capacity
                + energy
                + ghg
                + ancillary
                + transmission,
        }
    }

    /// Total avoided cost ($) for a single year
    pub fn annual_avoided_cost(
        &self,
        capacity_kw: f64,
        discharge_mwh: f64,
        year_index: usize,
        include_distribution: bool,
    ) -> f64 {
        self.components(capacity_kw, discharge_mwh, year_index, include_distribution)
            .total
    }

    /// Avoided costs for each year of the analysis, with discharge reduced by degradation
    pub fn lifetime_trajectory(
        &self,
        capacity_kw: f64,
        capacity_mwh: f64,
        technology: &TechnologySpecs,
        years: u32,
        include_distribution: bool,
    ) -> Vec<AvoidedCostComponents> {
        (0..years)
            .map(|year_index| {
                let discharge = technology.annual_discharge_mwh(capacity_mwh, year_index + 1);
                self.components(
                    capacity_kw,
                    discharge,
                    year_index as usize,
                    include_distribution,
                )
            })
            .collect()
    }

    /// Check that base values are non-negative
    pub fn validate(&self) -> Result<()> {
        for (idx, &value) in self.generation_capacity.values_per_kw_year.iter().enumerate() {
            check_non_negative("generation_capacity value", value).with_context(|| {
                format!("Invalid generation capacity value for year {}", idx + 1)
            })?;
        }
        for (name, value) in [
            ("distribution_capacity.base", self.distribution_capacity.base),
            ("energy_value.weighted_average_per_mwh", self.energy_value.weighted_average_per_mwh),
            ("ghg_value_per_ton.base", self.ghg_value_per_ton.base),
            ("ghg_emission_factor", self.ghg_emission_factor),
            ("ancillary.base", self.ancillary.base),
            ("transmission.base", self.transmission.base),
        ] {
            check_non_negative(name, value)?;
        }

        Ok(())
    }
}
