//! Battery technology parameters.
use super::check_in_range;
use anyhow::{Result, ensure};
use serde::Deserialize;

/// Battery technology parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TechnologySpecs {
    /// Cell chemistry, e.g. "LFP"
    pub chemistry: String,
    /// Round-trip efficiency, between 0.5 and 1.0
    pub round_trip_efficiency: f64,
    /// Annual fractional loss of usable energy capacity, between 0 and 0.10
    pub degradation_rate_annual: f64,
    /// Rated full cycles before end of life
    pub cycle_life: u32,
    /// Manufacturer warranty (years)
    pub warranty_years: u32,
    /// Project year in which the battery is augmented to restore capacity (1..N)
    pub augmentation_year: u32,
    /// Full cycles per day, between 0.1 and 3.0
    pub cycles_per_day: f64,
}

impl Default for TechnologySpecs {
    fn default() -> Self {
        Self {
            chemistry: "LFP".into(),
            round_trip_efficiency: 0.85,
            degradation_rate_annual: 0.025,
            cycle_life: 6000,
            warranty_years: 10,
            augmentation_year: 12,
            cycles_per_day: 1.0,
        }
    }
}

impl TechnologySpecs {
    /// Fraction of nameplate energy capacity available in a given year of operation (1-based)
    pub fn degradation_factor(&self, year_of_operation: u32) -> f64 {
        (1.0 - self.degradation_rate_annual).powi(year_of_operation.saturating_sub(1) as i32)
    }

    /// Energy discharged (MWh) by a battery of the given capacity in a given year of operation
    pub fn annual_discharge_mwh(&self, capacity_mwh: f64, year_of_operation: u32) -> f64 {
        capacity_mwh
            * self.cycles_per_day
            * 365.0
            * self.round_trip_efficiency
            * self.degradation_factor(year_of_operation)
    }

    /// Check that all values are within their valid ranges
    pub fn validate(&self) -> Result<()> {
        check_in_range("round_trip_efficiency", self.round_trip_efficiency, 0.5..=1.0)?;
        check_in_range(
            "degradation_rate_annual",
            self.degradation_rate_annual,
            0.0..=0.10,
        )?;
        check_in_range("cycles_per_day", self.cycles_per_day, 0.1..=3.0)?;
        ensure!(
            self.augmentation_year >= 1,
            "augmentation_year must be at least 1"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_annual_discharge() {
        let tech = TechnologySpecs::default();
        assert_approx_eq!(
            f64,
            tech.annual_discharge_mwh(400.0, 1),
            124_100.0,
            epsilon = 1e-6
        );
        assert_approx_eq!(
            f64,
            tech.annual_discharge_mwh(400.0, 3),
            124_100.0 * 0.975 * 0.975,
            epsilon = 1e-6
        );
    }

    #[rstest]
    #[case(0.5, true)]
    #[case(1.0, true)]
    #[case(0.49, false)]
    #[case(1.02, false)]
    fn test_round_trip_efficiency_range(#[case] rte: f64, #[case] valid: bool) {
        let tech = TechnologySpecs {
            round_trip_efficiency: rte,
            ..Default::default()
        };
        assert_eq!(tech.validate().is_ok(), valid);
    }

    #[test]
    fn test_invalid_degradation() {
        let tech = TechnologySpecs {
            degradation_rate_annual: 0.2,
            ..Default::default()
        };
        assert_error!(
            tech.validate(),
            "degradation_rate_annual must be between 0 and 0.1, got 0.2"
        );
    }

    #[test]
    fn test_invalid_cycles_per_day() {
        let tech = TechnologySpecs {
            cycles_per_day: 3.5,
            ..Default::default()
        };
        assert_error!(
            tech.validate(),
            "cycles_per_day must be between 0.1 and 3, got 3.5"
        );
    }
}
