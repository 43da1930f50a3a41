//! Benefit streams and formula-based special benefits.
use super::{check_in_range, check_non_negative};
use anyhow::{Result, ensure};
use serde::Deserialize;

/// Category name for the reliability special benefit
pub const RELIABILITY_BENEFIT_NAME: &str = "Reliability (Avoided Outage)";

/// Category name for the safety special benefit
pub const SAFETY_BENEFIT_NAME: &str = "Safety (Avoided Incident)";

/// Category name for the speed-to-serve special benefit
pub const SPEED_BENEFIT_NAME: &str = "Speed-to-Serve (One-time)";

/// A named stream of annual benefits
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BenefitStream {
    /// Category name, unique within a project
    pub name: String,
    /// Benefit in each year of operation ($/yr); index 0 is year 1
    pub annual_values: Vec<f64>,
    /// Free-text description
    pub description: String,
    /// Where the values come from
    pub data_source: String,
    /// Citation for the data source
    pub citation: String,
}

impl BenefitStream {
    /// Create a stream which starts at `value_per_kw_year × capacity_kw` and escalates annually
    pub fn escalating(
        name: &str,
        value_per_kw_year: f64,
        escalation: f64,
        capacity_kw: f64,
        years: u32,
    ) -> Self {
        let annual_values = (0..years)
            .map(|idx| value_per_kw_year * capacity_kw * (1.0 + escalation).powi(idx as i32))
            .collect();

        Self {
            name: name.to_string(),
            annual_values,
            ..Default::default()
        }
    }

    /// Check that the stream is usable
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.name.trim().is_empty(),
            "Benefit stream name cannot be empty"
        );
        ensure!(
            self.annual_values.iter().all(|value| value.is_finite()),
            "Benefit stream '{}' contains non-finite values",
            self.name
        );

        Ok(())
    }
}

/// Benefits calculated from formulas rather than given as annual values.
///
/// Each of the three benefits is enabled independently.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecialBenefitInputs {
    /// Whether to include avoided customer outage costs
    pub reliability_enabled: bool,
    /// Expected outage hours per year that the battery can cover
    pub outage_hours_per_year: f64,
    /// Customer cost of unserved energy ($/kWh)
    pub customer_cost_per_kwh: f64,
    /// Share of energy capacity reserved for backup, between 0 and 1
    pub backup_capacity_pct: f64,
    /// Whether to include avoided safety incidents
    pub safety_enabled: bool,
    /// Annual probability of the incident being avoided, between 0 and 1
    pub incident_probability: f64,
    /// Cost of one incident ($) for a 100 MW installation
    pub incident_cost: f64,
    /// Fraction by which the battery reduces incident risk, between 0 and 1
    pub risk_reduction_factor: f64,
    /// Whether to include the one-off value of faster interconnection
    pub speed_enabled: bool,
    /// Months saved compared with the alternative
    pub speed_months_saved: f64,
    /// Value of each month saved ($/kW-month)
    pub speed_value_per_kw_month: f64,
}

impl Default for SpecialBenefitInputs {
    fn default() -> Self {
        Self {
            reliability_enabled: false,
            outage_hours_per_year: 4.0,
            customer_cost_per_kwh: 10.0,
            backup_capacity_pct: 0.5,
            safety_enabled: false,
            incident_probability: 0.01,
            incident_cost: 5_000_000.0,
            risk_reduction_factor: 0.5,
            speed_enabled: false,
            speed_months_saved: 12.0,
            speed_value_per_kw_month: 5.0,
        }
    }
}

impl SpecialBenefitInputs {
    /// Reliability benefit in the first year of operation ($/yr)
    pub fn reliability_annual(&self, capacity_mwh: f64) -> f64 {
        if !self.reliability_enabled {
            return 0.0;
        }

        self.outage_hours_per_year
            * self.customer_cost_per_kwh
            * capacity_mwh
            * 1000.0
            * self.backup_capacity_pct
    }

    /// Safety benefit, the same in every year ($/yr)
    pub fn safety_annual(&self, capacity_mw: f64) -> f64 {
        if !self.safety_enabled {
            return 0.0;
        }

        self.incident_probability * self.incident_cost * self.risk_reduction_factor
            * (capacity_mw / 100.0)
    }

    /// Speed-to-serve benefit, received once in year 1 ($)
    pub fn speed_one_time(&self, capacity_kw: f64) -> f64 {
        if !self.speed_enabled {
            return 0.0;
        }

        self.speed_months_saved * self.speed_value_per_kw_month * capacity_kw
    }

    /// Check that all values are within their valid ranges
    pub fn validate(&self) -> Result<()> {
        check_non_negative("outage_hours_per_year", self.outage_hours_per_year)?;
        check_non_negative("customer_cost_per_kwh", self.customer_cost_per_kwh)?;
        check_in_range("backup_capacity_pct", self.backup_capacity_pct, 0.0..=1.0)?;
        check_in_range("incident_probability", self.incident_probability, 0.0..=1.0)?;
        check_non_negative("incident_cost", self.incident_cost)?;
        check_in_range(
            "risk_reduction_factor",
            self.risk_reduction_factor,
            0.0..=1.0,
        )?;
        check_non_negative("speed_months_saved", self.speed_months_saved)?;
        check_non_negative("speed_value_per_kw_month", self.speed_value_per_kw_month)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_escalating() {
        let stream = BenefitStream::escalating("RA", 100.0, 0.02, 1000.0, 3);
        assert_eq!(stream.name, "RA");
        assert_eq!(stream.annual_values.len(), 3);
        assert_approx_eq!(f64, stream.annual_values[0], 100_000.0);
        assert_approx_eq!(f64, stream.annual_values[2], 100_000.0 * 1.02 * 1.02, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_name() {
        let stream = BenefitStream {
            name: " ".into(),
            ..Default::default()
        };
        assert_error!(stream.validate(), "Benefit stream name cannot be empty");
    }

    #[test]
    fn test_special_benefit_formulas() {
        let special = SpecialBenefitInputs {
            reliability_enabled: true,
            safety_enabled: true,
            speed_enabled: true,
            ..Default::default()
        };

        // 4 h * $10/kWh * 400,000 kWh * 0.5
        assert_approx_eq!(f64, special.reliability_annual(400.0), 8_000_000.0);
        // 0.01 * $5M * 0.5 * (100 MW / 100)
        assert_approx_eq!(f64, special.safety_annual(100.0), 25_000.0, epsilon = 1e-9);
        // 12 months * $5/kW-month * 100,000 kW
        assert_approx_eq!(f64, special.speed_one_time(100_000.0), 6_000_000.0);
    }

    #[test]
    fn test_disabled_special_benefits_are_zero() {
        let special = SpecialBenefitInputs::default();
        assert_eq!(special.reliability_annual(400.0), 0.0);
        assert_eq!(special.safety_annual(100.0), 0.0);
        assert_eq!(special.speed_one_time(100_000.0), 0.0);
    }

    #[test]
    fn test_invalid_backup_pct() {
        let special = SpecialBenefitInputs {
            backup_capacity_pct: 1.5,
            ..Default::default()
        };
        assert_error!(
            special.validate(),
            "backup_capacity_pct must be between 0 and 1, got 1.5"
        );
    }
}
