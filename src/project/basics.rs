//! Project identification, sizing and analysis horizon.
use super::{check_in_range, check_positive};
use anyhow::{Result, ensure};
use serde::Deserialize;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// Who owns and operates the project
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Default,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum OwnershipType {
    /// A regulated utility, recovering costs through rates
    #[default]
    #[string = "utility"]
    Utility,
    /// An independent owner selling into markets
    #[string = "merchant"]
    Merchant,
}

/// Project identification and sizing.
///
/// Energy capacity is always derived from power and duration; see [`ProjectBasics::capacity_mwh`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectBasics {
    /// Project name
    pub name: String,
    /// Identifier, e.g. from an interconnection queue
    pub project_id: String,
    /// Site or zone
    pub location: String,
    /// Power capacity (MW)
    pub capacity_mw: f64,
    /// Storage duration at rated power (hours)
    pub duration_hours: f64,
    /// Analysis period N (years of operation after the construction year)
    pub analysis_period_years: u32,
    /// Discount rate used when no financing inputs are given
    pub discount_rate: f64,
    /// Ownership model
    pub ownership_type: OwnershipType,
    /// Calendar year in which the project enters service
    pub in_service_year: u32,
}

impl Default for ProjectBasics {
    fn default() -> Self {
        Self {
            name: String::new(),
            project_id: String::new(),
            location: String::new(),
            capacity_mw: 100.0,
            duration_hours: 4.0,
            analysis_period_years: 20,
            discount_rate: 0.07,
            ownership_type: OwnershipType::Utility,
            in_service_year: 2027,
        }
    }
}

impl ProjectBasics {
    /// Energy capacity (MWh)
    pub fn capacity_mwh(&self) -> f64 {
        self.capacity_mw * self.duration_hours
    }

    /// Power capacity (kW)
    pub fn capacity_kw(&self) -> f64 {
        self.capacity_mw * 1000.0
    }

    /// Energy capacity (kWh)
    pub fn capacity_kwh(&self) -> f64 {
        self.capacity_mwh() * 1000.0
    }

    /// Check that all values are within their valid ranges
    pub fn validate(&self) -> Result<()> {
        check_positive("capacity_mw", self.capacity_mw)?;
        check_positive("duration_hours", self.duration_hours)?;
        ensure!(
            self.analysis_period_years >= 1,
            "analysis_period_years must be at least 1"
        );
        ensure!(
            self.discount_rate > 0.0 && self.discount_rate < 1.0,
            "discount_rate must be between 0 and 1 (exclusive), got {}",
            self.discount_rate
        );
        check_in_range("in_service_year", self.in_service_year as f64, 1900.0..=2200.0)?;

        Ok(())
    }
}
