//! The project data model.
//!
//! A [`Project`] can only be obtained through [`Project::new`], which validates every record it is
//! built from, so the engines never see invalid inputs.
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use std::ops::RangeInclusive;

pub mod basics;
pub mod benefit;
pub mod costs;
pub mod financing;
pub mod ownership;
pub mod schedule;
pub mod technology;
pub use basics::{OwnershipType, ProjectBasics};
pub use benefit::{BenefitStream, SpecialBenefitInputs};
pub use costs::CostInputs;
pub use financing::FinancingInputs;
pub use ownership::UtilityOwnershipInputs;
pub use schedule::{BuildSchedule, BuildTranche, TdDeferralSchedule, TdDeferralTranche};
pub use technology::TechnologySpecs;

/// Tolerance when checking that tranche capacities add up to the project capacity (MW)
const TRANCHE_CAPACITY_TOLERANCE: f64 = 0.01;

/// Check that a value lies within an inclusive range
pub(crate) fn check_in_range(name: &str, value: f64, range: RangeInclusive<f64>) -> Result<()> {
    ensure!(
        range.contains(&value),
        "{name} must be between {} and {}, got {value}",
        range.start(),
        range.end()
    );

    Ok(())
}

/// Check that a value is finite and strictly positive
pub(crate) fn check_positive(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "{name} must be greater than zero, got {value}"
    );

    Ok(())
}

/// Check that a value is finite and not negative
pub(crate) fn check_non_negative(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be non-negative, got {value}"
    );

    Ok(())
}

/// The records a [`Project`] is built from.
///
/// This is plain data with no guarantees; use [`Project::new`] to validate it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectInputs {
    /// Identification, sizing and analysis horizon
    pub basics: ProjectBasics,
    /// Battery technology
    pub technology: TechnologySpecs,
    /// Capital and operating costs
    pub costs: CostInputs,
    /// Capital structure. When present, its WACC is used as the discount rate.
    pub financing: Option<FinancingInputs>,
    /// Annual benefit streams
    pub benefits: Vec<BenefitStream>,
    /// Formula-based benefits
    pub special_benefits: Option<SpecialBenefitInputs>,
    /// Phased build-out of the project capacity
    pub build_schedule: Option<BuildSchedule>,
    /// T&D investments deferred by the project
    pub td_deferral: Option<TdDeferralSchedule>,
    /// Inputs for the utility-ownership analysis
    pub uos: Option<UtilityOwnershipInputs>,
}

/// A validated battery storage project
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    inputs: ProjectInputs,
}

impl Project {
    /// Validate the given inputs and create a new [`Project`]
    pub fn new(inputs: ProjectInputs) -> Result<Self> {
        validate_inputs(&inputs)?;
        Ok(Self { inputs })
    }

    /// The records this project was built from
    pub fn inputs(&self) -> &ProjectInputs {
        &self.inputs
    }

    /// Project basics
    pub fn basics(&self) -> &ProjectBasics {
        &self.inputs.basics
    }

    /// Technology specifications
    pub fn technology(&self) -> &TechnologySpecs {
        &self.inputs.technology
    }

    /// Cost inputs
    pub fn costs(&self) -> &CostInputs {
        &self.inputs.costs
    }

    /// Financing inputs, if any
    pub fn financing(&self) -> Option<&FinancingInputs> {
        self.inputs.financing.as_ref()
    }

    /// Benefit streams
    pub fn benefits(&self) -> &[BenefitStream] {
        &self.inputs.benefits
    }

    /// Special (formula-based) benefits, if any
    pub fn special_benefits(&self) -> Option<&SpecialBenefitInputs> {
        self.inputs.special_benefits.as_ref()
    }

    /// T&D deferral schedule, if any
    pub fn td_deferral(&self) -> Option<&TdDeferralSchedule> {
        self.inputs.td_deferral.as_ref()
    }

    /// Utility-ownership inputs, if any
    pub fn uos(&self) -> Option<&UtilityOwnershipInputs> {
        self.inputs.uos.as_ref()
    }

    /// The analysis period in years (N)
    pub fn analysis_years(&self) -> u32 {
        self.inputs.basics.analysis_period_years
    }

    /// The rate used for all present-value calculations.
    ///
    /// This is the WACC if financing inputs are present, otherwise the project discount rate.
    pub fn discount_rate(&self) -> f64 {
        self.inputs
            .financing
            .as_ref()
            .map_or(self.inputs.basics.discount_rate, FinancingInputs::wacc)
    }

    /// The tranches in which capacity comes online, sorted by commercial operation year.
    ///
    /// Projects without a build schedule have a single tranche in their in-service year.
    pub fn tranches(&self) -> Vec<BuildTranche> {
        match &self.inputs.build_schedule {
            Some(schedule) if !schedule.tranches.is_empty() => schedule
                .tranches
                .iter()
                .cloned()
                .sorted_by_key(|tranche| tranche.cod_year)
                .collect(),
            _ => vec![BuildTranche {
                cod_year: self.inputs.basics.in_service_year,
                capacity_mw: self.inputs.basics.capacity_mw,
            }],
        }
    }

    /// Whether capacity is built in more than one tranche
    pub fn is_multi_tranche(&self) -> bool {
        self.inputs
            .build_schedule
            .as_ref()
            .is_some_and(|schedule| schedule.tranches.len() > 1)
    }
}

/// Check every record and the rules which span more than one record
fn validate_inputs(inputs: &ProjectInputs) -> Result<()> {
    let basics = &inputs.basics;
    basics.validate().context("Invalid project basics")?;
    inputs
        .technology
        .validate()
        .context("Invalid technology specs")?;
    inputs.costs.validate().context("Invalid cost inputs")?;

    let years = basics.analysis_period_years;
    ensure!(
        inputs.technology.augmentation_year <= years,
        "augmentation_year ({}) must not be after the end of the analysis period ({years})",
        inputs.technology.augmentation_year
    );

    if let Some(financing) = &inputs.financing {
        financing.validate().context("Invalid financing inputs")?;
        let wacc = financing.wacc();
        ensure!(
            wacc > 0.0 && wacc < 1.0,
            "WACC must be between 0 and 1 (exclusive), got {wacc}"
        );
    }

    check_benefits(&inputs.benefits, years)?;

    if let Some(special) = &inputs.special_benefits {
        special.validate().context("Invalid special benefit inputs")?;
    }

    if let Some(schedule) = &inputs.build_schedule {
        schedule.validate().context("Invalid build schedule")?;
        if !schedule.tranches.is_empty() {
            let total: f64 = schedule.tranches.iter().map(|t| t.capacity_mw).sum();
            ensure!(
                (total - basics.capacity_mw).abs() <= TRANCHE_CAPACITY_TOLERANCE,
                "Tranche capacities sum to {total} MW but project capacity is {} MW",
                basics.capacity_mw
            );
        }
    }

    if let Some(td_deferral) = &inputs.td_deferral {
        td_deferral.validate().context("Invalid T&D deferral inputs")?;
    }

    if let Some(uos) = &inputs.uos {
        uos.validate().context("Invalid utility-ownership inputs")?;
    }

    Ok(())
}

/// Check that benefit streams have unique names and one value per analysis year
fn check_benefits(benefits: &[BenefitStream], years: u32) -> Result<()> {
    for benefit in benefits {
        benefit.validate()?;
        ensure!(
            benefit.annual_values.len() == years as usize,
            "Benefit stream '{}' has {} annual values but the analysis period is {years} years",
            benefit.name,
            benefit.annual_values.len()
        );
    }

    if let Some(name) = benefits.iter().map(|b| b.name.as_str()).duplicates().next() {
        anyhow::bail!("Duplicate benefit stream name: {name}");
    }

    Ok(())
}
