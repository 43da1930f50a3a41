//! Tornado analysis: one parameter at a time, with a full re-run of the DCF engine.
use crate::economics::{FinancialResults, compute_economics};
use crate::project::Project;
use anyhow::{Result, bail};
use log::{debug, warn};
use serde::Serialize;
use strum::{EnumIter, IntoEnumIterator};

/// Multiplier for the low case
pub const LOW_MULTIPLIER: f64 = 0.8;

/// Multiplier for the high case
pub const HIGH_MULTIPLIER: f64 = 1.2;

/// A scalar project input which can be perturbed
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, strum::Display)]
pub enum ScalarParameter {
    /// Battery CapEx ($/kWh)
    #[strum(to_string = "CapEx")]
    Capex,
    /// Fixed O&M ($/kW-year)
    #[strum(to_string = "Fixed O&M")]
    FixedOm,
    /// Charging energy cost ($/MWh)
    #[strum(to_string = "Charging Cost")]
    ChargingCost,
    /// Interconnection cost ($/kW)
    #[strum(to_string = "Interconnection Cost")]
    InterconnectionCost,
    /// Base ITC rate
    #[strum(to_string = "ITC Rate")]
    ItcRate,
    /// Effective discount rate
    #[strum(to_string = "Discount Rate")]
    DiscountRate,
    /// Round-trip efficiency
    #[strum(to_string = "Round-Trip Efficiency")]
    RoundTripEfficiency,
    /// Annual degradation
    #[strum(to_string = "Degradation Rate")]
    DegradationRate,
    /// Full cycles per day
    #[strum(to_string = "Cycles per Day")]
    CyclesPerDay,
}

impl ScalarParameter {
    /// Current value of the parameter for a project
    pub fn baseline(self, project: &Project) -> f64 {
        let costs = project.costs();
        let technology = project.technology();
        match self {
            Self::Capex => costs.capex_per_kwh,
            Self::FixedOm => costs.fom_per_kw_year,
            Self::ChargingCost => costs.charging_cost_per_mwh,
            Self::InterconnectionCost => costs.interconnection_per_kw,
            Self::ItcRate => costs.itc_percent,
            Self::DiscountRate => project.discount_rate(),
            Self::RoundTripEfficiency => technology.round_trip_efficiency,
            Self::DegradationRate => technology.degradation_rate_annual,
            Self::CyclesPerDay => technology.cycles_per_day,
        }
    }

    /// Baseline value formatted with its unit
    fn display_value(self, value: f64) -> String {
        match self {
            Self::Capex => format!("${value:.0}/kWh"),
            Self::FixedOm => format!("${value:.1}/kW-yr"),
            Self::ChargingCost => format!("${value:.1}/MWh"),
            Self::InterconnectionCost => format!("${value:.0}/kW"),
            Self::ItcRate | Self::DiscountRate | Self::RoundTripEfficiency => {
                format!("{:.1}%", value * 100.0)
            }
            Self::DegradationRate => format!("{:.2}%", value * 100.0),
            Self::CyclesPerDay => format!("{value:.2}"),
        }
    }
}

/// A parameter in the tornado catalogue
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum Parameter {
    /// A scalar input
    #[display("{_0}")]
    Scalar(ScalarParameter),
    /// Every year of the named benefit stream
    #[display("{_0}")]
    Benefit(String),
}

/// Why a parameter was left out of the ranking
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum SkipReason {
    /// A percentage change of zero is meaningless
    #[display("baseline value is zero")]
    ZeroBaseline,
    /// The perturbed project could not be built or evaluated
    #[display("invalid perturbation: {_0}")]
    InvalidPerturbation(String),
}

/// The effect of perturbing one parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TornadoEntry {
    /// Parameter name
    pub parameter: String,
    /// Baseline value, formatted for display
    pub baseline: String,
    /// BCR in the low case
    pub bcr_low: f64,
    /// BCR in the high case
    pub bcr_high: f64,
    /// NPV in the low case ($)
    pub npv_low: f64,
    /// NPV in the high case ($)
    pub npv_high: f64,
    /// Absolute difference between high and low BCR
    pub bcr_swing: f64,
}

/// Outcome of perturbing a single parameter
#[derive(Debug, Clone, PartialEq)]
pub enum PerturbationOutcome {
    /// Both cases were evaluated
    Ranked(TornadoEntry),
    /// The parameter was left out
    Skipped {
        /// Parameter name
        parameter: String,
        /// Why the parameter was left out
        reason: SkipReason,
    },
}

/// The ranked results of a tornado analysis
#[derive(Debug, Clone, PartialEq)]
pub struct TornadoAnalysis {
    /// BCR of the unperturbed project
    pub baseline_bcr: f64,
    /// NPV of the unperturbed project ($)
    pub baseline_npv: f64,
    /// Entries in descending order of BCR swing
    pub entries: Vec<TornadoEntry>,
    /// Parameters left out of the ranking
    pub skipped: Vec<(String, SkipReason)>,
}

/// The parameters perturbed for a project, in catalogue order
pub fn catalogue(project: &Project) -> Vec<Parameter> {
    ScalarParameter::iter()
        .map(Parameter::Scalar)
        .chain(
            project
                .benefits()
                .iter()
                .map(|benefit| Parameter::Benefit(benefit.name.clone())),
        )
        .collect()
}

/// Build a new project with one parameter scaled by `multiplier`.
///
/// The baseline is not modified. With financing inputs, the discount rate is changed through the
/// cost of equity and interest rate, which determine the WACC.
pub fn apply_delta(project: &Project, parameter: &Parameter, multiplier: f64) -> Result<Project> {
    let mut inputs = project.inputs().clone();
    match parameter {
        Parameter::Scalar(scalar) => match scalar {
            ScalarParameter::Capex => inputs.costs.capex_per_kwh *= multiplier,
            ScalarParameter::FixedOm => inputs.costs.fom_per_kw_year *= multiplier,
            ScalarParameter::ChargingCost => inputs.costs.charging_cost_per_mwh *= multiplier,
            ScalarParameter::InterconnectionCost => {
                inputs.costs.interconnection_per_kw *= multiplier;
            }
            ScalarParameter::ItcRate => inputs.costs.itc_percent *= multiplier,
            ScalarParameter::DiscountRate => match &mut inputs.financing {
                Some(financing) => {
                    financing.cost_of_equity *= multiplier;
                    financing.interest_rate *= multiplier;
                }
                None => inputs.basics.discount_rate *= multiplier,
            },
            ScalarParameter::RoundTripEfficiency => {
                inputs.technology.round_trip_efficiency *= multiplier;
            }
            ScalarParameter::DegradationRate => {
                inputs.technology.degradation_rate_annual *= multiplier;
            }
            ScalarParameter::CyclesPerDay => inputs.technology.cycles_per_day *= multiplier,
        },
        Parameter::Benefit(name) => {
            let Some(benefit) = inputs.benefits.iter_mut().find(|b| &b.name == name) else {
                bail!("No benefit stream named '{name}'");
            };
            for value in &mut benefit.annual_values {
                *value *= multiplier;
            }
        }
    }

    Project::new(inputs)
}

/// Baseline value of a parameter and its display string
fn baseline(project: &Project, parameter: &Parameter) -> (f64, String) {
    match parameter {
        Parameter::Scalar(scalar) => {
            let value = scalar.baseline(project);
            (value, scalar.display_value(value))
        }
        Parameter::Benefit(name) => {
            let total: f64 = project
                .benefits()
                .iter()
                .filter(|benefit| &benefit.name == name)
                .flat_map(|benefit| &benefit.annual_values)
                .sum();
            (total, format!("${:.1}M total", total / 1e6))
        }
    }
}

/// Evaluate a project with `parameter` scaled by `multiplier`
fn evaluate(project: &Project, parameter: &Parameter, multiplier: f64) -> Result<FinancialResults> {
    let perturbed = apply_delta(project, parameter, multiplier)?;
    compute_economics(&perturbed)
}

/// Evaluate the low and high cases for one parameter
pub fn perturb_parameter(project: &Project, parameter: &Parameter) -> PerturbationOutcome {
    let name = parameter.to_string();
    let (value, display) = baseline(project, parameter);
    if value == 0.0 {
        return PerturbationOutcome::Skipped {
            parameter: name,
            reason: SkipReason::ZeroBaseline,
        };
    }

    let low = evaluate(project, parameter, LOW_MULTIPLIER);
    let high = evaluate(project, parameter, HIGH_MULTIPLIER);
    match (low, high) {
        (Ok(low), Ok(high)) => PerturbationOutcome::Ranked(TornadoEntry {
            parameter: name,
            baseline: display,
            bcr_low: low.bcr,
            bcr_high: high.bcr,
            npv_low: low.npv,
            npv_high: high.npv,
            bcr_swing: (high.bcr - low.bcr).abs(),
        }),
        (Err(err), _) | (_, Err(err)) => PerturbationOutcome::Skipped {
            parameter: name,
            reason: SkipReason::InvalidPerturbation(format!("{err:#}")),
        },
    }
}

/// Perturb every parameter in the catalogue and rank them by BCR swing.
///
/// A parameter which cannot be perturbed is logged and skipped; it never aborts the analysis.
pub fn run_tornado_analysis(project: &Project, baseline: &FinancialResults) -> TornadoAnalysis {
    let mut entries = Vec::new();
    let mut skipped = Vec::new();
    for parameter in catalogue(project) {
        match perturb_parameter(project, &parameter) {
            PerturbationOutcome::Ranked(entry) => entries.push(entry),
            PerturbationOutcome::Skipped { parameter, reason } => {
                warn!("Skipping '{parameter}' in tornado analysis: {reason}");
                skipped.push((parameter, reason));
            }
        }
    }

    // Stable sort, so ties keep catalogue order
    entries.sort_by(|a, b| b.bcr_swing.total_cmp(&a.bcr_swing));
    debug!(
        "Tornado analysis ranked {} parameters and skipped {}",
        entries.len(),
        skipped.len()
    );

    TornadoAnalysis {
        baseline_bcr: baseline.bcr,
        baseline_npv: baseline.npv,
        entries,
        skipped,
    }
}
