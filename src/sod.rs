//! Slice-of-Day (SOD) feasibility check for resource adequacy.
//!
//! Under the CPUC Slice-of-Day framework (D.23-06-029), a resource counts for capacity only in the
//! hourly slices it can actually serve. This module checks whether a battery's energy capacity can
//! cover a 24-hour demand profile. Dispatch is greedy: the highest-demand hours are served first,
//! so the result is a feasibility test rather than an optimal schedule.
use crate::project::{check_in_range, check_positive};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use log::debug;

/// Number of hourly slices in a day
pub const HOURS_PER_DAY: usize = 24;

/// Summer peak day load shape for SCE, as capacity factors for hours 0-23.
///
/// 1.0 is the peak demand hour and 0.0 an hour with no RA obligation.
pub const DEFAULT_LOAD_SHAPE: [f64; HOURS_PER_DAY] = [
    0.00, 0.00, 0.00, 0.00, 0.00, 0.00, // HE 1-6
    0.00, 0.00, 0.10, 0.20, 0.40, 0.60, // HE 7-12
    0.80, 0.90, 1.00, 1.00, 1.00, 0.95, // HE 13-18
    0.85, 0.70, 0.50, 0.30, 0.10, 0.00, // HE 19-24
];

/// Inputs for a Slice-of-Day feasibility check
#[derive(Debug, Clone, PartialEq)]
pub struct SodInputs {
    /// Nameplate power capacity (MW)
    pub capacity_mw: f64,
    /// Energy duration at nameplate power (hours)
    pub duration_hours: f64,
    /// Round-trip efficiency
    pub round_trip_efficiency: f64,
    /// Annual fractional loss of energy capacity
    pub degradation_rate: f64,
    /// Year of operation to evaluate (1-based)
    pub analysis_year: u32,
    /// Demand by hour as a fraction of nameplate power (must have 24 entries)
    pub hourly_capacity_factors: Vec<f64>,
    /// Number of hours which must be served to qualify
    pub min_qualifying_hours: u32,
    /// Capacity factor at or above which an hour is a demand hour
    pub deration_threshold: f64,
}

impl Default for SodInputs {
    fn default() -> Self {
        Self {
            capacity_mw: 100.0,
            duration_hours: 4.0,
            round_trip_efficiency: 0.85,
            degradation_rate: 0.025,
            analysis_year: 1,
            hourly_capacity_factors: DEFAULT_LOAD_SHAPE.to_vec(),
            min_qualifying_hours: 4,
            deration_threshold: 0.5,
        }
    }
}

impl SodInputs {
    /// Usable energy capacity (MWh) in the evaluated year, after degradation
    pub fn energy_capacity_mwh(&self) -> f64 {
        let degradation =
            (1.0 - self.degradation_rate).powi(self.analysis_year.saturating_sub(1) as i32);
        self.capacity_mw * self.duration_hours * degradation
    }

    /// Check the battery parameters and the shape of the load profile
    pub fn validate(&self) -> Result<()> {
        let num_hours = self.hourly_capacity_factors.len();
        ensure!(
            num_hours == HOURS_PER_DAY,
            "Load shape must have exactly {HOURS_PER_DAY} hourly values, got {num_hours}"
        );
        for (hour, &factor) in self.hourly_capacity_factors.iter().enumerate() {
            check_in_range("capacity factor", factor, 0.0..=1.0)
                .with_context(|| format!("Invalid load shape value for hour {hour}"))?;
        }

        check_positive("capacity_mw", self.capacity_mw)?;
        check_positive("duration_hours", self.duration_hours)?;
        check_in_range("round_trip_efficiency", self.round_trip_efficiency, 0.5..=1.0)?;
        check_in_range("degradation_rate", self.degradation_rate, 0.0..=0.10)?;
        check_in_range("deration_threshold", self.deration_threshold, 0.0..=1.0)?;
        ensure!(self.analysis_year >= 1, "analysis_year must be at least 1");

        Ok(())
    }
}

/// Outcome of a Slice-of-Day feasibility check
#[derive(Debug, Clone, PartialEq)]
pub struct SodResult {
    /// Year of operation evaluated
    pub analysis_year: u32,
    /// Whether enough hours were served to qualify
    pub feasible: bool,
    /// Number of demand hours served
    pub qualifying_hours: u32,
    /// Minimum hours required
    pub required_hours: u32,
    /// Longest run of consecutive served hours
    pub max_continuous_hours: u32,
    /// Nameplate capacity scaled by the deration factor (MW)
    pub effective_capacity_mw: f64,
    /// Fraction of demand hours served
    pub deration_factor: f64,
    /// Discharge by hour (MW)
    pub hourly_dispatch: Vec<f64>,
    /// State of charge at the end of each hour (MWh)
    pub hourly_soc: Vec<f64>,
    /// Demand energy in excess of the battery's energy capacity (MWh)
    pub energy_shortfall_mwh: f64,
    /// Human-readable summary
    pub notes: String,
}

/// Check whether a battery can serve the demand profile.
///
/// Fails if the inputs are invalid, including a load shape without exactly 24 entries.
pub fn check_feasibility(inputs: &SodInputs) -> Result<SodResult> {
    inputs.validate()?;

    let capacity_mw = inputs.capacity_mw;
    let energy_mwh = inputs.energy_capacity_mwh();

    // Stable sort, so hours with equal demand are served in chronological order
    let demand_hours = inputs
        .hourly_capacity_factors
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, factor)| factor >= inputs.deration_threshold)
        .sorted_by(|(_, a), (_, b)| b.total_cmp(a))
        .collect_vec();

    let mut hourly_dispatch = vec![0.0; HOURS_PER_DAY];
    let mut served = [false; HOURS_PER_DAY];
    let mut remaining_energy = energy_mwh;
    for &(hour, factor) in &demand_hours {
        let discharge_mw = capacity_mw * factor;
        if remaining_energy >= discharge_mw {
            hourly_dispatch[hour] = discharge_mw;
            remaining_energy -= discharge_mw;
            served[hour] = true;
        }
    }

    let mut soc = energy_mwh;
    let hourly_soc = hourly_dispatch
        .iter()
        .map(|discharge| {
            soc -= discharge;
            soc.max(0.0)
        })
        .collect();

    let qualifying_hours = served.iter().filter(|&&served| served).count() as u32;
    let max_continuous_hours = longest_run(&served);
    let total_demand_energy: f64 = demand_hours
        .iter()
        .map(|(_, factor)| capacity_mw * factor)
        .sum();
    let energy_shortfall_mwh = (total_demand_energy - energy_mwh).max(0.0);
    let deration_factor = if demand_hours.is_empty() {
        0.0
    } else {
        qualifying_hours as f64 / demand_hours.len() as f64
    };
    let feasible = qualifying_hours >= inputs.min_qualifying_hours;

    debug!(
        "SOD year {}: {qualifying_hours} of {} demand hours served with {energy_mwh:.1} MWh",
        inputs.analysis_year,
        demand_hours.len()
    );

    Ok(SodResult {
        analysis_year: inputs.analysis_year,
        feasible,
        qualifying_hours,
        required_hours: inputs.min_qualifying_hours,
        max_continuous_hours,
        effective_capacity_mw: capacity_mw * deration_factor,
        deration_factor,
        hourly_dispatch,
        hourly_soc,
        energy_shortfall_mwh,
        notes: notes(inputs, qualifying_hours, energy_mwh, energy_shortfall_mwh),
    })
}

/// Check feasibility independently for each year of operation from 1 to `analysis_years`
pub fn check_over_lifetime(inputs: &SodInputs, analysis_years: u32) -> Result<Vec<SodResult>> {
    (1..=analysis_years)
        .map(|analysis_year| {
            check_feasibility(&SodInputs {
                analysis_year,
                ..inputs.clone()
            })
        })
        .collect()
}

/// Length of the longest run of consecutive `true` values
fn longest_run(served: &[bool]) -> u32 {
    let mut longest = 0;
    let mut current = 0;
    for &served in served {
        if served {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }

    longest
}

fn notes(inputs: &SodInputs, qualifying_hours: u32, energy_mwh: f64, shortfall: f64) -> String {
    let required = inputs.min_qualifying_hours;
    let mut notes = if qualifying_hours >= required {
        format!("PASS: {qualifying_hours} qualifying hours >= {required} required.")
    } else {
        format!("FAIL: {qualifying_hours} qualifying hours < {required} required.")
    };

    notes.push_str(&format!(
        " Battery: {:.0} MW x {:.0}h = {energy_mwh:.0} MWh effective capacity (Year {}, {:.1}%/yr \
        degradation).",
        inputs.capacity_mw,
        inputs.duration_hours,
        inputs.analysis_year,
        inputs.degradation_rate * 100.0
    ));

    if shortfall > 0.0 {
        notes.push_str(&format!(
            " Energy shortfall: {shortfall:.1} MWh. Consider longer duration or larger capacity."
        ));
    }

    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn inputs() -> SodInputs {
        SodInputs::default()
    }

    #[rstest]
    fn test_default_shape_is_feasible(inputs: SodInputs) {
        let result = check_feasibility(&inputs).unwrap();
        assert!(result.feasible);
        assert_eq!(result.qualifying_hours, 4);
        assert_eq!(result.required_hours, 4);
        assert_eq!(result.max_continuous_hours, 4);
        assert_approx_eq!(f64, result.deration_factor, 0.4);
        assert_approx_eq!(f64, result.effective_capacity_mw, 40.0);
        assert_approx_eq!(f64, result.energy_shortfall_mwh, 430.0, epsilon = 1e-9);
        assert!(result.notes.starts_with("PASS"));
    }

    #[rstest]
    fn test_dispatch_and_soc(inputs: SodInputs) {
        let result = check_feasibility(&inputs).unwrap();

        // Hours 14-16 at full power, then hour 17 at 95 MW
        let served_hours = result
            .hourly_dispatch
            .iter()
            .positions(|&mw| mw > 0.0)
            .collect_vec();
        assert_eq!(served_hours, [14, 15, 16, 17]);
        assert_approx_eq!(f64, result.hourly_dispatch[17], 95.0, epsilon = 1e-9);

        assert_eq!(result.hourly_soc.len(), HOURS_PER_DAY);
        assert_approx_eq!(f64, result.hourly_soc[0], 400.0, epsilon = 1e-9);
        assert_approx_eq!(f64, result.hourly_soc[23], 5.0, epsilon = 1e-9);
        assert!(
            result
                .hourly_soc
                .iter()
                .tuple_windows()
                .all(|(a, b)| b <= a)
        );
    }

    #[rstest]
    fn test_skips_hours_which_do_not_fit(mut inputs: SodInputs) {
        // About 70.7 MWh remains after hours 14-16, so only hour 19 (70 MWh) still fits
        inputs.analysis_year = 4;
        let result = check_feasibility(&inputs).unwrap();
        assert_eq!(result.qualifying_hours, 4);
        assert_eq!(result.hourly_dispatch[17], 0.0);
        assert_eq!(result.hourly_dispatch[13], 0.0);
        assert_approx_eq!(f64, result.hourly_dispatch[19], 70.0, epsilon = 1e-9);
        assert_eq!(result.max_continuous_hours, 3);
    }

    #[rstest]
    fn test_infeasible_short_duration(mut inputs: SodInputs) {
        inputs.duration_hours = 2.0;
        let result = check_feasibility(&inputs).unwrap();
        assert!(!result.feasible);
        assert_eq!(result.qualifying_hours, 2);
        assert!(result.notes.starts_with("FAIL"));
        assert!(result.notes.contains("Energy shortfall"));
    }

    #[rstest]
    fn test_no_demand_hours(mut inputs: SodInputs) {
        inputs.hourly_capacity_factors = vec![0.1; HOURS_PER_DAY];
        let result = check_feasibility(&inputs).unwrap();
        assert_eq!(result.deration_factor, 0.0);
        assert_eq!(result.energy_shortfall_mwh, 0.0);
        assert!(!result.feasible);
    }

    #[rstest]
    #[case(23)]
    #[case(25)]
    #[case(0)]
    fn test_malformed_load_shape(mut inputs: SodInputs, #[case] num_hours: usize) {
        inputs.hourly_capacity_factors = vec![0.5; num_hours];
        assert_error!(
            check_feasibility(&inputs),
            format!("Load shape must have exactly 24 hourly values, got {num_hours}")
        );
    }

    #[rstest]
    fn test_capacity_factor_out_of_range(mut inputs: SodInputs) {
        inputs.hourly_capacity_factors[3] = 1.5;
        assert_error!(
            check_feasibility(&inputs),
            "Invalid load shape value for hour 3"
        );
    }

    #[rstest]
    fn test_over_lifetime(inputs: SodInputs) {
        let results = check_over_lifetime(&inputs, 20).unwrap();
        assert_eq!(results.len(), 20);
        assert!(results[0].feasible);
        assert!(results.iter().map(|r| r.analysis_year).eq(1..=20));

        // Qualifying hours can only fall as the battery degrades
        assert!(
            results
                .iter()
                .tuple_windows()
                .all(|(a, b)| b.qualifying_hours <= a.qualifying_hours)
        );
    }

    #[test]
    fn test_longest_run() {
        assert_eq!(longest_run(&[true, true, false, true, true, true, false]), 3);
        assert_eq!(longest_run(&[false; 4]), 0);
    }
}
