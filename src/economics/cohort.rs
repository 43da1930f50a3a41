//! Cash flows for a single cohort of capacity brought online together.
use crate::project::{BuildTranche, Project};
use log::warn;

/// Annual cash flows for one cohort over analysis years 0..=N
#[derive(Debug, Clone, PartialEq)]
pub struct CohortCashFlows {
    /// Costs in each analysis year ($)
    pub costs: Vec<f64>,
    /// Energy discharged in each analysis year (MWh)
    pub discharge_mwh: Vec<f64>,
    /// Battery CapEx paid for this cohort ($/kWh), before bulk discount
    pub capex_per_kwh: f64,
}

/// Calculate the costs and energy for capacity coming online in a given tranche.
///
/// # Arguments
///
/// * `project` - The project the tranche belongs to
/// * `tranche` - Commercial operation year and capacity of the cohort
/// * `year_0` - Calendar year of analysis year 0 (the earliest COD)
/// * `apply_learning` - Whether the battery CapEx follows the learning curve to the cohort's COD
///
/// # Returns
///
/// `None` if the cohort comes online after the end of the analysis period.
pub fn cohort_cash_flows(
    project: &Project,
    tranche: &BuildTranche,
    year_0: u32,
    apply_learning: bool,
) -> Option<CohortCashFlows> {
    let n = project.analysis_years() as usize;
    let offset = tranche.cod_year.saturating_sub(year_0) as usize;
    if offset > n {
        warn!(
            "Tranche with COD {} starts after the end of the analysis period and is ignored",
            tranche.cod_year
        );
        return None;
    }

    let technology = project.technology();
    let costs = project.costs();
    let bulk = costs.bulk_discount_multiplier(project.basics().capacity_mwh());
    let capacity_kw = tranche.capacity_mw * 1000.0;
    let capacity_mwh = tranche.capacity_mw * project.basics().duration_hours;
    let capacity_kwh = capacity_mwh * 1000.0;

    let capex_per_kwh = if apply_learning {
        costs.capex_in_year(tranche.cod_year)
    } else {
        costs.capex_per_kwh
    };
    let battery_capex = capex_per_kwh * capacity_kwh * bulk;
    let total_capex = battery_capex + costs.infrastructure_per_kw() * capacity_kw * bulk;
    let itc_credit = battery_capex * costs.total_itc_rate();

    let mut annual_costs = vec![0.0; n + 1];
    let mut discharge_mwh = vec![0.0; n + 1];
    annual_costs[offset] = total_capex - itc_credit;

    for year in offset + 1..=n {
        let years_operating = year - offset;
        let discharge = technology.annual_discharge_mwh(capacity_mwh, years_operating as u32);
        let charge = discharge / technology.round_trip_efficiency;
        let remaining_book_value = total_capex * (1.0 - years_operating as f64 / n as f64).max(0.0);

        discharge_mwh[year] = discharge;
        annual_costs[year] += costs.fom_per_kw_year * capacity_kw * bulk
            + costs.vom_per_mwh * discharge
            + costs.charging_cost_per_mwh * charge
            + battery_capex * costs.insurance_pct_of_capex
            + remaining_book_value * costs.property_tax_pct;
    }

    let augmentation_year = offset + technology.augmentation_year as usize;
    if (1..=n).contains(&augmentation_year) {
        annual_costs[augmentation_year] += costs
            .augmentation_cost_after(technology.augmentation_year)
            * bulk
            * capacity_kwh;
    }

    annual_costs[n] += costs.decommissioning_per_kw * capacity_kw
        - total_capex * costs.residual_value_pct;

    Some(CohortCashFlows {
        costs: annual_costs,
        discharge_mwh,
        capex_per_kwh,
    })
}

/// Online capacity in each analysis year as a fraction of project capacity, allowing for
/// degradation of each cohort since its COD
pub fn capacity_ratios(project: &Project, tranches: &[BuildTranche], year_0: u32) -> Vec<f64> {
    let n = project.analysis_years() as usize;
    let total_mw = project.basics().capacity_mw;
    let technology = project.technology();

    let mut ratios = vec![0.0; n + 1];
    for (year, ratio) in ratios.iter_mut().enumerate().skip(1) {
        let online_mw: f64 = tranches
            .iter()
            .filter_map(|tranche| {
                let offset = tranche.cod_year.saturating_sub(year_0) as usize;
                (year > offset).then(|| {
                    tranche.capacity_mw * technology.degradation_factor((year - offset) as u32)
                })
            })
            .sum();
        *ratio = online_mw / total_mw;
    }

    ratios
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::project;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn tranche(cod_year: u32, capacity_mw: f64) -> BuildTranche {
        BuildTranche {
            cod_year,
            capacity_mw,
        }
    }

    #[rstest]
    fn test_single_cohort_year_0(project: Project) {
        let flows = cohort_cash_flows(&project, &tranche(2027, 100.0), 2027, false).unwrap();
        assert_eq!(flows.costs.len(), 21);
        assert_eq!(flows.capex_per_kwh, 160.0);

        // Battery 160 $/kWh x 400,000 kWh and infrastructure 125 $/kW x 100,000 kW, less 30% ITC
        let expected = 64e6 + 12.5e6 - 64e6 * 0.3;
        assert_approx_eq!(f64, flows.costs[0], expected, epsilon = 1e-3);
        assert_eq!(flows.discharge_mwh[0], 0.0);
    }

    #[rstest]
    fn test_learning_applied_to_later_cohort(project: Project) {
        let flows = cohort_cash_flows(&project, &tranche(2030, 40.0), 2027, true).unwrap();
        assert_approx_eq!(f64, flows.capex_per_kwh, 160.0 * 0.9f64.powi(6), epsilon = 1e-9);
        assert!(flows.costs[..3].iter().all(|&cost| cost == 0.0));
        assert!(flows.costs[3] > 0.0);
        assert!(flows.discharge_mwh[..4].iter().all(|&mwh| mwh == 0.0));
        assert!(flows.discharge_mwh[4] > 0.0);
    }

    #[rstest]
    fn test_cohort_after_analysis_period(project: Project) {
        assert!(cohort_cash_flows(&project, &tranche(2050, 40.0), 2027, true).is_none());
    }

    #[rstest]
    fn test_capacity_ratios(project: Project) {
        let tranches = [tranche(2027, 60.0), tranche(2030, 40.0)];
        let ratios = capacity_ratios(&project, &tranches, 2027);
        assert_eq!(ratios.len(), 21);
        assert_eq!(ratios[0], 0.0);
        assert_approx_eq!(f64, ratios[1], 0.6, epsilon = 1e-12);
        assert_approx_eq!(f64, ratios[3], 0.6 * 0.975f64.powi(2), epsilon = 1e-12);
        assert_approx_eq!(
            f64,
            ratios[4],
            0.6 * 0.975f64.powi(3) + 0.4,
            epsilon = 1e-12
        );
    }
}
