//! Utility-owned storage (UOS) analysis.
//!
//! For a project owned by a regulated utility, the question is not whether it earns a return but
//! whether ratepayers are better off. This module runs the revenue requirement engine for the
//! project's plant and compares it against the avoided costs the project provides. It also
//! compares the project against a traditional wires solution and checks its Slice-of-Day
//! qualification.
use crate::avoided_cost::AvoidedCostComponents;
use crate::project::Project;
use crate::rate_base::{
    MacrsClass, RateBaseInputs, RateBaseResults, compute_revenue_requirement,
};
use crate::sod::{SodInputs, SodResult, check_feasibility, check_over_lifetime};
use crate::wires::{
    ComparisonResult, NwaParameters, WiresAlternative, compare_wires_vs_alternative,
};
use anyhow::{Context, Result};
use itertools::izip;
use log::info;
use serde::Serialize;

/// Net effect of the project on ratepayers in one year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatepayerImpact {
    /// Year of operation (1-based)
    pub year: u32,
    /// Revenue requirement collected from ratepayers ($)
    pub revenue_requirement: f64,
    /// Costs ratepayers avoid because of the project ($)
    pub avoided_cost: f64,
    /// Avoided cost less revenue requirement; positive values are savings ($)
    pub net_impact: f64,
    /// Running total of net impact ($)
    pub cumulative_savings: f64,
}

/// Results of the utility-ownership analysis
#[derive(Debug, Clone, PartialEq)]
pub struct UosResults {
    /// Plant in service, including infrastructure ($)
    pub gross_plant: f64,
    /// Fixed O&M ($/year)
    pub annual_om: f64,
    /// Revenue requirement of the storage plant
    pub rate_base: RateBaseResults,
    /// Avoided costs by component for each year of operation
    pub avoided_costs: Vec<AvoidedCostComponents>,
    /// Comparison against the wires solution the project defers
    pub wires_comparison: ComparisonResult,
    /// Slice-of-Day check for the first year of operation
    pub sod: SodResult,
    /// Slice-of-Day check for every year of operation
    pub sod_lifetime: Vec<SodResult>,
    /// Net ratepayer impact for each year of operation
    pub ratepayer_impact: Vec<RatepayerImpact>,
}

impl UosResults {
    /// Sum of net ratepayer impact over the analysis period ($)
    pub fn total_ratepayer_savings(&self) -> f64 {
        self.ratepayer_impact
            .last()
            .map_or(0.0, |impact| impact.cumulative_savings)
    }
}

/// Run the utility-ownership analysis for a project.
///
/// # Returns
///
/// `None` if the project has no utility-ownership inputs.
pub fn analyse_utility_ownership(project: &Project) -> Result<Option<UosResults>> {
    let Some(uos) = project.uos() else {
        return Ok(None);
    };

    let basics = project.basics();
    let technology = project.technology();
    let costs = project.costs();
    let years = project.analysis_years();
    let capacity_kw = basics.capacity_kw();

    let gross_plant =
        costs.capex_per_kwh * basics.capacity_kwh() + costs.infrastructure_per_kw() * capacity_kw;
    let annual_om = costs.fom_per_kw_year * capacity_kw;
    let itc_rate = costs.total_itc_rate();

    let rate_base = compute_revenue_requirement(&RateBaseInputs {
        gross_plant,
        book_life_years: uos.book_life_years,
        macrs_class: uos.macrs_class,
        itc_rate,
        itc_basis_reduction: true,
        cost_of_capital: uos.cost_of_capital.clone(),
        annual_om,
        analysis_years: years,
        bonus_depreciation_pct: uos.bonus_depreciation_pct,
    })
    .context("Failed to calculate revenue requirement")?;

    let avoided_costs = uos.avoided_costs.lifetime_trajectory(
        capacity_kw,
        basics.capacity_mwh(),
        technology,
        years,
        false,
    );
    let mean_avoided_cost =
        avoided_costs.iter().map(|year| year.total).sum::<f64>() / f64::from(years);

    let wires = WiresAlternative {
        total_cost: None,
        cost_per_kw: uos.wires_cost_per_kw,
        capacity_kw,
        book_life_years: uos.wires_book_life_years,
        lead_time_years: uos.wires_lead_time_years,
        annual_om: 0.0,
        macrs_class: MacrsClass::TwentyYear,
    };
    let nwa = NwaParameters {
        deferral_years: uos.nwa_deferral_years,
        incrementality: uos.nwa_incrementality,
        bess_gross_plant: gross_plant,
        bess_book_life_years: uos.book_life_years,
        bess_macrs_class: uos.macrs_class,
        bess_annual_om: annual_om,
        bess_itc_rate: itc_rate,
        avoided_cost_annual: mean_avoided_cost,
    };
    let wires_comparison = compare_wires_vs_alternative(&wires, &nwa, &uos.cost_of_capital, years)
        .context("Failed to compare against wires alternative")?;

    let sod_inputs = SodInputs {
        capacity_mw: basics.capacity_mw,
        duration_hours: basics.duration_hours,
        round_trip_efficiency: technology.round_trip_efficiency,
        degradation_rate: technology.degradation_rate_annual,
        analysis_year: 1,
        hourly_capacity_factors: uos.load_shape.clone(),
        min_qualifying_hours: uos.sod_min_hours,
        deration_threshold: uos.sod_deration_threshold,
    };
    let sod = check_feasibility(&sod_inputs).context("Slice-of-Day check failed")?;
    let sod_lifetime =
        check_over_lifetime(&sod_inputs, years).context("Slice-of-Day check failed")?;

    let ratepayer_impact = ratepayer_impact(&rate_base, &avoided_costs);

    let results = UosResults {
        gross_plant,
        annual_om,
        rate_base,
        avoided_costs,
        wires_comparison,
        sod,
        sod_lifetime,
        ratepayer_impact,
    };
    info!(
        "Utility ownership: levelised revenue requirement ${:.0}/yr, net ratepayer savings ${:.0}, \
        Slice-of-Day {}",
        results.rate_base.levelized_revenue_requirement,
        results.total_ratepayer_savings(),
        if results.sod.feasible { "feasible" } else { "not feasible" }
    );

    Ok(Some(results))
}

/// Avoided cost less revenue requirement for each year, with a running total
fn ratepayer_impact(
    rate_base: &RateBaseResults,
    avoided_costs: &[AvoidedCostComponents],
) -> Vec<RatepayerImpact> {
    let mut cumulative_savings = 0.0;
    izip!(&rate_base.annual, avoided_costs)
        .map(|(rate_base_year, avoided)| {
            let net_impact = avoided.total - rate_base_year.revenue_requirement;
            cumulative_savings += net_impact;
            RatepayerImpact {
                year: rate_base_year.year,
                revenue_requirement: rate_base_year.revenue_requirement,
                avoided_cost: avoided.total,
                net_impact,
                cumulative_savings,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::project_inputs;
    use crate::project::{ProjectInputs, UtilityOwnershipInputs};
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn uos_project(mut project_inputs: ProjectInputs) -> Project {
        project_inputs.uos = Some(UtilityOwnershipInputs::default());
        Project::new(project_inputs).unwrap()
    }

    #[rstest]
    fn test_no_uos_inputs(project_inputs: ProjectInputs) {
        let project = Project::new(project_inputs).unwrap();
        assert!(analyse_utility_ownership(&project).unwrap().is_none());
    }

    #[rstest]
    fn test_plant_and_lengths(uos_project: Project) {
        let results = analyse_utility_ownership(&uos_project).unwrap().unwrap();

        // 160 $/kWh x 400,000 kWh plus 125 $/kW x 100,000 kW
        assert_approx_eq!(f64, results.gross_plant, 76.5e6, epsilon = 1e-3);
        let fom = uos_project.costs().fom_per_kw_year;
        assert_approx_eq!(f64, results.annual_om, fom * 100_000.0, epsilon = 1e-6);

        assert_eq!(results.rate_base.annual.len(), 20);
        assert_eq!(results.avoided_costs.len(), 20);
        assert_eq!(results.sod_lifetime.len(), 20);
        assert_eq!(results.ratepayer_impact.len(), 20);
        assert!(results.avoided_costs.iter().all(|year| year.distribution_capacity == 0.0));
    }

    #[rstest]
    fn test_ratepayer_impact(uos_project: Project) {
        let results = analyse_utility_ownership(&uos_project).unwrap().unwrap();

        let mut running = 0.0;
        for (impact, avoided, rate_base) in izip!(
            &results.ratepayer_impact,
            &results.avoided_costs,
            &results.rate_base.annual
        ) {
            let net = avoided.total - rate_base.revenue_requirement;
            running += net;
            assert_approx_eq!(f64, impact.net_impact, net, epsilon = 1e-6);
            assert_approx_eq!(f64, impact.cumulative_savings, running, epsilon = 1e-3);
        }
        assert_approx_eq!(f64, results.total_ratepayer_savings(), running, epsilon = 1e-3);
    }

    #[rstest]
    fn test_sod_uses_default_load_shape(uos_project: Project) {
        let results = analyse_utility_ownership(&uos_project).unwrap().unwrap();
        assert_eq!(results.sod.analysis_year, 1);
        assert!(results.sod.feasible);
        assert_eq!(results.sod.qualifying_hours, 4);
        assert_eq!(results.sod, results.sod_lifetime[0]);
    }

    #[rstest]
    fn test_stricter_sod_threshold(mut project_inputs: ProjectInputs) {
        project_inputs.uos = Some(UtilityOwnershipInputs {
            sod_min_hours: 6,
            ..Default::default()
        });
        let project = Project::new(project_inputs).unwrap();
        let results = analyse_utility_ownership(&project).unwrap().unwrap();
        assert!(!results.sod.feasible);
        assert_eq!(results.sod.required_hours, 6);
    }

    #[rstest]
    fn test_wires_comparison_inputs(uos_project: Project) {
        let results = analyse_utility_ownership(&uos_project).unwrap().unwrap();
        let comparison = &results.wires_comparison;
        assert_eq!(comparison.wires_annual_rr.len(), 20);
        assert_eq!(comparison.nwa_annual_rr.len(), 20);
        assert_approx_eq!(
            f64,
            comparison.annual_savings,
            comparison.wires_recc - comparison.nwa_recc,
            epsilon = 1e-6
        );
    }
}
