//! Integration tests checking relationships between the results for the example projects.
use bess_econ::economics::compute_economics;
use bess_econ::finance::npv;
use bess_econ::input::load_project;
use bess_econ::project::Project;
use bess_econ::sensitivity::{grid_sensitivity, run_tornado_analysis};
use bess_econ::uos::analyse_utility_ownership;
use float_cmp::assert_approx_eq;
use itertools::izip;
use rstest::rstest;
use std::path::PathBuf;

/// Load one of the example projects
fn load_example(name: &str) -> Project {
    load_project(PathBuf::from("demos").join(name)).unwrap()
}

#[rstest]
#[case("nrel_atb_2024")]
#[case("cpuc_uos_2024")]
#[case("phased_build")]
fn test_financial_results_consistent(#[case] name: &str) {
    let project = load_example(name);
    let results = compute_economics(&project).unwrap();
    let n = project.analysis_years() as usize;

    assert_eq!(results.annual_costs.len(), n + 1);
    assert_eq!(results.annual_benefits.len(), n + 1);
    assert_eq!(results.annual_benefits[0], 0.0);
    assert_approx_eq!(
        f64,
        results.npv,
        results.pv_benefits - results.pv_costs,
        epsilon = 1e-3
    );
    assert_approx_eq!(
        f64,
        results.bcr,
        results.pv_benefits / results.pv_costs,
        epsilon = 1e-9
    );
    for (benefit, cost, net) in izip!(
        &results.annual_benefits,
        &results.annual_costs,
        &results.annual_net
    ) {
        assert_approx_eq!(f64, *net, benefit - cost, epsilon = 1e-6);
    }

    let total_share: f64 = results.benefit_breakdown.values().sum();
    assert_approx_eq!(f64, total_share, 100.0, epsilon = 1e-6);

    if let Some(irr) = results.irr {
        let scale = results.annual_costs[0];
        assert!(npv(&results.annual_net, irr).abs() / scale < 1e-4);
    }
}

#[test]
fn test_phased_build_flexibility() {
    let project = load_example("phased_build");
    let results = compute_economics(&project).unwrap();
    assert_eq!(results.num_tranches, 3);
    assert!(results.flexibility_value > 0.0);

    // Later cohorts buy cells further down the learning curve
    assert!(
        results
            .cohort_capex_per_kwh
            .windows(2)
            .all(|pair| pair[1] < pair[0])
    );
}

#[test]
fn test_tornado_and_grid_share_baseline() {
    let project = load_example("nrel_atb_2024");
    let results = compute_economics(&project).unwrap();
    let tornado = run_tornado_analysis(&project, &results);
    assert_eq!(tornado.baseline_bcr, results.bcr);
    assert!(
        tornado
            .entries
            .windows(2)
            .all(|pair| pair[0].bcr_swing >= pair[1].bcr_swing)
    );

    let grid = grid_sensitivity(project.costs().capex_per_kwh, &results);
    let base_cell = grid
        .cells
        .iter()
        .find(|cell| {
            cell.capex_per_kwh == project.costs().capex_per_kwh && cell.benefit_multiplier == 1.0
        })
        .unwrap();
    assert_approx_eq!(f64, base_cell.bcr, results.bcr, epsilon = 1e-9);
}

#[test]
fn test_utility_ownership_example() {
    let project = load_example("cpuc_uos_2024");
    let uos = analyse_utility_ownership(&project).unwrap().unwrap();
    let n = project.analysis_years() as usize;
    assert_eq!(uos.rate_base.annual.len(), n);
    assert_eq!(uos.ratepayer_impact.len(), n);
    assert!(uos.sod.feasible);
    assert_eq!(uos.sod.qualifying_hours, 4);
    assert_eq!(uos.sod_lifetime.len(), n);

    // The load shape is read from load_shape.csv
    assert_eq!(project.uos().unwrap().load_shape[17], 1.0);

    // Annual values for the distribution deferral come from benefit_values.csv
    let deferral = project
        .benefits()
        .iter()
        .find(|benefit| benefit.name == "Distribution Deferral")
        .unwrap();
    assert_eq!(deferral.annual_values[0], 1_500_000.0);
    assert_eq!(deferral.annual_values[10], 0.0);
}

#[test]
fn test_merchant_example_has_no_uos_results() {
    let project = load_example("nrel_atb_2024");
    assert!(analyse_utility_ownership(&project).unwrap().is_none());
}
