//! Functionality for running the full analysis of a project.
use crate::economics::compute_economics;
use crate::output::{write_financial_results, write_sensitivity_results, write_uos_results};
use crate::project::Project;
use crate::sensitivity::{grid_sensitivity, run_tornado_analysis};
use crate::uos::analyse_utility_ownership;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

/// Run the analysis and write the results.
///
/// # Arguments
///
/// * `project` - The project to analyse
/// * `output_path` - Folder where result files will be saved
/// * `run_sensitivity` - Whether to run the tornado and grid sensitivity analyses
pub fn run(project: &Project, output_path: &Path, run_sensitivity: bool) -> Result<()> {
    let results = compute_economics(project).context("Failed to calculate project economics")?;
    info!(
        "NPV ${:.0}, BCR {:.2}, LCOS ${:.2}/MWh",
        results.npv, results.bcr, results.lcos_per_mwh
    );
    match results.irr {
        Some(irr) => info!("IRR {:.2}%", irr * 100.0),
        None => info!("IRR could not be determined"),
    }
    match results.payback_years {
        Some(payback) => info!("Payback after {payback:.1} years"),
        None => info!("Costs are not paid back within the analysis period"),
    }
    if results.num_tranches > 1 {
        info!(
            "Phased build over {} tranches: flexibility value ${:.0}",
            results.num_tranches, results.flexibility_value
        );
    }
    write_financial_results(output_path, &results)?;

    if run_sensitivity {
        let tornado = run_tornado_analysis(project, &results);
        if let Some(top) = tornado.entries.first() {
            info!(
                "Most sensitive parameter: {} (BCR {:.2} to {:.2})",
                top.parameter, top.bcr_low, top.bcr_high
            );
        }
        let grid = grid_sensitivity(project.costs().capex_per_kwh, &results);
        write_sensitivity_results(output_path, &tornado, &grid)?;
    }

    if let Some(uos) = project.uos() {
        let uos_results = analyse_utility_ownership(project)
            .context("Utility-ownership analysis failed")?
            .context("Utility-ownership analysis returned no results")?;
        write_uos_results(output_path, &uos_results, &uos.load_shape)?;
    }

    Ok(())
}
