//! The module responsible for writing output data to disk.
use crate::economics::FinancialResults;
use crate::sensitivity::{GridSensitivity, TornadoAnalysis};
use crate::sod::SodResult;
use crate::uos::UosResults;
use anyhow::{Context, Result, ensure};
use itertools::izip;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;
pub use metadata::write_metadata;

/// The root folder in which project-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "bess_econ_results";

/// The output file name for headline metrics
const METRICS_FILE_NAME: &str = "metrics.csv";

/// The output file name for annual cash flows
const CASH_FLOWS_FILE_NAME: &str = "cash_flows.csv";

/// The output file name for the share of PV benefits by category
const BENEFIT_BREAKDOWN_FILE_NAME: &str = "benefit_breakdown.csv";

/// The output file name for ranked tornado entries
const TORNADO_FILE_NAME: &str = "tornado.csv";

/// The output file name for parameters left out of the tornado ranking
const TORNADO_SKIPPED_FILE_NAME: &str = "tornado_skipped.csv";

/// The output file name for the CapEx/benefit sensitivity grid
const SENSITIVITY_GRID_FILE_NAME: &str = "sensitivity_grid.csv";

/// The output file name for the annual revenue requirement build-up
const REVENUE_REQUIREMENT_FILE_NAME: &str = "revenue_requirement.csv";

/// The output file name for annual avoided costs by component
const AVOIDED_COSTS_FILE_NAME: &str = "avoided_costs.csv";

/// The output file name for the wires vs NWA comparison
const WIRES_COMPARISON_FILE_NAME: &str = "wires_comparison.csv";

/// The output file name for the net ratepayer impact
const RATEPAYER_IMPACT_FILE_NAME: &str = "ratepayer_impact.csv";

/// The output file name for the hourly Slice-of-Day dispatch in the first year
const SOD_DISPATCH_FILE_NAME: &str = "sod_dispatch.csv";

/// The output file name for the Slice-of-Day check in every year
const SOD_LIFETIME_FILE_NAME: &str = "sod_lifetime.csv";

/// Get the default output directory for the specified project directory
pub fn get_output_dir(project_dir: &Path) -> Result<PathBuf> {
    let project_dir = project_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to project")?;

    let project_name = project_dir
        .file_name()
        .context("Project cannot be in root folder")?
        .to_str()
        .context("Invalid chars in project dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, project_name].iter().collect())
}

/// Create a new output directory, deleting the contents of any existing one if allowed.
///
/// # Returns
///
/// Whether an existing, non-empty directory was overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut entries) = fs::read_dir(output_dir) {
        if entries.next().is_none() {
            // Directory exists but is empty
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass the \
            --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Write rows to a new CSV file
fn write_csv<T, I>(file_path: &Path, rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Represents a row in the metrics CSV file. Undetermined values are left empty.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct MetricRow {
    metric: String,
    value: Option<f64>,
}

/// Represents a row in the cash flows CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CashFlowRow {
    year: usize,
    cost: f64,
    benefit: f64,
    net: f64,
    discharge_mwh: f64,
}

/// Represents a row in the benefit breakdown CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct BenefitShareRow {
    benefit: String,
    share_pct: f64,
}

/// Represents a row in the skipped tornado parameters CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SkippedParameterRow {
    parameter: String,
    reason: String,
}

/// Represents a row in the Slice-of-Day dispatch CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SodDispatchRow {
    hour: usize,
    capacity_factor: f64,
    dispatch_mw: f64,
    soc_mwh: f64,
}

/// Represents a row in the Slice-of-Day lifetime CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SodLifetimeRow {
    year: u32,
    feasible: bool,
    qualifying_hours: u32,
    required_hours: u32,
    max_continuous_hours: u32,
    effective_capacity_mw: f64,
    deration_factor: f64,
    energy_shortfall_mwh: f64,
}

impl From<&SodResult> for SodLifetimeRow {
    fn from(result: &SodResult) -> Self {
        Self {
            year: result.analysis_year,
            feasible: result.feasible,
            qualifying_hours: result.qualifying_hours,
            required_hours: result.required_hours,
            max_continuous_hours: result.max_continuous_hours,
            effective_capacity_mw: result.effective_capacity_mw,
            deration_factor: result.deration_factor,
            energy_shortfall_mwh: result.energy_shortfall_mwh,
        }
    }
}

/// Headline metrics, in the order they are written
fn metric_rows(results: &FinancialResults) -> Vec<MetricRow> {
    [
        ("pv_benefits", Some(results.pv_benefits)),
        ("pv_costs", Some(results.pv_costs)),
        ("npv", Some(results.npv)),
        ("bcr", Some(results.bcr)),
        ("irr", results.irr),
        ("payback_years", results.payback_years),
        ("lcos_per_mwh", Some(results.lcos_per_mwh)),
        ("breakeven_capex_per_kwh", Some(results.breakeven_capex_per_kwh)),
        ("effective_discount_rate", Some(results.effective_discount_rate)),
        ("flexibility_value", Some(results.flexibility_value)),
        ("td_deferral_pv", Some(results.td_deferral_pv)),
        ("num_tranches", Some(results.num_tranches as f64)),
    ]
    .into_iter()
    .map(|(metric, value)| MetricRow {
        metric: metric.to_string(),
        value,
    })
    .collect()
}

/// Write headline metrics, annual cash flows and the benefit breakdown
pub fn write_financial_results(output_path: &Path, results: &FinancialResults) -> Result<()> {
    write_csv(&output_path.join(METRICS_FILE_NAME), metric_rows(results))?;

    let cash_flows = izip!(
        &results.annual_costs,
        &results.annual_benefits,
        &results.annual_net,
        &results.annual_discharge_mwh
    )
    .enumerate()
    .map(|(year, (&cost, &benefit, &net, &discharge_mwh))| CashFlowRow {
        year,
        cost,
        benefit,
        net,
        discharge_mwh,
    });
    write_csv(&output_path.join(CASH_FLOWS_FILE_NAME), cash_flows)?;

    let shares = results
        .benefit_breakdown
        .iter()
        .map(|(benefit, &share_pct)| BenefitShareRow {
            benefit: benefit.clone(),
            share_pct,
        });
    write_csv(&output_path.join(BENEFIT_BREAKDOWN_FILE_NAME), shares)
}

/// Write the tornado ranking, skipped parameters and the sensitivity grid
pub fn write_sensitivity_results(
    output_path: &Path,
    tornado: &TornadoAnalysis,
    grid: &GridSensitivity,
) -> Result<()> {
    write_csv(&output_path.join(TORNADO_FILE_NAME), &tornado.entries)?;

    let skipped = tornado
        .skipped
        .iter()
        .map(|(parameter, reason)| SkippedParameterRow {
            parameter: parameter.clone(),
            reason: reason.to_string(),
        });
    write_csv(&output_path.join(TORNADO_SKIPPED_FILE_NAME), skipped)?;

    write_csv(&output_path.join(SENSITIVITY_GRID_FILE_NAME), &grid.cells)
}

/// Write the results of the utility-ownership analysis
///
/// # Arguments
///
/// * `output_path` - Folder where files will be saved
/// * `results` - Results of the utility-ownership analysis
/// * `load_shape` - The load shape used for the Slice-of-Day check
pub fn write_uos_results(
    output_path: &Path,
    results: &UosResults,
    load_shape: &[f64],
) -> Result<()> {
    write_csv(
        &output_path.join(REVENUE_REQUIREMENT_FILE_NAME),
        &results.rate_base.annual,
    )?;
    write_csv(
        &output_path.join(AVOIDED_COSTS_FILE_NAME),
        &results.avoided_costs,
    )?;
    write_csv(
        &output_path.join(WIRES_COMPARISON_FILE_NAME),
        results.wires_comparison.rows(),
    )?;
    write_csv(
        &output_path.join(RATEPAYER_IMPACT_FILE_NAME),
        &results.ratepayer_impact,
    )?;

    let dispatch = izip!(load_shape, &results.sod.hourly_dispatch, &results.sod.hourly_soc)
        .enumerate()
        .map(|(hour, (&capacity_factor, &dispatch_mw, &soc_mwh))| SodDispatchRow {
            hour,
            capacity_factor,
            dispatch_mw,
            soc_mwh,
        });
    write_csv(&output_path.join(SOD_DISPATCH_FILE_NAME), dispatch)?;

    write_csv(
        &output_path.join(SOD_LIFETIME_FILE_NAME),
        results.sod_lifetime.iter().map(SodLifetimeRow::from),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economics::compute_economics;
    use crate::fixture::{assert_error, project, project_inputs};
    use crate::project::{Project, ProjectInputs, UtilityOwnershipInputs};
    use crate::sensitivity::{grid_sensitivity, run_tornado_analysis};
    use crate::uos::analyse_utility_ownership;
    use itertools::{Itertools, assert_equal};
    use rstest::rstest;
    use std::fs::File;
    use tempfile::tempdir;

    /// Read all records from a CSV file in the output directory
    fn read_rows<T: for<'de> Deserialize<'de>>(dir: &Path, file_name: &str) -> Vec<T> {
        csv::Reader::from_path(dir.join(file_name))
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");

        // New directory
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());

        // Existing empty directory
        assert!(!create_output_directory(&output_dir, false).unwrap());

        // Existing non-empty directory
        File::create(output_dir.join("file.txt")).unwrap();
        assert_error!(
            create_output_directory(&output_dir, false),
            "Output folder already exists and is not empty. Please delete the folder or pass the \
            --overwrite command-line option."
        );
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(!output_dir.join("file.txt").exists());
    }

    #[test]
    fn test_get_output_dir() {
        let dir = tempdir().unwrap();
        let project_dir = dir.path().join("my_project");
        fs::create_dir(&project_dir).unwrap();
        assert_eq!(
            get_output_dir(&project_dir).unwrap(),
            PathBuf::from("bess_econ_results/my_project")
        );
    }

    #[rstest]
    fn test_write_financial_results(project: Project) {
        let results = compute_economics(&project).unwrap();
        let dir = tempdir().unwrap();
        write_financial_results(dir.path(), &results).unwrap();

        let metrics: Vec<MetricRow> = read_rows(dir.path(), METRICS_FILE_NAME);
        assert_equal(metrics, metric_rows(&results));

        let cash_flows: Vec<CashFlowRow> = read_rows(dir.path(), CASH_FLOWS_FILE_NAME);
        assert_eq!(cash_flows.len(), 21);
        assert_eq!(cash_flows[0].year, 0);
        assert_eq!(cash_flows[0].benefit, 0.0);
        assert_eq!(cash_flows[1].cost, results.annual_costs[1]);

        let shares: Vec<BenefitShareRow> = read_rows(dir.path(), BENEFIT_BREAKDOWN_FILE_NAME);
        assert_equal(
            shares.iter().map(|row| row.benefit.as_str()),
            ["Resource Adequacy", "Energy Arbitrage"],
        );
    }

    #[test]
    fn test_undetermined_metric_is_empty() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(METRICS_FILE_NAME);
        let rows = [MetricRow {
            metric: "irr".into(),
            value: None,
        }];
        write_csv(&file_path, &rows).unwrap();
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "metric,value\nirr,\n");
    }

    #[rstest]
    fn test_write_sensitivity_results(project: Project) {
        let results = compute_economics(&project).unwrap();
        let tornado = run_tornado_analysis(&project, &results);
        let grid = grid_sensitivity(project.costs().capex_per_kwh, &results);
        let dir = tempdir().unwrap();
        write_sensitivity_results(dir.path(), &tornado, &grid).unwrap();

        let skipped: Vec<SkippedParameterRow> = read_rows(dir.path(), TORNADO_SKIPPED_FILE_NAME);
        assert_eq!(skipped.len(), tornado.skipped.len());
        let contents = fs::read_to_string(dir.path().join(TORNADO_FILE_NAME)).unwrap();
        assert_eq!(contents.lines().count(), tornado.entries.len() + 1);
        let contents = fs::read_to_string(dir.path().join(SENSITIVITY_GRID_FILE_NAME)).unwrap();
        assert_eq!(contents.lines().count(), 50);
    }

    #[rstest]
    fn test_write_uos_results(mut project_inputs: ProjectInputs) {
        project_inputs.uos = Some(UtilityOwnershipInputs::default());
        let project = Project::new(project_inputs).unwrap();
        let results = analyse_utility_ownership(&project).unwrap().unwrap();
        let load_shape = &project.uos().unwrap().load_shape;
        let dir = tempdir().unwrap();
        write_uos_results(dir.path(), &results, load_shape).unwrap();

        let dispatch: Vec<SodDispatchRow> = read_rows(dir.path(), SOD_DISPATCH_FILE_NAME);
        assert_eq!(dispatch.len(), 24);
        assert_eq!(dispatch[15].dispatch_mw, 100.0);
        assert_eq!(dispatch[0].dispatch_mw, 0.0);

        let lifetime: Vec<SodLifetimeRow> = read_rows(dir.path(), SOD_LIFETIME_FILE_NAME);
        assert_equal(lifetime, results.sod_lifetime.iter().map(SodLifetimeRow::from));

        for file_name in [
            REVENUE_REQUIREMENT_FILE_NAME,
            AVOIDED_COSTS_FILE_NAME,
            WIRES_COMPARISON_FILE_NAME,
            RATEPAYER_IMPACT_FILE_NAME,
        ] {
            let contents = fs::read_to_string(dir.path().join(file_name)).unwrap();
            assert_eq!(contents.lines().count(), 21, "{file_name}");
        }
    }
}
