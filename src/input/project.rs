//! Code for reading `project.toml`, including upgrades from older schema versions.
use super::input_err_msg;
use crate::project::{
    BenefitStream, BuildSchedule, CostInputs, FinancingInputs, ProjectBasics, ProjectInputs,
    SpecialBenefitInputs, TdDeferralSchedule, TechnologySpecs, UtilityOwnershipInputs,
};
use anyhow::{Context, Result, bail, ensure};
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use toml::{Table, Value};

/// The name of the main project file
pub const PROJECT_FILE_NAME: &str = "project.toml";

/// The schema version written by this version of the program
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// A benefit stream as given in `project.toml`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenefitRecord {
    /// Category name
    pub name: String,
    /// Value in the first year of operation ($/kW-yr)
    #[serde(default)]
    pub value_per_kw_year: f64,
    /// Annual escalation rate
    #[serde(default)]
    pub escalation: f64,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Where the values come from
    #[serde(default)]
    pub data_source: String,
    /// Citation for the data source
    #[serde(default)]
    pub citation: String,
}

/// The contents of `project.toml`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    /// Version of the file format
    pub schema_version: u32,
    /// Identification, sizing and analysis horizon
    pub basics: ProjectBasics,
    /// Battery technology
    #[serde(default)]
    pub technology: TechnologySpecs,
    /// Capital and operating costs
    #[serde(default)]
    pub costs: CostInputs,
    /// Capital structure
    pub financing: Option<FinancingInputs>,
    /// Benefit streams
    #[serde(default)]
    pub benefits: Vec<BenefitRecord>,
    /// Formula-based benefits
    pub special_benefits: Option<SpecialBenefitInputs>,
    /// Phased build-out
    pub build_schedule: Option<BuildSchedule>,
    /// Deferred T&D investments
    pub td_deferral: Option<TdDeferralSchedule>,
    /// Utility-ownership inputs
    pub uos: Option<UtilityOwnershipInputs>,
}

impl ProjectFile {
    /// Convert into [`ProjectInputs`], expanding benefit records into annual values
    pub fn into_inputs(self) -> ProjectInputs {
        let capacity_kw = self.basics.capacity_kw();
        let years = self.basics.analysis_period_years;
        let benefits = self
            .benefits
            .into_iter()
            .map(|record| BenefitStream {
                description: record.description,
                data_source: record.data_source,
                citation: record.citation,
                ..BenefitStream::escalating(
                    &record.name,
                    record.value_per_kw_year,
                    record.escalation,
                    capacity_kw,
                    years,
                )
            })
            .collect();

        ProjectInputs {
            basics: self.basics,
            technology: self.technology,
            costs: self.costs,
            financing: self.financing,
            benefits,
            special_benefits: self.special_benefits,
            build_schedule: self.build_schedule,
            td_deferral: self.td_deferral,
            uos: self.uos,
        }
    }
}

/// Read `project.toml` from the project directory, upgrading it to the current schema if needed
pub fn read_project_file(project_dir: &Path) -> Result<ProjectFile> {
    let file_path = project_dir.join(PROJECT_FILE_NAME);
    let toml_str = fs::read_to_string(&file_path).with_context(|| input_err_msg(&file_path))?;
    parse_project_file(&toml_str).with_context(|| input_err_msg(&file_path))
}

/// Parse the contents of a project file
fn parse_project_file(toml_str: &str) -> Result<ProjectFile> {
    let mut table: Table = toml::from_str(toml_str)?;
    upgrade(&mut table)?;
    let project_file: ProjectFile = Value::Table(table).try_into()?;

    Ok(project_file)
}

/// Get the schema version of a project file. Files without one are version 1.
fn schema_version(table: &Table) -> Result<u32> {
    let Some(value) = table.get("schema_version") else {
        return Ok(1);
    };

    let version = value
        .as_integer()
        .context("schema_version must be an integer")?;
    ensure!(version >= 1, "schema_version must be at least 1, got {version}");
    Ok(u32::try_from(version)?)
}

/// Upgrade a project file in place to the current schema version
fn upgrade(table: &mut Table) -> Result<()> {
    let version = schema_version(table)?;
    if version > CURRENT_SCHEMA_VERSION {
        bail!(
            "Project file has schema version {version}, but the newest version supported is \
            {CURRENT_SCHEMA_VERSION}. Please upgrade the program."
        );
    }

    for from in version..CURRENT_SCHEMA_VERSION {
        match from {
            1 => upgrade_v1_to_v2(table),
            _ => unreachable!("No upgrade defined from schema version {from}"),
        }
        info!(
            "Upgraded project file from schema version {from} to {}",
            from + 1
        );
    }

    table.insert(
        "schema_version".into(),
        Value::Integer(CURRENT_SCHEMA_VERSION.into()),
    );

    Ok(())
}

/// Get a sub-table, creating it if it does not exist.
///
/// An existing value which is not a table is left alone so that deserialisation reports it.
fn sub_table<'a>(table: &'a mut Table, key: &str) -> Option<&'a mut Table> {
    table
        .entry(key)
        .or_insert_with(|| Value::Table(Table::new()))
        .as_table_mut()
}

/// Version 2 stopped storing the derived energy capacity and added costs for infrastructure,
/// taxes, insurance, charging and end of life
fn upgrade_v1_to_v2(table: &mut Table) {
    if let Some(basics) = sub_table(table, "basics") {
        basics.remove("capacity_mwh");
        basics
            .entry("ownership_type")
            .or_insert_with(|| "utility".into());
    }

    if let Some(costs) = sub_table(table, "costs") {
        for (key, value) in [
            ("learning_rate", Value::Float(0.10)),
            ("cost_base_year", Value::Integer(2024)),
            ("itc_percent", Value::Float(0.30)),
            ("itc_adders", Value::Float(0.0)),
            ("interconnection_per_kw", Value::Float(100.0)),
            ("land_per_kw", Value::Float(10.0)),
            ("permitting_per_kw", Value::Float(15.0)),
            ("insurance_pct_of_capex", Value::Float(0.005)),
            ("property_tax_pct", Value::Float(0.01)),
            ("charging_cost_per_mwh", Value::Float(0.0)),
            ("residual_value_pct", Value::Float(0.0)),
        ] {
            costs.entry(key).or_insert(value);
        }
    }

    if let Some(technology) = sub_table(table, "technology") {
        technology
            .entry("cycles_per_day")
            .or_insert(Value::Float(1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::project::OwnershipType;
    use float_cmp::assert_approx_eq;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const V2_PROJECT: &str = r#"
schema_version = 2

[basics]
name = "Test"
capacity_mw = 50.0
duration_hours = 4.0
analysis_period_years = 10

[costs]
capex_per_kwh = 200.0

[[benefits]]
name = "Resource Adequacy"
value_per_kw_year = 100.0
escalation = 0.02
data_source = "CPUC"
"#;

    #[test]
    fn test_parse_current_version() {
        let project_file = parse_project_file(V2_PROJECT).unwrap();
        assert_eq!(project_file.schema_version, 2);
        assert_eq!(project_file.basics.capacity_mw, 50.0);
        assert_eq!(project_file.costs.capex_per_kwh, 200.0);
        assert_eq!(project_file.costs.fom_per_kw_year, CostInputs::default().fom_per_kw_year);
        assert!(project_file.uos.is_none());

        let inputs = project_file.into_inputs();
        let benefit = &inputs.benefits[0];
        assert_eq!(benefit.name, "Resource Adequacy");
        assert_eq!(benefit.data_source, "CPUC");
        assert_eq!(benefit.annual_values.len(), 10);
        assert_approx_eq!(f64, benefit.annual_values[0], 5e6, epsilon = 1e-6);
        assert_approx_eq!(
            f64,
            benefit.annual_values[9],
            5e6 * 1.02f64.powi(9),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_upgrade_v1() {
        let project_file = parse_project_file(
            r#"
[basics]
name = "Old"
capacity_mw = 20.0
duration_hours = 2.0
capacity_mwh = 40.0

[technology]
round_trip_efficiency = 0.9

[costs]
capex_per_kwh = 300.0
"#,
        )
        .unwrap();

        assert_eq!(project_file.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(project_file.basics.ownership_type, OwnershipType::Utility);
        assert_eq!(project_file.basics.capacity_mwh(), 40.0);
        assert_eq!(project_file.technology.round_trip_efficiency, 0.9);
        assert_eq!(project_file.technology.cycles_per_day, 1.0);
        assert_eq!(project_file.costs.capex_per_kwh, 300.0);
        assert_eq!(project_file.costs.charging_cost_per_mwh, 0.0);
        assert_eq!(project_file.costs.residual_value_pct, 0.0);
        assert_eq!(project_file.costs.interconnection_per_kw, 100.0);
    }

    #[test]
    fn test_newer_version_is_error() {
        assert_error!(
            parse_project_file("schema_version = 3\n[basics]\n"),
            "Project file has schema version 3, but the newest version supported is 2. Please \
            upgrade the program."
        );
    }

    #[test]
    fn test_unknown_field_is_error() {
        let toml_str = V2_PROJECT.replace("capex_per_kwh", "capex_per_kw");
        assert!(parse_project_file(&toml_str).is_err());

        // Derived energy capacity is no longer accepted in version 2 files
        let toml_str = V2_PROJECT.replace("duration_hours = 4.0", "capacity_mwh = 200.0");
        assert!(parse_project_file(&toml_str).is_err());
    }

    #[test]
    fn test_read_project_file() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(PROJECT_FILE_NAME)).unwrap();
            write!(file, "{V2_PROJECT}").unwrap();
        }
        let project_file = read_project_file(dir.path()).unwrap();
        assert_eq!(project_file.basics.name, "Test");

        let missing = tempdir().unwrap();
        let expected = input_err_msg(missing.path().join(PROJECT_FILE_NAME));
        assert_error!(read_project_file(missing.path()), expected);
    }
}
