//! Code for reading explicit annual benefit values from `benefit_values.csv`.
use super::{input_err_msg, read_csv_optional};
use crate::project::ProjectInputs;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

const BENEFIT_VALUES_FILE_NAME: &str = "benefit_values.csv";

/// A row of `benefit_values.csv`
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct BenefitValueRaw {
    /// Name of a benefit stream declared in `project.toml`
    benefit: String,
    /// Year of operation (1-based)
    year: u32,
    /// Benefit in that year ($)
    value: f64,
}

/// Replace the annual values of benefit streams with those given in `benefit_values.csv`, if the
/// file is present.
///
/// Every benefit named in the file must be declared in `project.toml` and have exactly one value
/// for each year of the analysis period.
pub fn read_benefit_values(project_dir: &Path, inputs: &mut ProjectInputs) -> Result<()> {
    let file_path = project_dir.join(BENEFIT_VALUES_FILE_NAME);
    let Some(iter) = read_csv_optional(&file_path)? else {
        return Ok(());
    };

    let years = inputs.basics.analysis_period_years;
    let values =
        read_benefit_values_from_iter(iter, years).with_context(|| input_err_msg(&file_path))?;
    apply_benefit_values(values, inputs).with_context(|| input_err_msg(&file_path))
}

/// Group rows by benefit name, checking that each benefit covers years 1 to `years`
fn read_benefit_values_from_iter<I>(iter: I, years: u32) -> Result<IndexMap<String, Vec<f64>>>
where
    I: Iterator<Item = BenefitValueRaw>,
{
    let mut by_benefit: IndexMap<String, Vec<Option<f64>>> = IndexMap::new();
    for row in iter {
        ensure!(
            (1..=years).contains(&row.year),
            "Year {} for benefit '{}' is outside the analysis period (1 to {years})",
            row.year,
            row.benefit
        );
        ensure!(
            row.value.is_finite(),
            "Value for benefit '{}' in year {} must be finite",
            row.benefit,
            row.year
        );

        let values = by_benefit
            .entry(row.benefit.clone())
            .or_insert_with(|| vec![None; years as usize]);
        let slot = &mut values[row.year as usize - 1];
        ensure!(
            slot.is_none(),
            "Duplicate value for benefit '{}' in year {}",
            row.benefit,
            row.year
        );
        *slot = Some(row.value);
    }

    by_benefit
        .into_iter()
        .map(|(benefit, values)| {
            let values = values
                .into_iter()
                .enumerate()
                .map(|(idx, value)| {
                    value.with_context(|| {
                        format!("Missing value for benefit '{benefit}' in year {}", idx + 1)
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((benefit, values))
        })
        .collect()
}

/// Overwrite the annual values of the named benefit streams
fn apply_benefit_values(
    values: IndexMap<String, Vec<f64>>,
    inputs: &mut ProjectInputs,
) -> Result<()> {
    for (name, annual_values) in values {
        let stream = inputs
            .benefits
            .iter_mut()
            .find(|stream| stream.name == name)
            .with_context(|| format!("Benefit '{name}' is not declared in project.toml"))?;
        stream.annual_values = annual_values;
    }

    Ok(())
}
