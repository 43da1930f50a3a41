//! Code for reading a Slice-of-Day load shape from `load_shape.csv`.
use super::{input_err_msg, read_csv_optional};
use crate::project::ProjectInputs;
use crate::sod::HOURS_PER_DAY;
use anyhow::{Context, Result, ensure};
use log::warn;
use serde::Deserialize;
use std::path::Path;

const LOAD_SHAPE_FILE_NAME: &str = "load_shape.csv";

/// A row of `load_shape.csv`
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct LoadShapeRaw {
    /// Hour of the day (0-23)
    hour: usize,
    /// Demand as a fraction of nameplate power
    capacity_factor: f64,
}

/// Replace the utility-ownership load shape with the one in `load_shape.csv`, if present.
///
/// The file is ignored, with a warning, for projects without utility-ownership inputs.
pub fn read_load_shape(project_dir: &Path, inputs: &mut ProjectInputs) -> Result<()> {
    let file_path = project_dir.join(LOAD_SHAPE_FILE_NAME);
    let Some(iter) = read_csv_optional(&file_path)? else {
        return Ok(());
    };

    let load_shape = read_load_shape_from_iter(iter).with_context(|| input_err_msg(&file_path))?;
    match inputs.uos.as_mut() {
        Some(uos) => uos.load_shape = load_shape,
        None => warn!(
            "{} is ignored because the project has no [uos] section",
            file_path.display()
        ),
    }

    Ok(())
}

/// Read one capacity factor for each hour of the day
fn read_load_shape_from_iter<I>(iter: I) -> Result<Vec<f64>>
where
    I: Iterator<Item = LoadShapeRaw>,
{
    let mut load_shape = [None; HOURS_PER_DAY];
    for row in iter {
        ensure!(
            row.hour < HOURS_PER_DAY,
            "Hour must be between 0 and {}, got {}",
            HOURS_PER_DAY - 1,
            row.hour
        );
        let slot = &mut load_shape[row.hour];
        ensure!(slot.is_none(), "Duplicate entry for hour {}", row.hour);
        *slot = Some(row.capacity_factor);
    }

    load_shape
        .into_iter()
        .enumerate()
        .map(|(hour, factor)| factor.with_context(|| format!("Missing entry for hour {hour}")))
        .collect()
}
