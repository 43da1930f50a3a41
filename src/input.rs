//! Common routines for handling input data.
use crate::project::{Project, ProjectInputs};
use anyhow::{Context, Result, bail};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub mod benefit;
use benefit::read_benefit_values;
pub mod load_shape;
use load_shape::read_load_shape;
pub mod project;
use project::read_project_file;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }

    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file, if it exists.
///
/// Returns `None` if the file is not present.
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<Option<impl Iterator<Item = T> + 'a>> {
    if !file_path.is_file() {
        return Ok(None);
    }

    read_csv(file_path).map(Some)
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read the [`ProjectInputs`] stored in a project directory, without validating them.
///
/// # Arguments
///
/// * `project_dir` - Folder containing `project.toml` and any optional CSV files
pub fn read_project_inputs(project_dir: &Path) -> Result<ProjectInputs> {
    let mut inputs = read_project_file(project_dir)?.into_inputs();
    read_benefit_values(project_dir, &mut inputs)?;
    read_load_shape(project_dir, &mut inputs)?;

    Ok(inputs)
}

/// Load and validate the project stored in a project directory.
///
/// # Arguments
///
/// * `project_dir` - Folder containing `project.toml` and any optional CSV files
///
/// # Returns
///
/// The validated [`Project`] or an error if any of the input files is missing or invalid.
pub fn load_project<P: AsRef<Path>>(project_dir: P) -> Result<Project> {
    let project_dir = project_dir.as_ref();
    let inputs = read_project_inputs(project_dir)?;
    Project::new(inputs).with_context(|| format!("Invalid project in {}", project_dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        value: u32,
    }

    /// Create a CSV file with the given contents and return its path
    fn create_csv_file(dir_path: &Path, contents: &str) -> std::path::PathBuf {
        let file_path = dir_path.join("test.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "id,value\nhello,1\nworld,2\n");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(
            records,
            &[
                Record {
                    id: "hello".to_string(),
                    value: 1,
                },
                Record {
                    id: "world".to_string(),
                    value: 2,
                }
            ]
        );

        // File with whitespace
        let file_path = create_csv_file(dir.path(), "id  , value\t\n  hello\t ,1\n world ,2\n");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(records[0].id, "hello");
        assert_eq!(records[1].value, 2);

        // Empty file with header
        let file_path = create_csv_file(dir.path(), "id,value");
        assert!(read_csv::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_read_csv_optional() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.csv");
        assert!(read_csv_optional::<Record>(&missing).unwrap().is_none());

        let file_path = create_csv_file(dir.path(), "id,value\nhello,1\n");
        let records = read_csv_optional::<Record>(&file_path).unwrap().unwrap();
        assert_eq!(records.count(), 1);
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id = \"hello\"\nvalue = 1").unwrap();
        }

        assert_eq!(
            read_toml::<Record>(&file_path).unwrap(),
            Record {
                id: "hello".to_string(),
                value: 1,
            }
        );

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "bad toml syntax").unwrap();
        }

        assert!(read_toml::<Record>(&file_path).is_err());
    }

    #[test]
    fn test_input_err_msg() {
        assert_eq!(
            input_err_msg(Path::new("dir/project.toml")),
            "Error reading dir/project.toml"
        );
    }
}
