//! Code related to the example projects and the CLI commands for interacting with them.
use super::{RunOpts, handle_run_command};
use crate::settings::Settings;
use anyhow::{Context, Result, bail, ensure};
use clap::Subcommand;
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the example projects.
const EXAMPLES_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/demos");

/// The available subcommands for managing example projects.
#[derive(Subcommand)]
pub enum ExampleSubcommands {
    /// List available examples.
    List,
    /// Provide information about the specified example.
    Info {
        /// The name of the example.
        name: String,
    },
    /// Extract an example project to a new directory.
    Extract {
        /// The name of the example to extract.
        name: String,
        /// The destination folder for the example.
        new_path: Option<PathBuf>,
    },
    /// Run an example.
    Run {
        /// The name of the example to run.
        name: String,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
}

impl ExampleSubcommands {
    /// Execute the supplied example subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => handle_example_list_command(),
            Self::Info { name } => handle_example_info_command(&name)?,
            Self::Extract {
                name,
                new_path: dest,
            } => handle_example_extract_command(&name, dest.as_deref())?,
            Self::Run { name, opts } => handle_example_run_command(&name, &opts, None)?,
        }

        Ok(())
    }
}

/// Handle the `example list` command.
fn handle_example_list_command() {
    for entry in EXAMPLES_DIR.dirs() {
        println!("{}", entry.path().display());
    }
}

/// Handle the `example info` command.
fn handle_example_info_command(name: &str) -> Result<()> {
    let path: PathBuf = [name, "README.txt"].iter().collect();
    let readme = EXAMPLES_DIR
        .get_file(path)
        .context("Example not found.")?
        .contents_utf8()
        .expect("README.txt is not UTF-8 encoded");

    println!("{readme}");

    Ok(())
}

/// Handle the `example extract` command
fn handle_example_extract_command(name: &str, dest: Option<&Path>) -> Result<()> {
    let dest = dest.unwrap_or(Path::new(name));
    extract_example(name, dest)
}

/// Extract the specified example to a new directory
fn extract_example(name: &str, new_path: &Path) -> Result<()> {
    // Find the subdirectory in EXAMPLES_DIR whose name matches `name`.
    let sub_dir = EXAMPLES_DIR.get_dir(name).context("Example not found.")?;

    ensure!(
        !new_path.exists(),
        "Destination directory {} already exists",
        new_path.display()
    );

    // Copy the contents of the subdirectory to the destination
    fs::create_dir(new_path)
        .with_context(|| format!("Could not create directory {}", new_path.display()))?;
    for entry in sub_dir.entries() {
        match entry {
            DirEntry::Dir(dir) => bail!(
                "Subdirectories in examples not supported: {}",
                dir.path().display()
            ),
            DirEntry::File(f) => {
                let file_name = f.path().file_name().expect("Embedded file has no name");
                let file_path = new_path.join(file_name);
                fs::write(&file_path, f.contents())
                    .with_context(|| format!("Could not write {}", file_path.display()))?;
            }
        }
    }

    Ok(())
}

/// Handle the `example run` command.
///
/// The example is extracted to a temporary directory, so results go to
/// `bess_econ_results/<name>` unless an output directory is given.
pub fn handle_example_run_command(
    name: &str,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let project_path = temp_dir.path().join(name);
    extract_example(name, &project_path)?;

    let default_output_dir;
    let opts = if opts.output_dir.is_some() {
        opts
    } else {
        default_output_dir = RunOpts {
            output_dir: Some(get_output_dir_for_example(name)),
            overwrite: opts.overwrite,
            no_sensitivity: opts.no_sensitivity,
        };
        &default_output_dir
    };

    handle_run_command(&project_path, opts, settings)
}

/// The default output directory for an example, relative to the working directory
fn get_output_dir_for_example(name: &str) -> PathBuf {
    ["bess_econ_results", name].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    fn example_names() -> Vec<String> {
        EXAMPLES_DIR
            .dirs()
            .map(|dir| dir.path().display().to_string())
            .collect()
    }

    #[test]
    fn test_examples_present() {
        let names = example_names();
        for name in ["cpuc_uos_2024", "nrel_atb_2024", "phased_build"] {
            assert!(names.iter().any(|n| n == name), "{name}");
        }
    }

    #[rstest]
    #[case("cpuc_uos_2024")]
    #[case("nrel_atb_2024")]
    #[case("phased_build")]
    fn test_extract_example(#[case] name: &str) {
        let dir = tempdir().unwrap();
        let dest = dir.path().join(name);
        extract_example(name, &dest).unwrap();
        assert!(dest.join("project.toml").is_file());
        assert!(dest.join("README.txt").is_file());

        // Can't extract over an existing directory
        assert!(extract_example(name, &dest).is_err());
    }

    #[test]
    fn test_extract_unknown_example() {
        let dir = tempdir().unwrap();
        assert!(extract_example("no_such_example", &dir.path().join("x")).is_err());
    }
}
