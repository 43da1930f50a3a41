//! Code for writing run metadata to file.
use crate::project::{OwnershipType, Project};
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Information about the program build via `built` crate
mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// The short git commit hash the program was built from, marked if the tree had local changes
fn git_hash() -> String {
    match (built_info::GIT_COMMIT_HASH_SHORT, built_info::GIT_DIRTY) {
        (Some(hash), Some(true)) => format!("{hash}-dirty"),
        (Some(hash), _) => hash.into(),
        (None, _) => "unknown".into(),
    }
}

/// The contents of `metadata.toml`
#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    project: ProjectSummary<'a>,
    program: ProgramMetadata<'a>,
    platform: PlatformMetadata,
}

/// Information about the run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the project directory
    project_path: &'a Path,
    /// Local time at which the results were written
    datetime: String,
}

/// The headline inputs of the project which was analysed
#[derive(Serialize)]
struct ProjectSummary<'a> {
    name: &'a str,
    project_id: &'a str,
    ownership_type: OwnershipType,
    capacity_mw: f64,
    capacity_mwh: f64,
    analysis_period_years: u32,
    /// WACC if the project is financed, otherwise the project discount rate
    discount_rate: f64,
    num_tranches: usize,
    /// Whether the utility-ownership analysis was run
    utility_ownership: bool,
}

impl<'a> ProjectSummary<'a> {
    fn new(project: &'a Project) -> Self {
        let basics = project.basics();
        Self {
            name: &basics.name,
            project_id: &basics.project_id,
            ownership_type: basics.ownership_type,
            capacity_mw: basics.capacity_mw,
            capacity_mwh: basics.capacity_mwh(),
            analysis_period_years: basics.analysis_period_years,
            discount_rate: project.discount_rate(),
            num_tranches: project.tranches().len(),
            utility_ownership: project.uos().is_some(),
        }
    }
}

/// The build of the program which produced the results
#[derive(Serialize)]
struct ProgramMetadata<'a> {
    name: &'a str,
    version: &'a str,
    /// Target triple, e.g. x86_64-unknown-linux-gnu
    target: &'a str,
    is_debug: bool,
    rustc_version: &'a str,
    build_time_utc: &'a str,
    git_commit_hash: String,
}

impl ProgramMetadata<'static> {
    fn current() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit_hash: git_hash(),
        }
    }
}

/// The machine the analysis ran on, as reported by [`PlatformInfo`]
#[derive(Serialize)]
struct PlatformMetadata {
    osname: String,
    sysname: String,
    release: String,
    machine: String,
}

impl PlatformMetadata {
    fn current() -> Result<Self> {
        let info = PlatformInfo::new()
            .map_err(|err| anyhow!("Unable to determine platform info: {err}"))?;
        Ok(Self {
            osname: info.osname().to_string_lossy().into(),
            sysname: info.sysname().to_string_lossy().into(),
            release: info.release().to_string_lossy().into(),
            machine: info.machine().to_string_lossy().into(),
        })
    }
}

/// Write `metadata.toml`, recording what was run, with which build and on which machine
pub fn write_metadata(output_path: &Path, project_path: &Path, project: &Project) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata {
            project_path,
            datetime: Local::now().to_rfc2822(),
        },
        project: ProjectSummary::new(project),
        program: ProgramMetadata::current(),
        platform: PlatformMetadata::current()?,
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)
        .with_context(|| format!("Could not write {}", file_path.display()))?;

    Ok(())
}
