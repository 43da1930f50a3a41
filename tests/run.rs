//! Integration tests for the `run` command.
use bess_econ::cli::{RunOpts, handle_run_command};
use bess_econ::settings::Settings;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to the example project.
fn get_project_dir() -> PathBuf {
    PathBuf::from("demos/nrel_atb_2024")
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("BESS_ECON_LOG_LEVEL", "off") };

    // Save results to non-existent directory to check that directory creation works
    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("results");
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        no_sensitivity: true,
        ..Default::default()
    };
    handle_run_command(&get_project_dir(), &opts, Some(Settings::default())).unwrap();
    assert!(output_dir.join("metrics.csv").is_file());
    assert!(!output_dir.join("tornado.csv").exists());

    // Output folder is no longer empty, so a second run needs permission to overwrite it
    assert_eq!(
        handle_run_command(&get_project_dir(), &opts, Some(Settings::default()))
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    );

    let settings = Settings {
        overwrite: true,
        ..Default::default()
    };
    handle_run_command(&get_project_dir(), &opts, Some(settings)).unwrap();
}

/// Sensitivity analyses can be switched off in the settings file
#[test]
fn test_handle_run_command_sensitivity_setting() {
    unsafe { std::env::set_var("BESS_ECON_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().to_path_buf()),
        ..Default::default()
    };
    let settings = Settings {
        sensitivity: false,
        ..Default::default()
    };
    handle_run_command(&get_project_dir(), &opts, Some(settings)).unwrap();

    let file_names: Vec<_> = fs::read_dir(tempdir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert!(file_names.contains(&"cash_flows.csv".to_string()));
    assert!(!file_names.contains(&"sensitivity_grid.csv".to_string()));
}
