//! Integration tests for the `validate` command.
use bess_econ::cli::handle_validate_command;
use bess_econ::log::is_logger_initialised;
use bess_econ::settings::Settings;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to the example project.
fn get_project_dir() -> PathBuf {
    PathBuf::from("demos/cpuc_uos_2024")
}

/// An integration test for the `validate` command.
///
/// We also check that the logger is initialised after it is run.
#[test]
fn test_handle_validate_command() {
    unsafe { std::env::set_var("BESS_ECON_LOG_LEVEL", "off") };

    assert!(!is_logger_initialised());

    handle_validate_command(&get_project_dir(), Some(Settings::default())).unwrap();

    assert!(is_logger_initialised());

    // A broken copy of the project fails validation
    let tempdir = tempdir().unwrap();
    let project_toml = fs::read_to_string(get_project_dir().join("project.toml")).unwrap();
    fs::write(
        tempdir.path().join("project.toml"),
        project_toml.replace("capacity_mw = 100.0", "capacity_mw = -100.0"),
    )
    .unwrap();
    let err = handle_validate_command(tempdir.path(), Some(Settings::default())).unwrap_err();
    assert_eq!(err.to_string(), "Failed to validate project.");
}
