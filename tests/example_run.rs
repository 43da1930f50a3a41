//! Integration tests for the `example run` command.
use bess_econ::cli::RunOpts;
use bess_econ::cli::example::handle_example_run_command;
use bess_econ::settings::Settings;
use rstest::rstest;
use tempfile::tempdir;

/// An integration test for the `example run` command.
#[rstest]
#[case("nrel_atb_2024")]
#[case("cpuc_uos_2024")]
#[case("phased_build")]
fn test_handle_example_run_command(#[case] name: &str) {
    unsafe { std::env::set_var("BESS_ECON_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let opts = RunOpts {
        output_dir: Some(tempdir.path().to_path_buf()),
        ..Default::default()
    };
    handle_example_run_command(name, &opts, Some(Settings::default())).unwrap();

    assert!(tempdir.path().join("metrics.csv").is_file());
    assert!(tempdir.path().join("tornado.csv").is_file());
    assert!(tempdir.path().join("metadata.toml").is_file());
    assert_eq!(
        tempdir.path().join("revenue_requirement.csv").is_file(),
        name == "cpuc_uos_2024"
    );
}
