//! The command line interface for the program.
use crate::analysis;
use crate::input::load_project;
use crate::log;
use crate::output::{create_output_directory, get_output_dir, write_metadata};
use crate::settings::Settings;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the program.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Skip the tornado and grid sensitivity analyses
    #[arg(long)]
    pub no_sensitivity: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Analyse a project.
    Run {
        /// Path to the project directory.
        project_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage example projects.
    Example {
        /// The available subcommands for managing example projects.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Validate a project.
    Validate {
        /// The path to the project directory.
        project_dir: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { project_dir, opts } => handle_run_command(&project_dir, &opts, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Validate { project_dir } => handle_validate_command(&project_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ bess-econ --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Held while the logger is being initialised, so concurrent runs only initialise it once
static LOGGER_INIT_LOCK: Mutex<()> = Mutex::new(());

/// Initialise the program logger, unless this has already been done
fn init_logger(settings: &Settings, log_file_path: Option<&Path>) -> Result<()> {
    let _guard = LOGGER_INIT_LOCK
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if log::is_logger_initialised() {
        return Ok(());
    }

    log::init(Some(&settings.log_level), log_file_path).context("Failed to initialise logging.")
}

/// Handle the `run` command.
pub fn handle_run_command(
    project_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(project_path)?;
        &pathbuf
    };

    let overwrite = create_output_directory(output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    init_logger(&settings, Some(output_path))?;

    // Load the project to analyse
    let project = load_project(project_path).context("Failed to load project.")?;
    info!(
        "Loaded project '{}' from {}",
        project.basics().name,
        project_path.display()
    );
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    write_metadata(output_path, project_path, &project)
        .context("Failed to save metadata.")?;

    let run_sensitivity = settings.sensitivity && !opts.no_sensitivity;
    analysis::run(&project, output_path, run_sensitivity)?;
    info!("Analysis complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(project_path: &Path, settings: Option<Settings>) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // We won't save log files when running the validate command
    init_logger(&settings, None)?;

    // Load/validate the project
    load_project(project_path).context("Failed to validate project.")?;
    info!("Project validation successful!");

    Ok(())
}
