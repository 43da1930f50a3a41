//! Program settings, read from `settings.toml` in the user's config directory.
use crate::get_config_dir;
use crate::input::read_toml;
use crate::log::{DEFAULT_LOG_LEVEL, parse_log_level};
use anyhow::{Context, Result};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# Program settings for bess-econ.
# Each setting is shown with its default value. Uncomment a line to change it.
";

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    get_config_dir().join(SETTINGS_FILE_NAME)
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// The default program log level (off, error, warn, info, debug or trace)
    pub log_level: String,
    /// Whether to overwrite existing results without needing --overwrite
    pub overwrite: bool,
    /// Whether to run the tornado and grid sensitivity analyses
    pub sensitivity: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            overwrite: false,
            sensitivity: true,
        }
    }
}

impl Settings {
    /// Read the settings file, using defaults if there isn't one
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read and check the settings at `file_path`, returning defaults if the file doesn't exist
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        parse_log_level(&settings.log_level)
            .with_context(|| format!("Invalid log_level in {}", file_path.display()))?;

        Ok(settings)
    }

    /// The contents of a settings file with every setting documented and commented out
    pub fn default_file_contents() -> String {
        let defaults = toml::Value::try_from(Settings::default())
            .expect("Default settings should serialise to TOML");
        let defaults = defaults
            .as_table()
            .expect("Settings should serialise to a TOML table");

        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for (field, value) in defaults {
            let docs = Settings::get_field_docs(field).expect("Missing doc comment for field");
            out.push('\n');
            for line in docs.lines() {
                writeln!(&mut out, "# # {}", line.trim()).unwrap();
            }
            writeln!(&mut out, "# {field} = {value}").unwrap();
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_settings_load_from_path_no_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME); // NB: doesn't exist
        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_settings_load_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&file_path, "log_level = \"warn\"\nsensitivity = false\n").unwrap();

        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings {
                log_level: "warn".to_string(),
                overwrite: false,
                sensitivity: false,
            }
        );
    }

    #[test]
    fn test_settings_load_bad_log_level() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&file_path, "log_level = \"loud\"\n").unwrap();

        assert_error!(
            Settings::load_from_path(&file_path),
            format!("Invalid log_level in {}", file_path.display())
        );
    }

    #[test]
    fn test_settings_unknown_field() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&file_path, "debug_model = true\n").unwrap();
        assert!(Settings::load_from_path(&file_path).is_err());
    }

    #[test]
    fn test_default_file_contents() {
        let contents = Settings::default_file_contents();
        assert!(contents.starts_with(DEFAULT_SETTINGS_FILE_HEADER));
        assert!(contents.contains("# log_level = \"info\""));
        assert!(contents.contains("# sensitivity = true"));
        assert!(contents.contains("# # Whether to run the tornado and grid sensitivity analyses"));

        // Every setting is commented out, so the file should load as the defaults
        let settings: Settings = toml::from_str(&contents).unwrap();
        assert_eq!(settings, Settings::default());
    }
}
