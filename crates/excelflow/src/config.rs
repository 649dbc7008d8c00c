//! TOML configuration for the ExcelFlow binary.
//!
//! Lookup order: an explicit `--config` path, then `excelflow.toml` in the
//! working directory, then built-in defaults.

use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use excelflow_io_xlsx::EnumOutputMode;
use excelflow_log::{C_LOG_FILE_DEFAULT, SpecLogConfig};
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

pub const C_CONFIG_FILE_DEFAULT: &str = "excelflow.toml";
pub const C_WORKBOOK_DEFAULT: &str = "output.xlsx";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Settings read from `excelflow.toml`. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecExcelflowConfig {
    /// Append-mode log file.
    pub log_file: PathBuf,
    /// `error`, `warn`, `info`, `debug`, `trace` or `off`.
    pub log_level: String,
    /// Workbook used when `save` gets no `--workbook`.
    pub default_workbook: PathBuf,
    /// `new` or `append`.
    pub default_mode: String,
}

impl Default for SpecExcelflowConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from(C_LOG_FILE_DEFAULT),
            log_level: "info".to_string(),
            default_workbook: PathBuf::from(C_WORKBOOK_DEFAULT),
            default_mode: EnumOutputMode::New.to_string(),
        }
    }
}

impl SpecExcelflowConfig {
    pub fn output_mode(&self) -> Result<EnumOutputMode, ConfigError> {
        EnumOutputMode::from_str(&self.default_mode).map_err(|message| ConfigError::Invalid {
            key: "default_mode",
            message,
        })
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        parse_level_filter(&self.log_level)
    }

    /// Logger settings; `level_override` (from the command line) wins.
    pub fn to_log_config(&self, level_override: Option<&str>) -> Result<SpecLogConfig, ConfigError> {
        let level = match level_override {
            Some(level) => parse_level_filter(level)?,
            None => self.level_filter()?,
        };
        Ok(SpecLogConfig {
            path_log_file: Some(self.log_file.clone()),
            level,
            if_stderr: true,
        })
    }

    fn validate(self) -> Result<Self, ConfigError> {
        self.output_mode()?;
        self.level_filter()?;
        Ok(self)
    }
}

fn parse_level_filter(level: &str) -> Result<LevelFilter, ConfigError> {
    LevelFilter::from_str(level.trim()).map_err(|err| ConfigError::Invalid {
        key: "log_level",
        message: err.to_string(),
    })
}

/// Parse config text; `path` is only used in error messages.
pub fn parse_config(text: &str, path: &Path) -> Result<SpecExcelflowConfig, ConfigError> {
    let cfg: SpecExcelflowConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    cfg.validate()
}

/// Load the configuration following the lookup order.
pub fn load_config(path_explicit: Option<&Path>) -> Result<SpecExcelflowConfig, ConfigError> {
    let path = match path_explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path_default = PathBuf::from(C_CONFIG_FILE_DEFAULT);
            if !path_default.is_file() {
                return Ok(SpecExcelflowConfig::default());
            }
            path_default
        }
    };

    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    parse_config(&text, &path)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use excelflow_io_xlsx::EnumOutputMode;
    use log::LevelFilter;

    use super::{ConfigError, SpecExcelflowConfig, load_config, parse_config};

    #[test]
    fn defaults_match_documented_values() {
        let cfg = SpecExcelflowConfig::default();
        assert_eq!(cfg.log_file, PathBuf::from("app.log"));
        assert_eq!(cfg.default_workbook, PathBuf::from("output.xlsx"));
        assert_eq!(cfg.output_mode().expect("mode"), EnumOutputMode::New);
        assert_eq!(cfg.level_filter().expect("level"), LevelFilter::Info);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = parse_config("default_mode = \"append\"\n", Path::new("x.toml")).expect("parse");
        assert_eq!(cfg.output_mode().expect("mode"), EnumOutputMode::Append);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn unknown_keys_and_bad_values_are_rejected() {
        assert!(matches!(
            parse_config("colour = \"blue\"\n", Path::new("x.toml")),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            parse_config("default_mode = \"merge\"\n", Path::new("x.toml")),
            Err(ConfigError::Invalid { key: "default_mode", .. })
        ));
        assert!(matches!(
            parse_config("log_level = \"loud\"\n", Path::new("x.toml")),
            Err(ConfigError::Invalid { key: "log_level", .. })
        ));
    }

    #[test]
    fn log_level_override_wins() {
        let cfg = SpecExcelflowConfig::default();
        let log_cfg = cfg.to_log_config(Some("debug")).expect("log cfg");
        assert_eq!(log_cfg.level, LevelFilter::Debug);
        assert_eq!(log_cfg.path_log_file, Some(PathBuf::from("app.log")));
    }

    #[test]
    fn explicit_path_must_exist() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = load_config(Some(&tmp.path().join("none.toml"))).expect_err("must fail");
        assert!(matches!(err, ConfigError::Read { .. }));

        let path = tmp.path().join("cfg.toml");
        std::fs::write(&path, "default_workbook = \"book.xlsx\"\n").expect("write");
        let cfg = load_config(Some(&path)).expect("load");
        assert_eq!(cfg.default_workbook, PathBuf::from("book.xlsx"));
    }
}
