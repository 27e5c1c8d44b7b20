use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AufsichtError, Result};
use crate::models::duty::{DEFAULT_BREAKS_PER_DAY, MAX_BREAKS_PER_DAY};
use crate::optimize::{SolverConfig, MAX_TIME_LIMIT_SECS};

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "aufsichtsplan.toml";

/// Complete configuration of the planner.
///
/// Every section is optional in the file; missing sections and keys fall
/// back to their defaults.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub planning: PlanningConfig,

    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default)]
    pub update: UpdateConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

/// Which planner `plan generate` runs.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlannerKind {
    #[default]
    Greedy,
    Optimize,
}

/// Settings shared by both planners and the importers.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PlanningConfig {
    #[serde(default = "default_breaks_per_day")]
    pub breaks_per_day: u8,

    #[serde(default)]
    pub planner: PlannerKind,

    /// Seed for the greedy planner's tie-breaking; random when unset.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Field delimiter of roster CSV files.
    #[serde(default = "default_roster_delimiter")]
    pub roster_delimiter: char,
}

fn default_breaks_per_day() -> u8 {
    DEFAULT_BREAKS_PER_DAY
}

fn default_roster_delimiter() -> char {
    ','
}

impl Default for PlanningConfig {
    fn default() -> Self {
        PlanningConfig {
            breaks_per_day: default_breaks_per_day(),
            planner: PlannerKind::default(),
            seed: None,
            roster_delimiter: default_roster_delimiter(),
        }
    }
}

/// Release source for self-updates.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UpdateConfig {
    /// GitHub repository as `owner/name`.
    #[serde(default = "default_repository")]
    pub repository: String,

    /// Release asset holding the executable.
    #[serde(default = "default_asset_name")]
    pub asset_name: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_repository() -> String {
    "otiemann/py-aufsichtsplan".to_string()
}

fn default_asset_name() -> String {
    format!("aufsicht{}", std::env::consts::EXE_SUFFIX)
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for UpdateConfig {
    fn default() -> Self {
        UpdateConfig {
            repository: default_repository(),
            asset_name: default_asset_name(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct StoreConfig {
    /// Store file; the environment decides when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Checks values the types cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_BREAKS_PER_DAY).contains(&self.planning.breaks_per_day) {
            return Err(AufsichtError::config(format!(
                "planning.breaks_per_day must be between 1 and {MAX_BREAKS_PER_DAY}, got {}",
                self.planning.breaks_per_day
            )));
        }
        if !self.planning.roster_delimiter.is_ascii() {
            return Err(AufsichtError::config(
                "planning.roster_delimiter must be an ASCII character",
            ));
        }
        let time_limit = self.solver.time_limit_secs;
        if !time_limit.is_finite() || time_limit <= 0.0 || time_limit > MAX_TIME_LIMIT_SECS as f64 {
            return Err(AufsichtError::config(format!(
                "solver.time_limit_secs must be between 0 and {MAX_TIME_LIMIT_SECS}, got {time_limit}"
            )));
        }
        Ok(())
    }

    /// Roster delimiter as a byte.
    pub fn roster_delimiter(&self) -> u8 {
        let mut buf = [0u8; 4];
        self.planning.roster_delimiter.encode_utf8(&mut buf);
        buf[0]
    }

    /// Store location: the configured path, else the environment default.
    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(crate::store::default_path)
    }
}

/// Parses and validates a configuration document.
pub fn parse_config(text: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(text).map_err(|e| AufsichtError::config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `aufsichtsplan.toml` in current directory
/// 3. `aufsichtsplan/config.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read, parsed or validated
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AufsichtError::not_found(format!("config file {}", path.display()))
            }
            _ => AufsichtError::Io(e),
        })?
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        fs::read_to_string(CONFIG_FILE_NAME)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join("aufsichtsplan").join("config.toml");
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    parse_config(&config_str)
}
