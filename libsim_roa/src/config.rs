use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::constants::{DEFAULT_OUTPUT_FILE, DEFAULT_TIME_HORIZON};
use super::error::ConfigError;
use super::event::EventTime;

/// Structure representing the application configuration. Contains pathing and run information
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation_files: Vec<PathBuf>,
    pub geometry_file: Option<PathBuf>,
    pub output_path: PathBuf,
    /// Seconds since the start of the run; later events are not read
    pub time_horizon: f64,
    /// Seed for synthetic energies; None draws one from the system
    pub seed: Option<u64>,
}

impl Default for Config {
    /// Generate a new Config object. There are no input files, so it will not validate
    fn default() -> Self {
        Self {
            simulation_files: Vec::new(),
            geometry_file: None,
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            time_horizon: DEFAULT_TIME_HORIZON,
            seed: None,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration as YAML
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    /// Check that the config describes a runnable conversion
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation_files.is_empty() {
            return Err(ConfigError::NoSimulationFiles);
        }
        if self.geometry_file.is_none() {
            return Err(ConfigError::NoGeometryFile);
        }
        self.horizon()?;
        Ok(())
    }

    /// The time horizon as an event time
    pub fn horizon(&self) -> Result<EventTime, ConfigError> {
        EventTime::from_secs_f64(self.time_horizon)
            .ok_or(ConfigError::BadTimeHorizon(self.time_horizon))
    }

    pub fn geometry_path(&self) -> Result<&Path, ConfigError> {
        self.geometry_file
            .as_deref()
            .ok_or(ConfigError::NoGeometryFile)
    }

    /// Total size of the simulation files on disk. Files which can't be read count as empty.
    pub fn total_input_size(&self) -> u64 {
        self.simulation_files
            .iter()
            .filter_map(|path| path.metadata().ok())
            .map(|meta| meta.len())
            .sum()
    }
}
