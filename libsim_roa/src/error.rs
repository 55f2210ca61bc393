use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Could not parse {0:?} as a time in decimal seconds")]
pub struct TimeParseError(pub String);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config has no simulation files; at least one is required")]
    NoSimulationFiles,
    #[error("Config has no geometry file")]
    NoGeometryFile,
    #[error("Config has invalid time horizon {0}; must be a finite, non-negative number of seconds")]
    BadTimeHorizon(f64),
}

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Loading of geometry failed as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Geometry failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Geometry has a malformed line {0}: {1}")]
    BadLine(usize, String),
    #[error("Geometry declares detector {0} more than once")]
    DuplicateDetector(String),
    #[error("Geometry detector {0} is missing required property {1}")]
    MissingProperty(String, &'static str),
    #[error("Geometry detector {0} has invalid property {1}")]
    InvalidProperty(String, &'static str),
    #[error("Geometry does not declare any detectors")]
    NoDetectors,
}

#[derive(Debug, Error)]
pub enum SimFileError {
    #[error("Could not open simulation file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Simulation file failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Simulation file has a bad event time at line {0}: {1}")]
    BadTime(usize, TimeParseError),
    #[error("Simulation file has a malformed hit at line {0}: {1}")]
    BadHit(usize, String),
    #[error("Simulation file event ending at line {0} has no time (TI) record")]
    MissingTime(usize),
    #[error("Simulation file references detector {1} at line {0} which is not in the geometry")]
    UnknownDetector(usize, String),
}

#[derive(Debug, Error)]
pub enum RoaWriterError {
    #[error("RoaWriter could not create output file {0:?}: {1}")]
    CreateError(PathBuf, std::io::Error),
    #[error("RoaWriter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RoaReaderError {
    #[error("Could not open ROA file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("RoaReader failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("ROA file has an invalid header; expected {0:?}")]
    BadHeader(&'static str),
    #[error("ROA file has a malformed line {0}: {1}")]
    BadLine(usize, String),
    #[error("ROA file has a record at line {0} before any SE record")]
    RecordOutsideEvent(usize),
}

/// The run level error.
///
/// Config, Geometry and SimFile errors are configuration errors: they happen before any output
/// exists. Writer errors happen while the output is being produced.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to Geometry error: {0}")]
    GeometryError(#[from] GeometryError),
    #[error("Processor failed due to SimFile error: {0}")]
    SimFileError(#[from] SimFileError),
    #[error("Processor failed due to RoaWriter error: {0}")]
    WriterError(#[from] RoaWriterError),
}

impl ProcessorError {
    pub fn is_write_error(&self) -> bool {
        matches!(self, Self::WriterError(_))
    }
}
