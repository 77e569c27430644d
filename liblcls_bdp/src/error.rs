use std::path::PathBuf;
use thiserror::Error;

use super::worker_status::WorkerStatus;

#[derive(Debug, Error)]
pub enum IniError {
    #[error("Failed to read INI document: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Line {0} of INI document is not a section header or key assignment: {1}")]
    BadLine(usize, String),
    #[error("Line {0} of INI document has an unterminated section header: {1}")]
    UnterminatedSection(usize, String),
    #[error("Line {0} of INI document assigns a value before any section header")]
    KeyOutsideSection(usize),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Settings failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Settings failed to parse INI document: {0}")]
    ParsingError(#[from] IniError),
    #[error("Settings key {0}.{1} has invalid value {2:?}")]
    InvalidValue(&'static str, &'static str, String),
    #[error("Crop extent must be nonzero")]
    ZeroCropExtent,
    #[error("Crop window (center {0},{1} extent {2}x{3}) does not fit the {4}x{5} frame")]
    CropOutOfBounds(usize, usize, usize, usize, usize, usize),
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("No diffraction reader plugin named {0:?} is registered; available: {1}")]
    UnknownDiffractionPlugin(String, String),
    #[error("No position reader plugin named {0:?} is registered; available: {1}")]
    UnknownPositionPlugin(String, String),
}

#[derive(Debug, Error)]
pub enum DiffractionError {
    #[error("Could not open diffraction data because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Diffraction reader failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("Dataset {0:?} does not exist in diffraction file {1:?}")]
    MissingDataset(String, PathBuf),
    #[error("Dataset {0:?} has shape {1:?}; expected a (frames, rows, columns) stack")]
    BadShape(String, Vec<usize>),
    #[error("Failed to decode frame {0}: {1}; if the input uses a custom compression filter, point HDF5_PLUGIN_PATH at the filter plugin directory")]
    UnreadableData(usize, hdf5::Error),
    #[error("Frame has shape {0}x{1}; the stack expects {2}x{3}")]
    FrameShapeMismatch(usize, usize, usize, usize),
    #[error("Diffraction processing failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Could not open position data because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Position reader failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("Position channel {0:?} does not exist in file {1:?}")]
    MissingChannel(String, PathBuf),
    #[error("Position channels have mismatched lengths: {0} x values vs {1} y values")]
    LengthMismatch(usize, usize),
    #[error("Position data is empty")]
    Empty,
}

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Failed to load geometry config as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Geometry config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Geometry config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product writer failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("Product writer failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Product metadata string {0:?} could not be stored")]
    InvalidString(String),
}

#[derive(Debug, Error)]
pub enum ConverterError {
    #[error("Converter failed due to settings error: {0}")]
    SettingsError(#[from] SettingsError),
    #[error("Converter failed due to plugin error: {0}")]
    PluginError(#[from] PluginError),
    #[error("Converter failed due to diffraction error: {0}")]
    DiffractionError(#[from] DiffractionError),
    #[error("Converter failed due to position error: {0}")]
    PositionError(#[from] PositionError),
    #[error("Converter failed due to product error: {0}")]
    ProductError(#[from] ProductError),
    #[error("Converter failed due to geometry error: {0}")]
    GeometryError(#[from] GeometryError),
    #[error("Input {0:?} is not a regular file")]
    NotAFile(PathBuf),
    #[error("Input {0:?} does not exist")]
    MissingInput(PathBuf),
    #[error("Converter failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Converter failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}
