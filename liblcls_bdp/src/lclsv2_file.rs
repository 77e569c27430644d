//! Readers for the LCLS-II (NeXus-style) layout.
//!
//! LCLS-II exports carry the image stack at `/entry/data/data` and the scan
//! positions, already in meters, under `/entry/sample/positions/`.
use std::path::Path;

use super::error::{DiffractionError, PositionError};
use super::frame_stack::FrameSource;
use super::plugins::{DiffractionReader, PositionReader};
use super::positions::{read_channel, ScanPositions};

pub const LCLSV2_PLUGIN_NAME: &str = "LCLSv2";
pub const LCLSV2_DIFFRACTION_DATASET: &str = "/entry/data/data";
pub const LCLSV2_POSITION_X_CHANNEL: &str = "/entry/sample/positions/x";
pub const LCLSV2_POSITION_Y_CHANNEL: &str = "/entry/sample/positions/y";

pub struct LclsV2DiffractionReader;

impl DiffractionReader for LclsV2DiffractionReader {
    fn name(&self) -> &'static str {
        LCLSV2_PLUGIN_NAME
    }

    fn default_dataset_path(&self) -> &'static str {
        LCLSV2_DIFFRACTION_DATASET
    }

    fn open_stack(
        &self,
        path: &Path,
        dataset_path: Option<&str>,
    ) -> Result<FrameSource, DiffractionError> {
        FrameSource::open(path, dataset_path.unwrap_or(LCLSV2_DIFFRACTION_DATASET))
    }
}

pub struct LclsV2PositionReader;

impl PositionReader for LclsV2PositionReader {
    fn name(&self) -> &'static str {
        LCLSV2_PLUGIN_NAME
    }

    fn read_positions(&self, path: &Path) -> Result<ScanPositions, PositionError> {
        if !path.exists() {
            return Err(PositionError::BadFilePath(path.to_path_buf()));
        }
        let file = hdf5::File::open(path)?;
        let x_m = read_channel(&file, LCLSV2_POSITION_X_CHANNEL, path)?;
        let y_m = read_channel(&file, LCLSV2_POSITION_Y_CHANNEL, path)?;
        ScanPositions::new(x_m, y_m)
    }
}
